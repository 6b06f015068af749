//! Error types for parquery
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Transaction-level and partial failures are not errors: the database
//! accepted or rejected the batch and the executor reports that as an
//! outcome. Errors here abort the batch they occur in.

use std::io;
use thiserror::Error;

/// Result type alias for parquery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for batch assembly, execution and configuration
#[derive(Debug, Error)]
pub enum Error {
    /// A pointer field names a ref that no earlier command in the batch defined
    #[error("unresolved reference in {field} of command {position}: ref {reference} is not defined earlier in the batch")]
    RefResolution {
        /// Pointer field that held the reference (e.g. `is_connected_to.any[0].ref`)
        field: String,
        /// Record-local ref value that could not be resolved
        reference: i64,
        /// 1-based absolute position of the command holding the pointer
        position: usize,
    },

    /// Renumbering produced a ref at or above [`crate::MAX_REF`]
    #[error("assembled ref {position} exceeds the limit of {limit}")]
    RefLimitExceeded {
        /// Absolute position that was about to be assigned
        position: usize,
        /// The exclusive bound
        limit: usize,
    },

    /// A ref field holds something other than an integer
    #[error("{field} must be an integer, got {value}")]
    InvalidRef {
        /// Field that held the value
        field: String,
        /// The offending value, as JSON
        value: String,
    },

    /// The transport could not complete the call
    #[error("transport error: {0}")]
    Transport(String),

    /// A caller-supplied response handler failed under strict validation
    #[error("response handler failed for group {group}: {reason}")]
    HandlerFailure {
        /// Group index within the batch
        group: usize,
        /// Handler error message
        reason: String,
    },

    /// A response lacks a field the demultiplexer needs
    #[error("malformed response at command {position}: {reason}")]
    MalformedResponse {
        /// 0-based position of the response within the batch
        position: usize,
        /// What was missing or wrong
        reason: String,
    },

    /// Invalid input from the record source or caller
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be read, parsed or validated
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading or writing a configuration file failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(reason: impl Into<String>) -> Self {
        Error::Transport(reason.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput(reason.into())
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config(reason.into())
    }

    /// Returns true if the error was raised while assembling a batch
    pub fn is_assembly_error(&self) -> bool {
        matches!(
            self,
            Error::RefResolution { .. }
                | Error::RefLimitExceeded { .. }
                | Error::InvalidRef { .. }
        )
    }
}
