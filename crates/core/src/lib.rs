//! Core types for parquery
//!
//! This crate defines the foundational types shared by the executor and the
//! engine:
//! - Command: one JSON command object (or an opaque pre-batched list)
//! - Record: a caller unit of commands plus blobs
//! - Batch: records merged into one transaction
//! - Responses / CommandResponse: what the database returns for a batch
//! - WorkerStats: per-batch success counters
//! - SuccessStatuses: which status codes count as success
//! - Error: error type hierarchy
//! - Limits: reference numbering bounds

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod error;
pub mod limits;
pub mod response;
pub mod status;
pub mod types;

pub use command::{Command, BLOB_RETURNING_COMMANDS};
pub use error::{Error, Result};
pub use limits::MAX_REF;
pub use response::{CommandResponse, ResponseSlice, Responses};
pub use status::{SuccessStatuses, STATUS_EXISTS, STATUS_OK};
pub use types::{Batch, Blob, Record, WorkerStats};
