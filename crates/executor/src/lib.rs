//! # parquery executor
//!
//! Turns records into transactions and transaction results back into
//! records.
//!
//! - [`assemble_batch`] merges records into one [`Batch`], renumbering refs
//!   so they stay unique across the transaction
//! - [`Executor`] sends a batch over a [`Connection`] and classifies the
//!   result as a [`BatchOutcome`]
//! - [`demultiplex`] cuts the flat response and blob streams back into
//!   one [`Group`] per record for a [`ResponseHandler`]
//!
//! ## Running one batch by hand
//!
//! ```text
//! use parquery_executor::{assemble_batch, Executor, QueryShape};
//!
//! let batch = assemble_batch(&records)?;
//! let statuses = SuccessStatuses::default();
//! let report = Executor::new(&statuses, QueryShape::of(&records[0]))
//!     .with_handler(Some(&my_handler))
//!     .execute(&mut conn, &batch, None)?;
//! ```
//!
//! Parallel execution over a whole source lives in `parquery-engine`.

#![warn(missing_docs)]

mod assembler;
mod connection;
mod demux;
mod executor;
mod handler;
pub(crate) mod json;


// =============================================================================
// Public API
// =============================================================================

pub use assembler::{assemble_batch, renumber_refs};
pub use connection::{
    detect_shape, Connection, DistributedConfig, QueryShape, RecordSource, SourceCapabilities,
};
pub use demux::{demultiplex, groups, Groups};
pub use executor::{execute_batch, BatchOutcome, ExecutionReport, Executor};
pub use handler::{Group, ResponseHandler};

pub use parquery_core::{
    Batch, Blob, Command, CommandResponse, Error, Record, ResponseSlice, Responses, Result,
    SuccessStatuses, WorkerStats,
};
