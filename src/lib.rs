//! parquery - batched, parallel query execution for JSON command databases
//!
//! Records (a few commands plus their blobs) are merged into transactions,
//! sent concurrently over a pool of connections, and their responses are
//! split back into per-record slices for a caller-supplied handler.
//!
//! # Quick Start
//!
//! ```ignore
//! use parquery::{ParallelQuery, Record, RunConfig};
//!
//! let records: Vec<Record> = load_records()?;
//! let mut query = ParallelQuery::new(connection, RunConfig::default())?;
//! query.run(&records, 100, 8, true)?;
//! assert_eq!(query.error_count(), 0);
//! ```
//!
//! # Architecture
//!
//! - `parquery-core`: commands, responses, records and the error type
//! - `parquery-executor`: batch assembly, single-batch execution and
//!   response demultiplexing, plus the [`Connection`] and [`RecordSource`]
//!   boundary traits
//! - `parquery-engine`: worker pool, distributed partitions, statistics
//!   and configuration
//!
//! The transport itself is not part of this crate; implement
//! [`Connection`] over whatever client the database provides.

pub use parquery_core::{limits, BLOB_RETURNING_COMMANDS, MAX_REF, STATUS_EXISTS, STATUS_OK};
pub use parquery_engine::*;
pub use parquery_executor::*;
