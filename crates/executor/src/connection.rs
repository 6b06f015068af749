//! Boundary traits for the transport and the record source.
//!
//! The engine never opens sockets or reads input files itself. A
//! [`Connection`] carries one transaction at a time to the database and a
//! [`RecordSource`] hands out records by index range.

use std::ops::Range;
use std::time::Duration;

use parquery_core::{Blob, Command, Record, Responses, Result};
use serde::{Deserialize, Serialize};

use crate::ResponseHandler;

/// A single database connection.
///
/// A connection is owned by exactly one worker for its whole lifetime;
/// workers get their own copy through [`Connection::duplicate`].
pub trait Connection: Send + Sized {
    /// Send one transaction and wait for its responses and returned blobs.
    ///
    /// `Err` means the call itself did not complete (I/O, protocol). A call
    /// that completed but was rejected by the database returns `Ok` and
    /// reports `false` from [`Connection::last_call_succeeded`].
    fn send(&mut self, commands: &[Command], blobs: &[Blob]) -> Result<(Responses, Vec<Blob>)>;

    /// Whether the database accepted the last transaction.
    fn last_call_succeeded(&self) -> bool;

    /// Server-side duration of the last call.
    fn last_call_duration(&self) -> Duration;

    /// Open a fresh connection with the same configuration.
    fn duplicate(&self) -> Result<Self>;

    /// Human-readable configuration, for logs.
    fn describe(&self) -> String;
}

/// How many commands and input blobs make up one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryShape {
    /// Commands per record (at least 1)
    pub commands_per_query: usize,
    /// Input blobs per record
    pub blobs_per_query: usize,
}

impl QueryShape {
    /// Create a shape, clamping the command count to at least 1.
    pub fn new(commands_per_query: usize, blobs_per_query: usize) -> Self {
        Self {
            commands_per_query: commands_per_query.max(1),
            blobs_per_query,
        }
    }

    /// Shape of a sample record.
    pub fn of(record: &Record) -> Self {
        Self::new(record.commands.len(), record.blobs.len())
    }
}

impl Default for QueryShape {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

/// Partitioning hint for distributed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedConfig {
    /// Number of independent partitions the source is split into
    pub partitions: usize,
}

/// Optional behaviour a record source opts into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCapabilities {
    /// Propagate handler failures and abort the batch
    pub strict_validation: bool,
    /// Run through the distributed coordinator instead of the local pool
    pub distributed: Option<DistributedConfig>,
    /// Explicit record shape; detected from the first record when absent
    pub shape: Option<QueryShape>,
}

/// An indexable collection of records.
pub trait RecordSource: Sync {
    /// Total number of records.
    fn len(&self) -> usize;

    /// True if there are no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records in `range`, in order. `range.end` never exceeds `len()`.
    fn slice(&self, range: Range<usize>) -> Result<Vec<Record>>;

    /// Handler called once per record after each executed batch.
    fn response_handler(&self) -> Option<&dyn ResponseHandler> {
        None
    }

    /// Capabilities of this source.
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::default()
    }
}

impl RecordSource for [Record] {
    fn len(&self) -> usize {
        <[Record]>::len(self)
    }

    fn slice(&self, range: Range<usize>) -> Result<Vec<Record>> {
        Ok(self[range].to_vec())
    }
}

impl RecordSource for Vec<Record> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn slice(&self, range: Range<usize>) -> Result<Vec<Record>> {
        Ok(self[range].to_vec())
    }
}

/// Work out the record shape for `source`.
///
/// An explicit shape wins; otherwise the first record is sampled. An empty
/// source gets the default `(1, 0)`.
pub fn detect_shape<S: RecordSource + ?Sized>(source: &S) -> Result<QueryShape> {
    if let Some(shape) = source.capabilities().shape {
        return Ok(shape);
    }
    if source.is_empty() {
        return Ok(QueryShape::default());
    }
    let sample = source.slice(0..1)?;
    Ok(sample.first().map(QueryShape::of).unwrap_or_default())
}
