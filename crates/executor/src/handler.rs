//! Per-record response handler.

use parquery_core::{Blob, Command, ResponseSlice};

/// Everything the database returned for one record of a batch.
#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    /// The record's commands, as sent (refs renumbered)
    pub commands: &'a [Command],
    /// The record's input blobs
    pub blobs_in: &'a [Blob],
    /// The record's responses
    pub responses: ResponseSlice<'a>,
    /// Blobs returned for the record's retrieval commands, or `None` when the
    /// output stream ran short
    pub blobs_out: Option<&'a [Blob]>,
    /// Absolute record index in the source, when known
    pub index: Option<usize>,
}

/// Receives each record's slice of a batch result.
///
/// Called synchronously on the worker that ran the batch, once per record,
/// in record order.
pub trait ResponseHandler: Sync {
    /// Handle one record's results.
    fn handle(&self, group: Group<'_>) -> anyhow::Result<()>;
}

impl<F> ResponseHandler for F
where
    F: for<'a> Fn(Group<'a>) -> anyhow::Result<()> + Sync,
{
    fn handle(&self, group: Group<'_>) -> anyhow::Result<()> {
        self(group)
    }
}
