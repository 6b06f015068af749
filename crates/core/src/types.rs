//! Records, batches and per-batch counters

use serde::{Deserialize, Serialize};

use crate::Command;

/// Opaque binary payload sent with, or returned for, a command.
pub type Blob = Vec<u8>;

/// One caller unit: commands with record-local refs, plus the blobs they
/// consume in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Commands in execution order
    pub commands: Vec<Command>,
    /// Input blobs in consumption order
    #[serde(default)]
    pub blobs: Vec<Blob>,
}

impl Record {
    /// Create a record from its commands and blobs.
    pub fn new(commands: Vec<Command>, blobs: Vec<Blob>) -> Self {
        Self { commands, blobs }
    }
}

/// Several records merged into one transaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    /// Concatenated, renumbered commands
    pub commands: Vec<Command>,
    /// Concatenated input blobs
    pub blobs: Vec<Blob>,
    /// Number of records merged into this batch
    pub records: usize,
}

impl Batch {
    /// True if the batch carries no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Counters produced by one executed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Commands that reported success
    pub succeeded_commands: u64,
    /// Records whose every command reported success
    pub succeeded_queries: u64,
    /// Commands that reported status 2 (object already existed)
    pub objects_existed: u64,
}

impl WorkerStats {
    /// Add `other` into `self`.
    pub fn accumulate(&mut self, other: &WorkerStats) {
        self.succeeded_commands += other.succeeded_commands;
        self.succeeded_queries += other.succeeded_queries;
        self.objects_existed += other.objects_existed;
    }
}
