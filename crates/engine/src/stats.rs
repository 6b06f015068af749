//! Run statistics.
//!
//! Every worker (or distributed partition) fills its own [`Ledger`] and
//! hands it to the [`StatsAggregator`] once, at join. Nothing is shared
//! while batches run except the aggregator's error counter, which is
//! bumped for batches that never produced a ledger entry.
//!
//! A ledger entry exists for every batch that reached the transport (or was
//! assembled in dry-run mode), including transaction failures. Errors are
//! counted on top, so the error percentage is relative to executed batches.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use parquery_core::WorkerStats;
use serde::{Deserialize, Serialize};

/// One executed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Server-side time of the batch, in seconds. Zero for failed batches.
    pub elapsed_secs: f64,
    /// Counters for the batch
    pub stats: WorkerStats,
}

/// Batch entries and error count collected by one worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<BatchEntry>,
    errors: u64,
}

impl Ledger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an executed batch.
    pub fn record(&mut self, elapsed: Duration, stats: WorkerStats) {
        self.entries.push(BatchEntry {
            elapsed_secs: elapsed.as_secs_f64(),
            stats,
        });
    }

    /// Count one error.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Count `n` errors.
    pub fn record_errors(&mut self, n: u64) {
        self.errors += n;
    }

    /// Entries in the order they were recorded.
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Errors counted so far.
    pub fn errors(&self) -> u64 {
        self.errors
    }
}

/// Collects worker ledgers for one run.
///
/// The error counter uses Relaxed ordering: it is only read after every
/// worker has been joined.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    entries: Mutex<Vec<BatchEntry>>,
    errors: AtomicU64,
}

impl StatsAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a finished ledger.
    pub fn absorb(&self, ledger: Ledger) {
        self.errors.fetch_add(ledger.errors, Ordering::Relaxed);
        self.entries.lock().extend(ledger.entries);
    }

    /// Count errors that happened outside any ledger.
    pub fn add_errors(&self, n: u64) {
        self.errors.fetch_add(n, Ordering::Relaxed);
    }

    /// Freeze the run into its final statistics.
    ///
    /// `units` is the number of records the run covered and `workers` the
    /// configured concurrency.
    pub fn finish(self, wall: Duration, units: usize, workers: usize) -> AggregateStats {
        let entries = self.entries.into_inner();
        let errors = self.errors.into_inner();
        let totals = entries.iter().fold(WorkerStats::default(), |mut acc, e| {
            acc.accumulate(&e.stats);
            acc
        });
        AggregateStats {
            entries,
            totals,
            errors,
            wall_secs: wall.as_secs_f64(),
            units,
            workers,
        }
    }
}

/// Final statistics of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    entries: Vec<BatchEntry>,
    totals: WorkerStats,
    errors: u64,
    wall_secs: f64,
    units: usize,
    workers: usize,
}

impl AggregateStats {
    /// Records whose commands all succeeded.
    pub fn succeeded_queries(&self) -> u64 {
        self.totals.succeeded_queries
    }

    /// Commands that succeeded.
    pub fn succeeded_commands(&self) -> u64 {
        self.totals.succeeded_commands
    }

    /// Commands that reported status 2.
    pub fn objects_existed(&self) -> u64 {
        self.totals.objects_existed
    }

    /// Batches that failed or could not be executed.
    pub fn error_count(&self) -> u64 {
        self.errors
    }

    /// Batches that reached the transport.
    pub fn batches_executed(&self) -> usize {
        self.entries.len()
    }

    /// Summed counters.
    pub fn totals(&self) -> WorkerStats {
        self.totals
    }

    /// Per-batch entries.
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Wall-clock time of the run in seconds.
    pub fn wall_secs(&self) -> f64 {
        self.wall_secs
    }

    /// Mean batch time; `None` with no batches.
    pub fn mean_time(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let sum: f64 = self.entries.iter().map(|e| e.elapsed_secs).sum();
        Some(sum / self.entries.len() as f64)
    }

    /// Population standard deviation of batch times.
    pub fn std_dev_time(&self) -> Option<f64> {
        let mean = self.mean_time()?;
        let variance = self
            .entries
            .iter()
            .map(|e| (e.elapsed_secs - mean).powi(2))
            .sum::<f64>()
            / self.entries.len() as f64;
        Some(variance.sqrt())
    }

    /// Batches per second across all workers.
    pub fn query_throughput(&self) -> Option<f64> {
        let mean = self.mean_time()?;
        if mean == 0.0 {
            Some(0.0)
        } else {
            Some(1.0 / mean * self.workers as f64)
        }
    }

    /// Records per wall-clock second; undefined once any error occurred.
    pub fn overall_throughput(&self) -> Option<f64> {
        if self.errors > 0 || self.wall_secs <= 0.0 {
            return None;
        }
        Some(self.units as f64 / self.wall_secs)
    }

    /// Errors as a percentage of executed batches.
    pub fn error_percentage(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        Some(100.0 * self.errors as f64 / self.entries.len() as f64)
    }

    /// Render the human-readable report.
    pub fn report(&self) -> StatsReport {
        StatsReport {
            total_secs: self.wall_secs,
            batches: self.entries.len(),
            mean: self.mean_time(),
            std_dev: self.std_dev_time(),
            query_throughput: self.query_throughput(),
            overall_throughput: self.overall_throughput(),
            errors: self.errors,
            error_percentage: self.error_percentage(),
        }
    }
}

/// Snapshot of the numbers printed at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Wall-clock seconds
    pub total_secs: f64,
    /// Batches executed
    pub batches: usize,
    /// Mean batch time
    pub mean: Option<f64>,
    /// Population standard deviation of batch time
    pub std_dev: Option<f64>,
    /// Batches per second across workers
    pub query_throughput: Option<f64>,
    /// Records per second, `None` when errors occurred
    pub overall_throughput: Option<f64>,
    /// Error count
    pub errors: u64,
    /// Errors per executed batch, in percent
    pub error_percentage: Option<f64>,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============ Parallel Query Stats ============")?;
        writeln!(f, "Total time (s): {}", self.total_secs)?;
        writeln!(f, "Total queries executed: {}", self.batches)?;

        match (self.mean, self.std_dev, self.query_throughput) {
            (Some(mean), Some(std_dev), Some(tp)) => {
                writeln!(f, "Avg Query time (s): {}", mean)?;
                writeln!(f, "Query time std: {}", std_dev)?;
                writeln!(f, "Avg Query Throughput (q/s): {}", tp)?;
                match self.overall_throughput {
                    Some(overall) => {
                        writeln!(f, "Overall insertion throughput (query/s): {}", overall)?
                    }
                    None => writeln!(f, "Overall insertion throughput (query/s): NaN")?,
                }
                if self.errors > 0 {
                    writeln!(f, "Total errors encountered: {}", self.errors)?;
                    if let Some(pct) = self.error_percentage {
                        writeln!(f, "Errors (%): {:.2}", pct)?;
                    }
                }
            }
            _ => writeln!(f, "All queries failed!")?,
        }

        write!(f, "==============================================")
    }
}
