//! Local worker pool.
//!
//! The record range is cut into batch-aligned blocks, one per worker, so
//! no batch straddles two workers and the total number of batches is
//! exactly `ceil(total / batch_size)`:
//!
//! ```text
//! 10 records, batch 4, 2 workers
//! batches:  [0..4) [4..8) [8..10)
//! worker 0: [0..8)
//! worker 1: [8..10)
//! ```
//!
//! Connections are duplicated on the calling thread before any worker
//! starts, so a worker only ever touches the one connection it owns.

use std::ops::Range;
use std::thread;
use std::time::{Duration, Instant};

use parquery_executor::{Connection, RecordSource};
use tracing::{debug, error, info};

use crate::runner::batch_count;
use crate::stats::{Ledger, StatsAggregator};
use crate::strategy::{ExecutionStrategy, RunPlan};

/// Split `[0, total)` into at most `workers` batch-aligned ranges.
///
/// Ranges are contiguous, disjoint and cover every record. Workers that
/// would start past the end get no range at all.
pub fn partition(total: usize, batch_size: usize, workers: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    let workers = workers.max(1);
    let batches = batch_count(total, batch_size);
    let per_worker = (batches + workers - 1) / workers;
    let span = per_worker * batch_size;

    (0..workers)
        .map(|w| w * span)
        .take_while(|start| *start < total)
        .map(|start| start..(start + span).min(total))
        .collect()
}

/// Runs a source on scoped threads in this process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalPool;

impl<C: Connection> ExecutionStrategy<C> for LocalPool {
    fn name(&self) -> &'static str {
        "local"
    }

    fn execute<S: RecordSource + ?Sized>(
        &self,
        template: &C,
        source: &S,
        plan: &RunPlan<'_>,
        aggregator: &StatsAggregator,
    ) -> Duration {
        let ranges = partition(source.len(), plan.batch_size, plan.worker_count);
        let handler = source.response_handler();
        info!(
            target: "parquery::dispatcher",
            records = source.len(),
            batch_size = plan.batch_size,
            workers = ranges.len(),
            "Starting local run"
        );

        let started = Instant::now();
        thread::scope(|scope| {
            for (worker, range) in ranges.into_iter().enumerate() {
                let batches = batch_count(range.len(), plan.batch_size) as u64;
                let mut conn = match template.duplicate() {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(
                            target: "parquery::dispatcher",
                            worker,
                            error = %e,
                            "Could not open worker connection"
                        );
                        aggregator.add_errors(batches);
                        continue;
                    }
                };

                let spawned = thread::Builder::new()
                    .name(format!("parquery-worker-{}", worker))
                    .spawn_scoped(scope, move || {
                        let runner = plan.runner(handler);
                        let mut ledger = Ledger::new();
                        runner.run_range(
                            worker,
                            &mut conn,
                            source,
                            range,
                            plan.batch_size,
                            &mut ledger,
                        );
                        aggregator.absorb(ledger);
                    });
                if let Err(e) = spawned {
                    error!(
                        target: "parquery::dispatcher",
                        worker,
                        error = %e,
                        "Failed to spawn worker thread"
                    );
                    aggregator.add_errors(batches);
                }
            }
        });
        let elapsed = started.elapsed();

        debug!(
            target: "parquery::dispatcher",
            elapsed_ms = elapsed.as_millis() as u64,
            "Local run finished"
        );
        elapsed
    }
}
