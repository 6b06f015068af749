//! Distributed execution.
//!
//! The source is split into contiguous, batch-aligned partitions. Each
//! partition is an isolated job: it gets its own pre-opened connection,
//! batches its range with the same
//! [`BatchRunner`](crate::runner::BatchRunner) as the local pool, and
//! returns a self-contained [`PartitionReport`]. A fixed number of job
//! threads drain the partition queue; the coordinator then merges the
//! reports in partition order.

use std::collections::VecDeque;
use std::ops::Range;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use parquery_executor::{Connection, DistributedConfig, RecordSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::runner::batch_count;
use crate::stats::{Ledger, StatsAggregator};
use crate::strategy::{ExecutionStrategy, RunPlan};

/// Result of one partition, independent of the process that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionReport {
    /// Partition number
    pub partition: usize,
    /// First record
    pub start: usize,
    /// One past the last record
    pub end: usize,
    /// Batch times, counters and errors
    pub ledger: Ledger,
}

/// Split `[0, total)` into `partitions` contiguous, batch-aligned ranges.
///
/// Whole batches are dealt out near-equally: the first
/// `batches % partitions` ranges get one extra batch. Only the last range
/// may end on a short batch, so the partitions run exactly as many batches
/// as the local pool would. Empty ranges are dropped.
///
/// ```text
/// 10 records, batch 4, 2 partitions
/// batches:     [0..4) [4..8) [8..10)
/// partition 0: [0..8)
/// partition 1: [8..10)
/// ```
pub fn split(total: usize, batch_size: usize, partitions: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    let partitions = partitions.max(1);
    let batches = batch_count(total, batch_size);
    let base = batches / partitions;
    let extra = batches % partitions;

    let mut ranges = Vec::with_capacity(partitions.min(batches));
    let mut start = 0;
    for p in 0..partitions {
        let len = (base + usize::from(p < extra)) * batch_size;
        if len == 0 || start >= total {
            break;
        }
        let end = (start + len).min(total);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// Runs partitions as independent jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributedCoordinator {
    config: DistributedConfig,
}

struct Job<C> {
    partition: usize,
    range: Range<usize>,
    conn: Option<C>,
}

impl DistributedCoordinator {
    /// Coordinator for `config`.
    pub fn new(config: DistributedConfig) -> Self {
        Self { config }
    }

    /// Configured partition count.
    pub fn partitions(&self) -> usize {
        self.config.partitions
    }

    fn run_job<C, S>(job: Job<C>, source: &S, plan: &RunPlan<'_>) -> PartitionReport
    where
        C: Connection,
        S: RecordSource + ?Sized,
    {
        let mut ledger = Ledger::new();
        match job.conn {
            Some(mut conn) => {
                let runner = plan.runner(source.response_handler());
                runner.run_range(
                    job.partition,
                    &mut conn,
                    source,
                    job.range.clone(),
                    plan.batch_size,
                    &mut ledger,
                );
            }
            None => {
                ledger.record_errors(batch_count(job.range.len(), plan.batch_size) as u64);
            }
        }
        debug!(
            target: "parquery::distributed",
            partition = job.partition,
            batches = ledger.entries().len(),
            errors = ledger.errors(),
            "Partition finished"
        );
        PartitionReport {
            partition: job.partition,
            start: job.range.start,
            end: job.range.end,
            ledger,
        }
    }
}

impl<C: Connection> ExecutionStrategy<C> for DistributedCoordinator {
    fn name(&self) -> &'static str {
        "distributed"
    }

    fn execute<S: RecordSource + ?Sized>(
        &self,
        template: &C,
        source: &S,
        plan: &RunPlan<'_>,
        aggregator: &StatsAggregator,
    ) -> Duration {
        let ranges = split(source.len(), plan.batch_size, self.config.partitions);
        let threads = plan.worker_count.max(1).min(ranges.len());
        info!(
            target: "parquery::distributed",
            records = source.len(),
            partitions = ranges.len(),
            threads,
            "Starting distributed run"
        );

        let started = Instant::now();

        let queue: VecDeque<Job<C>> = ranges
            .into_iter()
            .enumerate()
            .map(|(partition, range)| {
                let conn = match template.duplicate() {
                    Ok(conn) => Some(conn),
                    Err(e) => {
                        error!(
                            target: "parquery::distributed",
                            partition,
                            error = %e,
                            "Could not open partition connection"
                        );
                        None
                    }
                };
                Job {
                    partition,
                    range,
                    conn,
                }
            })
            .collect();
        let queue = Mutex::new(queue);
        let reports = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for t in 0..threads {
                let spawned = thread::Builder::new()
                    .name(format!("parquery-partition-{}", t))
                    .spawn_scoped(scope, || loop {
                        let Some(job) = queue.lock().pop_front() else {
                            break;
                        };
                        let report = Self::run_job(job, source, plan);
                        reports.lock().push(report);
                    });
                if let Err(e) = spawned {
                    error!(
                        target: "parquery::distributed",
                        thread = t,
                        error = %e,
                        "Failed to spawn partition thread"
                    );
                }
            }
        });

        // jobs left behind when no thread could be spawned
        for job in queue.into_inner() {
            reports.lock().push(Self::run_job(job, source, plan));
        }

        let elapsed = started.elapsed();
        let mut reports = reports.into_inner();
        reports.sort_by_key(|report| report.partition);
        for report in reports {
            aggregator.absorb(report.ledger);
        }

        debug!(
            target: "parquery::distributed",
            elapsed_ms = elapsed.as_millis() as u64,
            "Distributed run finished"
        );
        elapsed
    }
}
