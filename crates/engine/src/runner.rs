//! Per-batch bookkeeping shared by the local pool and distributed partitions.
//!
//! [`BatchRunner`] assembles a slice of records, executes it, and turns the
//! outcome into a ledger entry:
//!
//! | Outcome | Time | Counters |
//! |---------|------|----------|
//! | success | server time of the call | all commands, all records, status-2 count |
//! | transaction failure | 0 | zero, plus one error |
//! | partial failure | 0 | status-0 commands, status-2 count, fully successful records |
//! | dry run | 1 s | zero |
//!
//! Assembly, slicing and transport errors (and handler failures under
//! strict validation) leave no entry; the batch is counted as an error.

use std::ops::Range;
use std::time::Duration;

use parquery_core::{Record, Responses, Result, WorkerStats, STATUS_EXISTS, STATUS_OK};
use parquery_executor::{
    assemble_batch, BatchOutcome, Connection, Executor, QueryShape, RecordSource,
};
use tracing::{debug, error, warn};

use crate::stats::Ledger;

/// Time recorded for a batch in dry-run mode.
pub const DRY_RUN_BATCH_TIME: Duration = Duration::from_secs(1);

/// Runs batches and records them into a [`Ledger`].
pub struct BatchRunner<'a> {
    executor: Executor<'a>,
    shape: QueryShape,
    dry_run: bool,
}

impl<'a> BatchRunner<'a> {
    /// Wrap an executor. `shape` must match the one the executor was built
    /// with; it is used to count fully successful records in partial
    /// failures.
    pub fn new(executor: Executor<'a>, shape: QueryShape, dry_run: bool) -> Self {
        Self {
            executor,
            shape,
            dry_run,
        }
    }

    /// Execute one batch of `records` starting at absolute index `start`.
    pub fn run_batch<C: Connection>(
        &self,
        conn: &mut C,
        records: &[Record],
        start: usize,
        ledger: &mut Ledger,
    ) -> Result<()> {
        let batch = assemble_batch(records)?;

        if self.dry_run {
            debug!(
                target: "parquery::runner",
                start,
                commands = batch.commands.len(),
                "Dry run, batch not sent"
            );
            ledger.record(DRY_RUN_BATCH_TIME, WorkerStats::default());
            return Ok(());
        }

        let report = self.executor.execute(conn, &batch, Some(start))?;
        match report.outcome {
            BatchOutcome::Success => {
                let stats = WorkerStats {
                    succeeded_commands: batch.commands.len() as u64,
                    succeeded_queries: batch.records as u64,
                    objects_existed: count_status(&report.responses, STATUS_EXISTS),
                };
                ledger.record(conn.last_call_duration(), stats);
            }
            BatchOutcome::TransactionFailure => {
                ledger.record(Duration::ZERO, WorkerStats::default());
                ledger.record_error();
            }
            BatchOutcome::PartialFailure => {
                let stats = WorkerStats {
                    succeeded_commands: count_status(&report.responses, STATUS_OK),
                    succeeded_queries: fully_successful_groups(
                        &report.responses,
                        self.shape.commands_per_query,
                    ),
                    objects_existed: count_status(&report.responses, STATUS_EXISTS),
                };
                ledger.record(Duration::ZERO, stats);
            }
        }
        Ok(())
    }

    /// Run every batch of `range` in order.
    ///
    /// Batch errors are logged and counted; the worker moves on to the next
    /// batch.
    pub fn run_range<C, S>(
        &self,
        worker: usize,
        conn: &mut C,
        source: &S,
        range: Range<usize>,
        batch_size: usize,
        ledger: &mut Ledger,
    ) where
        C: Connection,
        S: RecordSource + ?Sized,
    {
        let batches = batch_count(range.len(), batch_size);
        debug!(
            target: "parquery::runner",
            worker,
            batches,
            start = range.start,
            end = range.end,
            "Worker starting"
        );

        for i in 0..batches {
            let start = range.start + i * batch_size;
            let end = (start + batch_size).min(range.end);

            let result = source
                .slice(start..end)
                .and_then(|records| self.run_batch(conn, &records, start, ledger));
            if let Err(e) = result {
                if e.is_assembly_error() {
                    error!(target: "parquery::runner", error = %e, "Could not assemble batch");
                } else {
                    error!(target: "parquery::runner", error = %e, "Batch error");
                }
                warn!(
                    target: "parquery::runner",
                    worker,
                    batch = i,
                    start,
                    end,
                    "Worker failed to execute batch"
                );
                ledger.record_error();
            }

            if worker == 0 {
                debug!(
                    target: "parquery::runner",
                    done = i + 1,
                    of = batches,
                    "Progress"
                );
            }
        }
    }
}

/// Number of batches needed for `records` records.
pub fn batch_count(records: usize, batch_size: usize) -> usize {
    let batch_size = batch_size.max(1);
    (records + batch_size - 1) / batch_size
}

fn count_status(responses: &Responses, status: i64) -> u64 {
    responses
        .per_command()
        .unwrap_or_default()
        .iter()
        .flat_map(|response| response.statuses())
        .filter(|s| *s == Some(status))
        .count() as u64
}

fn fully_successful_groups(responses: &Responses, commands_per_query: usize) -> u64 {
    let Some(list) = responses.per_command() else {
        return 0;
    };
    list.chunks(commands_per_query.max(1))
        .filter(|group| group.iter().all(|r| r.all_status(STATUS_OK)))
        .count() as u64
}
