//! Execution strategies.
//!
//! A run is described once as a [`RunPlan`] and handed to an
//! [`ExecutionStrategy`], which decides how the record range is spread over
//! threads. Both strategies feed the same [`StatsAggregator`] through the
//! same [`BatchRunner`], so they report identical counters for the same
//! source.

use std::time::Duration;

use parquery_core::SuccessStatuses;
use parquery_executor::{
    Connection, Executor, QueryShape, RecordSource, ResponseHandler, SourceCapabilities,
};

use crate::dispatcher::LocalPool;
use crate::distributed::DistributedCoordinator;
use crate::runner::BatchRunner;
use crate::stats::StatsAggregator;

/// Parameters of one run, shared by every worker.
#[derive(Debug, Clone)]
pub struct RunPlan<'a> {
    /// Records per transaction
    pub batch_size: usize,
    /// Maximum concurrent workers
    pub worker_count: usize,
    /// Statuses that count as success
    pub success_statuses: &'a SuccessStatuses,
    /// Commands and blobs per record
    pub shape: QueryShape,
    /// Assemble only, send nothing
    pub dry_run: bool,
    /// Propagate handler failures
    pub strict: bool,
}

impl<'a> RunPlan<'a> {
    /// Build the per-worker batch runner.
    pub fn runner<'h>(&'h self, handler: Option<&'h dyn ResponseHandler>) -> BatchRunner<'h> {
        let executor = Executor::new(self.success_statuses, self.shape)
            .with_handler(handler)
            .strict(self.strict);
        BatchRunner::new(executor, self.shape, self.dry_run)
    }
}

/// How a run is spread over workers.
pub trait ExecutionStrategy<C: Connection> {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Run every record of `source`, merging worker ledgers into
    /// `aggregator`. Returns the wall-clock time of the run.
    ///
    /// Worker connections are duplicated from `template`.
    fn execute<S: RecordSource + ?Sized>(
        &self,
        template: &C,
        source: &S,
        plan: &RunPlan<'_>,
        aggregator: &StatsAggregator,
    ) -> Duration;
}

/// The strategy picked for a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Batch-aligned ranges on a local thread pool
    Local(LocalPool),
    /// Independent partitions with their own ledgers
    Distributed(DistributedCoordinator),
}

impl Strategy {
    /// Distributed when the source asks for it, local otherwise.
    pub fn select(capabilities: &SourceCapabilities) -> Self {
        match capabilities.distributed {
            Some(config) => Strategy::Distributed(DistributedCoordinator::new(config)),
            None => Strategy::Local(LocalPool),
        }
    }
}

impl<C: Connection> ExecutionStrategy<C> for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Local(pool) => ExecutionStrategy::<C>::name(pool),
            Strategy::Distributed(coordinator) => ExecutionStrategy::<C>::name(coordinator),
        }
    }

    fn execute<S: RecordSource + ?Sized>(
        &self,
        template: &C,
        source: &S,
        plan: &RunPlan<'_>,
        aggregator: &StatsAggregator,
    ) -> Duration {
        match self {
            Strategy::Local(pool) => pool.execute(template, source, plan, aggregator),
            Strategy::Distributed(coordinator) => {
                coordinator.execute(template, source, plan, aggregator)
            }
        }
    }
}
