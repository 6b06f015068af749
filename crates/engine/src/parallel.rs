//! `ParallelQuery`: the entry point for running a record source.

use std::time::Duration;

use parquery_core::{Command, Error, Result, SuccessStatuses};
use parquery_executor::{detect_shape, Connection, RecordSource};
use serde_json::json;
use tracing::{error, info};

use crate::config::RunConfig;
use crate::stats::{AggregateStats, StatsAggregator, StatsReport};
use crate::strategy::{ExecutionStrategy, RunPlan, Strategy};

/// Runs every record of a source in batched transactions over a pool of
/// connections.
///
/// The connection passed to [`ParallelQuery::new`] is only a template:
/// each worker duplicates it and owns the copy for the whole run.
///
/// # Example
///
/// ```ignore
/// let mut query = ParallelQuery::new(conn, RunConfig::default())?;
/// query.run(&records, 100, 8, true)?;
/// println!("{} records stored", query.succeeded_queries());
/// ```
pub struct ParallelQuery<C: Connection> {
    connection: C,
    config: RunConfig,
    stats: AggregateStats,
}

impl<C: Connection> ParallelQuery<C> {
    /// Probe `connection` with a schema request and keep it as the worker
    /// template.
    ///
    /// # Errors
    ///
    /// Returns the probe error if the connection cannot reach the database,
    /// or a config error if `config` is invalid.
    pub fn new(mut connection: C, config: RunConfig) -> Result<Self> {
        config.validate()?;

        let description = connection.describe();
        let probe = [Command::new("GetSchema", json!({}))];
        match connection.send(&probe, &[]) {
            Ok(_) => info!(
                target: "parquery::parallel",
                connection = %description,
                "Connection test successful"
            ),
            Err(e) => {
                error!(
                    target: "parquery::parallel",
                    connection = %description,
                    error = %e,
                    "Connection test failed"
                );
                return Err(e);
            }
        }

        Ok(Self {
            connection,
            config,
            stats: AggregateStats::default(),
        })
    }

    /// Run `source` with explicit batch size, worker count and reporting.
    ///
    /// Success statuses and dry-run mode come from the [`RunConfig`]. The
    /// statistics of the previous run are replaced.
    pub fn run<S: RecordSource + ?Sized>(
        &mut self,
        source: &S,
        batch_size: usize,
        worker_count: usize,
        report_stats: bool,
    ) -> Result<()> {
        if batch_size == 0 || worker_count == 0 {
            return Err(Error::invalid_input(format!(
                "batch size and worker count must be at least 1, got {} and {}",
                batch_size, worker_count
            )));
        }

        let shape = detect_shape(source)?;
        let capabilities = source.capabilities();
        info!(
            target: "parquery::parallel",
            commands_per_query = shape.commands_per_query,
            blobs_per_query = shape.blobs_per_query,
            "Query shape"
        );

        let strategy = Strategy::select(&capabilities);
        let plan = RunPlan {
            batch_size,
            worker_count,
            success_statuses: &self.config.success_statuses,
            shape,
            dry_run: self.config.dry_run,
            strict: capabilities.strict_validation,
        };
        info!(
            target: "parquery::parallel",
            strategy = ExecutionStrategy::<C>::name(&strategy),
            records = source.len(),
            batch_size,
            worker_count,
            dry_run = plan.dry_run,
            "Starting run"
        );

        let aggregator = StatsAggregator::new();
        let wall: Duration = strategy.execute(&self.connection, source, &plan, &aggregator);
        self.stats = aggregator.finish(wall, source.len(), worker_count);

        info!(
            target: "parquery::parallel",
            succeeded_queries = self.stats.succeeded_queries(),
            errors = self.stats.error_count(),
            elapsed_ms = wall.as_millis() as u64,
            "Run finished"
        );

        if report_stats {
            println!("{}", self.stats.report());
        }
        Ok(())
    }

    /// Run `source` with every parameter taken from the [`RunConfig`].
    pub fn run_configured<S: RecordSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        let RunConfig {
            batch_size,
            worker_count,
            report_stats,
            ..
        } = self.config;
        self.run(source, batch_size, worker_count, report_stats)
    }

    /// Replace the success-status set for subsequent runs.
    pub fn set_success_statuses(&mut self, statuses: SuccessStatuses) -> Result<()> {
        if statuses.is_empty() {
            return Err(Error::config("success_statuses must not be empty"));
        }
        self.config.success_statuses = statuses;
        Ok(())
    }

    /// Records whose commands all succeeded in the last run.
    pub fn succeeded_queries(&self) -> u64 {
        self.stats.succeeded_queries()
    }

    /// Commands that succeeded in the last run.
    pub fn succeeded_commands(&self) -> u64 {
        self.stats.succeeded_commands()
    }

    /// Commands that reported an existing object in the last run.
    pub fn objects_existed(&self) -> u64 {
        self.stats.objects_existed()
    }

    /// Errors counted in the last run.
    pub fn error_count(&self) -> u64 {
        self.stats.error_count()
    }

    /// Full statistics of the last run.
    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// Report of the last run, ready to print.
    pub fn stats_report(&self) -> StatsReport {
        self.stats.report()
    }

    /// Configuration this query was built with.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The template connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }
}
