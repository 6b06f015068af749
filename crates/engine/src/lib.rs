//! Parallel execution engine for parquery
//!
//! This crate drives a whole record source through the executor:
//! - [`ParallelQuery`]: entry point, connection probe and per-run statistics
//! - Local worker pool over batch-aligned ranges ([`LocalPool`])
//! - Partitioned execution with mergeable reports ([`DistributedCoordinator`])
//! - Statistics aggregation and the end-of-run report
//! - Run configuration from `parquery.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatcher;
pub mod distributed;
pub mod parallel;
pub mod runner;
pub mod stats;
pub mod strategy;

pub use config::{RunConfig, CONFIG_FILE_NAME};
pub use dispatcher::{partition, LocalPool};
pub use distributed::{split, DistributedCoordinator, PartitionReport};
pub use parallel::ParallelQuery;
pub use runner::{batch_count, BatchRunner, DRY_RUN_BATCH_TIME};
pub use stats::{AggregateStats, BatchEntry, Ledger, StatsAggregator, StatsReport};
pub use strategy::{ExecutionStrategy, RunPlan, Strategy};
