//! Stress Tests
//!
//! Heavy runs for the worker pool. All marked #[ignore] for opt-in execution.
//! Run with: cargo test --test engine stress -- --ignored

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::common::*;
use parquery::{DistributedConfig, Group, ParallelQuery, RunConfig, SourceCapabilities};

#[test]
#[ignore]
fn stress_many_small_batches() {
    let mut pq = ParallelQuery::new(MockDb::new().connect(), RunConfig::default()).unwrap();
    let source = image_records(50_000);

    let start = Instant::now();
    pq.run(&source, 10, 16, false).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(pq.succeeded_queries(), 50_000);
    assert_eq!(pq.stats().batches_executed(), 5_000);
    println!("50k records in {:?}", elapsed);
}

#[test]
#[ignore]
fn stress_handler_contention() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let source = TestSource::new(image_records(20_000))
        .with_handler(move |_: Group<'_>| -> anyhow::Result<()> {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .with_capabilities(SourceCapabilities {
            distributed: Some(DistributedConfig { partitions: 32 }),
            ..SourceCapabilities::default()
        });
    let mut pq = ParallelQuery::new(MockDb::new().connect(), RunConfig::default()).unwrap();

    pq.run(&source, 50, 8, false).unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 20_000);
    assert_eq!(pq.error_count(), 0);
}

#[test]
#[ignore]
fn stress_large_transaction_near_ref_limit() {
    // two commands per record, so 49_999 records put the last _ref at 99_997
    let mut pq = ParallelQuery::new(MockDb::new().connect(), RunConfig::default()).unwrap();
    let source = image_records(49_999);

    pq.run(&source, 49_999, 1, false).unwrap();

    assert_eq!(pq.error_count(), 0);
    assert_eq!(pq.succeeded_queries(), 49_999);
}
