//! Distributed partitions against the local pool.

use std::sync::Arc;

use crate::common::*;
use parking_lot::Mutex;
use parquery::{DistributedConfig, Group, ParallelQuery, RunConfig, SourceCapabilities};

fn distributed(partitions: usize) -> SourceCapabilities {
    SourceCapabilities {
        distributed: Some(DistributedConfig { partitions }),
        ..SourceCapabilities::default()
    }
}

fn counters(pq: &ParallelQuery<MockConnection>) -> (u64, u64, u64, u64) {
    (
        pq.succeeded_queries(),
        pq.succeeded_commands(),
        pq.objects_existed(),
        pq.error_count(),
    )
}

fn run(db: MockDb, source: &TestSource, batch_size: usize) -> ParallelQuery<MockConnection> {
    let mut pq = ParallelQuery::new(db.connect(), RunConfig::default()).unwrap();
    pq.run(source, batch_size, 3, false).unwrap();
    pq
}

#[test]
fn distributed_matches_local_counters() {
    let db = || MockDb::new().existing([2, 7, 11]).reject([5]).failing([13]);

    let local = run(db(), &TestSource::new(image_records(20)), 1);
    let remote = run(
        db(),
        &TestSource::new(image_records(20)).with_capabilities(distributed(4)),
        1,
    );

    assert_eq!(counters(&local), counters(&remote));
    assert_eq!(local.error_count(), 1);
    assert_eq!(
        local.stats().batches_executed(),
        remote.stats().batches_executed()
    );
}

/// Report text without the wall-clock line.
fn report_without_wall_time(pq: &ParallelQuery<MockConnection>) -> Vec<String> {
    pq.stats_report()
        .to_string()
        .lines()
        .filter(|line| !line.starts_with("Total time"))
        .map(str::to_string)
        .collect()
}

#[test]
fn distributed_matches_local_with_uneven_batches() {
    // batches [0,4) [4,8) [8,10); id 5 sinks the second one
    let db = || MockDb::new().reject([5]);

    let local = run(db(), &TestSource::new(image_records(10)), 4);
    let remote = run(
        db(),
        &TestSource::new(image_records(10)).with_capabilities(distributed(2)),
        4,
    );

    assert_eq!(remote.stats().batches_executed(), 3);
    assert_eq!(
        local.stats().batches_executed(),
        remote.stats().batches_executed()
    );
    assert_eq!(counters(&local), counters(&remote));
    assert_eq!(
        local.stats().error_percentage(),
        remote.stats().error_percentage()
    );
    let pct = remote.stats().error_percentage().unwrap();
    assert!((pct - 33.33).abs() < 0.01, "got {}", pct);
    assert_eq!(report_without_wall_time(&local), report_without_wall_time(&remote));
}

#[test]
fn distributed_matches_local_batch_count_for_many_shapes() {
    for (records, batch_size, partitions) in [(10, 4, 2), (17, 4, 5), (23, 5, 3), (7, 3, 4)] {
        let local = run(MockDb::new(), &TestSource::new(image_records(records)), batch_size);
        let remote = run(
            MockDb::new(),
            &TestSource::new(image_records(records)).with_capabilities(distributed(partitions)),
            batch_size,
        );
        assert_eq!(
            local.stats().batches_executed(),
            remote.stats().batches_executed(),
            "{} records, batch {}, {} partitions",
            records,
            batch_size,
            partitions
        );
    }
}

#[test]
fn distributed_covers_every_record() {
    let source = TestSource::new(image_records(17)).with_capabilities(distributed(5));
    let pq = run(MockDb::new(), &source, 4);

    let mut ids = pq.connection().seen_ids();
    ids.sort_unstable();
    assert_eq!(ids, (0..17).collect::<Vec<_>>());
    assert_eq!(pq.succeeded_queries(), 17);
    assert_eq!(pq.error_count(), 0);
}

#[test]
fn more_partitions_than_records() {
    let source = TestSource::new(image_records(3)).with_capabilities(distributed(8));
    let pq = run(MockDb::new(), &source, 2);

    assert_eq!(pq.succeeded_queries(), 3);
    assert_eq!(pq.stats().batches_executed(), 2);
}

#[test]
fn distributed_handler_gets_absolute_indexes() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let source = TestSource::new(image_records(10))
        .with_capabilities(distributed(3))
        .with_handler(move |group: Group<'_>| -> anyhow::Result<()> {
            sink.lock().extend(group.index);
            Ok(())
        });

    run(MockDb::new(), &source, 3);

    let mut seen = seen.lock().clone();
    seen.sort_unstable();
    assert_eq!(seen, (0..10).collect::<Vec<_>>());
}

#[test]
fn distributed_connection_failure_counts_batches() {
    let source = TestSource::new(image_records(9)).with_capabilities(distributed(3));
    let pq = run(MockDb::new().no_duplicates(), &source, 2);

    // five batches of 2 dealt 2/2/1 over three partitions
    assert_eq!(pq.error_count(), 5);
    assert_eq!(pq.succeeded_queries(), 0);
}
