//! Counting scenarios for local runs.

use crate::common::*;
use parquery::{Error, ParallelQuery, RunConfig, SuccessStatuses};

fn query(db: MockDb) -> ParallelQuery<MockConnection> {
    ParallelQuery::new(db.connect(), RunConfig::default()).unwrap()
}

#[test]
fn all_records_succeed() {
    let mut pq = query(MockDb::new());
    let source = image_records(10);

    pq.run(&source, 3, 2, false).unwrap();

    assert_eq!(pq.succeeded_queries(), 10);
    assert_eq!(pq.succeeded_commands(), 20);
    assert_eq!(pq.objects_existed(), 0);
    assert_eq!(pq.error_count(), 0);
    assert_eq!(pq.stats().batches_executed(), 4);
    assert!(pq.stats().overall_throughput().is_some());
    // probe plus one call per batch
    assert_eq!(pq.connection().calls(), 5);
}

#[test]
fn rejected_middle_batch() {
    // batches [0,4) [4,8) [8,10); id 5 sinks the second one
    let mut pq = query(MockDb::new().reject([5]));
    let source = image_records(10);

    pq.run(&source, 4, 2, false).unwrap();

    let stats = pq.stats();
    assert_eq!(stats.batches_executed(), 3);
    assert_eq!(pq.error_count(), 1);
    assert_eq!(pq.succeeded_queries(), 6);
    assert_eq!(stats.overall_throughput(), None);
    let pct = stats.error_percentage().unwrap();
    assert!((pct - 33.33).abs() < 0.01, "got {}", pct);

    let text = pq.stats_report().to_string();
    assert!(text.contains("Errors (%): 33.33"));
    assert!(text.contains("NaN"));
}

#[test]
fn every_record_is_sent_once() {
    let mut pq = query(MockDb::new());
    let source = image_records(23);

    pq.run(&source, 4, 3, false).unwrap();

    let mut ids = pq.connection().seen_ids();
    ids.sort_unstable();
    assert_eq!(ids, (0..23).collect::<Vec<_>>());
}

#[test]
fn unresolved_ref_fails_only_its_batch() {
    let mut source = image_records(4);
    source[3] = dangling_record(3);
    let mut pq = query(MockDb::new());

    pq.run(&source, 2, 2, false).unwrap();

    assert_eq!(pq.succeeded_queries(), 2);
    assert_eq!(pq.error_count(), 1);
    assert_eq!(pq.stats().batches_executed(), 1);
    assert!(!pq.connection().seen_ids().contains(&2));
}

#[test]
fn existing_objects_count_as_success() {
    let mut pq = query(MockDb::new().existing([1, 2]));
    let source = image_records(4);

    pq.run(&source, 4, 1, false).unwrap();

    assert_eq!(pq.succeeded_queries(), 4);
    assert_eq!(pq.succeeded_commands(), 8);
    assert_eq!(pq.objects_existed(), 2);
    assert_eq!(pq.error_count(), 0);
}

#[test]
fn narrower_success_set_turns_existing_into_partial() {
    let config = RunConfig {
        success_statuses: SuccessStatuses::new([0]),
        ..RunConfig::default()
    };
    let mut pq = ParallelQuery::new(MockDb::new().existing([1]).connect(), config).unwrap();
    let source = image_records(4);

    pq.run(&source, 4, 1, false).unwrap();

    // record 1 has a status-2 add; the other three are clean
    assert_eq!(pq.succeeded_queries(), 3);
    assert_eq!(pq.succeeded_commands(), 7);
    assert_eq!(pq.objects_existed(), 1);
    assert_eq!(pq.error_count(), 0);
}

#[test]
fn partial_failure_is_not_an_error() {
    let mut pq = query(MockDb::new().failing([0]));
    let source = image_records(3);

    pq.run(&source, 3, 1, false).unwrap();

    assert_eq!(pq.succeeded_queries(), 2);
    assert_eq!(pq.succeeded_commands(), 5);
    assert_eq!(pq.error_count(), 0);
    assert_eq!(pq.stats().entries()[0].elapsed_secs, 0.0);
}

#[test]
fn dry_run_sends_nothing() {
    let config = RunConfig {
        dry_run: true,
        ..RunConfig::default()
    };
    let mut pq = ParallelQuery::new(MockDb::new().connect(), config).unwrap();
    let source = image_records(6);

    pq.run(&source, 2, 2, false).unwrap();

    assert_eq!(pq.connection().calls(), 1);
    assert_eq!(pq.succeeded_queries(), 0);
    assert_eq!(pq.stats().batches_executed(), 3);
    assert_eq!(pq.stats().mean_time(), Some(1.0));
}

#[test]
fn failed_probe_is_returned() {
    let result = ParallelQuery::new(MockDb::new().unreachable().connect(), RunConfig::default());
    assert!(matches!(result, Err(Error::Transport(_))));
}

#[test]
fn worker_connection_failure_counts_every_batch() {
    let mut pq = query(MockDb::new().no_duplicates());
    let source = image_records(10);

    pq.run(&source, 4, 2, false).unwrap();

    assert_eq!(pq.error_count(), 3);
    assert_eq!(pq.stats().batches_executed(), 0);
    assert!(pq.stats_report().to_string().contains("All queries failed!"));
}

#[test]
fn empty_source_runs_nothing() {
    let mut pq = query(MockDb::new());
    let source = image_records(0);

    pq.run(&source, 4, 4, false).unwrap();

    assert_eq!(pq.stats().batches_executed(), 0);
    assert_eq!(pq.error_count(), 0);
    assert_eq!(pq.connection().calls(), 1);
}

#[test]
fn zero_batch_size_is_rejected() {
    let mut pq = query(MockDb::new());
    let source = image_records(2);
    assert!(matches!(
        pq.run(&source, 0, 1, false),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn report_is_stable_between_runs() {
    let mut pq = query(MockDb::new().reject([0]));
    let source = image_records(5);

    pq.run(&source, 1, 2, false).unwrap();

    let first = pq.stats_report().to_string();
    let second = pq.stats_report().to_string();
    assert_eq!(first, second);
}

#[test]
fn second_run_replaces_stats() {
    let mut pq = query(MockDb::new());

    pq.run(&image_records(8), 2, 2, false).unwrap();
    assert_eq!(pq.succeeded_queries(), 8);

    pq.run(&image_records(3), 2, 2, false).unwrap();
    assert_eq!(pq.succeeded_queries(), 3);
}

#[test]
fn run_configured_uses_config_values() {
    let config = RunConfig {
        batch_size: 5,
        worker_count: 1,
        ..RunConfig::default()
    };
    let mut pq = ParallelQuery::new(MockDb::new().connect(), config).unwrap();

    pq.run_configured(&image_records(12)).unwrap();

    assert_eq!(pq.stats().batches_executed(), 3);
    assert_eq!(pq.succeeded_queries(), 12);
}

#[test]
fn success_set_can_change_between_runs() {
    let mut pq = query(MockDb::new().existing([0]));
    let source = image_records(2);

    pq.run(&source, 2, 1, false).unwrap();
    assert_eq!(pq.succeeded_queries(), 2);

    pq.set_success_statuses(SuccessStatuses::new([0])).unwrap();
    pq.run(&source, 2, 1, false).unwrap();
    assert_eq!(pq.succeeded_queries(), 1);
}
