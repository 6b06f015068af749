//! Response handler dispatch through full runs.

use std::sync::Arc;

use crate::common::*;
use parking_lot::Mutex;
use parquery::{Group, ParallelQuery, RunConfig, SourceCapabilities};

fn query() -> ParallelQuery<MockConnection> {
    ParallelQuery::new(MockDb::new().connect(), RunConfig::default()).unwrap()
}

fn strict() -> SourceCapabilities {
    SourceCapabilities {
        strict_validation: true,
        ..SourceCapabilities::default()
    }
}

#[test]
fn handler_sees_every_record_with_its_blob() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let source = TestSource::new(image_records(9)).with_handler(
        move |group: Group<'_>| -> anyhow::Result<()> {
            let index = group.index.unwrap_or(usize::MAX);
            let blobs = group.blobs_out.map(|b| b.to_vec()).unwrap_or_default();
            sink.lock().push((index, blobs, group.commands.len()));
            Ok(())
        },
    );
    let mut pq = query();

    pq.run(&source, 4, 2, false).unwrap();

    let mut seen = seen.lock().clone();
    seen.sort_by_key(|(index, _, _)| *index);
    assert_eq!(seen.len(), 9);
    for (i, (index, blobs, commands)) in seen.into_iter().enumerate() {
        assert_eq!(index, i);
        assert_eq!(commands, 2);
        assert_eq!(blobs, vec![(i as i64).to_le_bytes().to_vec()]);
    }
}

#[test]
fn handler_not_called_for_rejected_batch() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let source = TestSource::new(image_records(4)).with_handler(
        move |group: Group<'_>| -> anyhow::Result<()> {
            sink.lock().push(group.index);
            Ok(())
        },
    );
    let mut pq = ParallelQuery::new(MockDb::new().reject([3]).connect(), RunConfig::default())
        .unwrap();

    pq.run(&source, 2, 1, false).unwrap();

    assert_eq!(*calls.lock(), vec![Some(0), Some(1)]);
    assert_eq!(pq.error_count(), 1);
}

#[test]
fn handler_error_is_swallowed_by_default() {
    let source = TestSource::new(image_records(4)).with_handler(
        |group: Group<'_>| -> anyhow::Result<()> {
            if group.index == Some(1) {
                anyhow::bail!("record 1 looks wrong");
            }
            Ok(())
        },
    );
    let mut pq = query();

    pq.run(&source, 2, 2, false).unwrap();

    assert_eq!(pq.error_count(), 0);
    assert_eq!(pq.succeeded_queries(), 4);
}

#[test]
fn strict_handler_error_fails_the_batch() {
    let source = TestSource::new(image_records(4))
        .with_handler(|group: Group<'_>| -> anyhow::Result<()> {
            if group.index == Some(1) {
                anyhow::bail!("record 1 looks wrong");
            }
            Ok(())
        })
        .with_capabilities(strict());
    let mut pq = query();

    pq.run(&source, 2, 2, false).unwrap();

    assert_eq!(pq.error_count(), 1);
    assert_eq!(pq.succeeded_queries(), 2);
    assert_eq!(pq.stats().batches_executed(), 1);
}

#[test]
fn strict_handler_panic_fails_the_batch() {
    let source = TestSource::new(image_records(2))
        .with_handler(|group: Group<'_>| -> anyhow::Result<()> {
            if group.index == Some(0) {
                panic!("handler bug");
            }
            Ok(())
        })
        .with_capabilities(strict());
    let mut pq = query();

    pq.run(&source, 2, 1, false).unwrap();

    assert_eq!(pq.error_count(), 1);
    assert_eq!(pq.succeeded_queries(), 0);
}
