//! Integration tests for the complete record-exposure workflow
//!
//! These tests drive the public surface end to end:
//! - Registry startup and container creation
//! - Record publication and attribute reads
//! - The acknowledge doorbell and its self-removal protocol
//! - Release-hook accounting through the node layer
//! - Teardown cascade
//! - Racing doorbell-vs-show access from many threads

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sysview_eventlog::{
    create_and_register, handle_read_raw, handle_show, handle_store, EventLogError,
    MemNodeSpace, NodeSpace, RecordKind, RecordState, Registry, ACK_USAGE,
};

fn new_registry() -> (Arc<MemNodeSpace>, Arc<Registry>) {
    let space = Arc::new(MemNodeSpace::new());
    let registry = Registry::create("elog", Arc::clone(&space) as Arc<dyn NodeSpace>)
        .expect("container creation");
    (space, registry)
}

fn show(registry: &Registry, node: sysview_eventlog::NodeId, name: &str) -> Result<String, EventLogError> {
    let mut out = String::new();
    handle_show(registry, node, name, &mut out)?;
    Ok(out)
}

/// The end-to-end scenario: publish identity 0x2a of kind 0, observe every
/// attribute, ring the doorbell, observe the removal.
#[test]
fn test_end_to_end_acknowledge_flow() {
    let (space, registry) = new_registry();

    let record = create_and_register(&registry, 0x2a, RecordKind::new(0), b"\x01\x02\x03")
        .expect("record registration");
    let node = record.node();

    assert_eq!(show(&registry, node, "id").unwrap(), "0x2a\n");
    assert_eq!(show(&registry, node, "type").unwrap(), "0x0 PEL\n");
    assert_eq!(show(&registry, node, "acknowledge").unwrap(), ACK_USAGE);

    let mut buf = [0u8; 8];
    assert_eq!(handle_read_raw(&registry, node, 0, &mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], b"\x01\x02\x03");

    let before = record.ref_count();
    assert_eq!(handle_store(&registry, node, "acknowledge", b"x").unwrap(), 1);
    assert_eq!(record.ref_count(), before - 1);
    assert_eq!(record.state(), RecordState::Removing);

    assert_eq!(
        show(&registry, node, "acknowledge").unwrap_err(),
        EventLogError::NotFound { name: "acknowledge".into() }
    );

    // The producer's handle was the last reference; releasing it retires the
    // node itself.
    record.release();
    assert!(!space.contains(node));
    assert_eq!(
        show(&registry, node, "id").unwrap_err(),
        EventLogError::NotFound { name: "id".into() }
    );
}

/// The release hook must fire exactly once no matter how many retain/release
/// pairs the record went through, exactly at the final release.
#[test]
fn test_release_hook_fires_exactly_once() {
    let (space, registry) = new_registry();
    let record = create_and_register(&registry, 1, RecordKind::PEL, b"p").unwrap();
    let node = record.node();

    let extra = record.retain();
    let another = extra.retain();
    another.release();
    extra.release();
    assert_eq!(space.release_count(), 0);

    handle_store(&registry, node, "acknowledge", b"done").unwrap();
    assert_eq!(space.release_count(), 0, "credit loss alone must not release");

    record.release();
    assert_eq!(space.release_count(), 1);
    assert_eq!(registry.member_count(), 0);

    registry.teardown();
    assert_eq!(space.release_count(), 2); // the container
    assert!(space.is_empty());
}

#[test]
fn test_teardown_cascades_to_unacknowledged_members() {
    let (space, registry) = new_registry();
    for id in 0..3u64 {
        // Producer forgets its handle; the registration credit keeps the
        // record alive, exactly like an unacknowledged log entry.
        create_and_register(&registry, id, RecordKind::PEL, b"entry").unwrap();
    }
    assert_eq!(registry.member_count(), 3);
    assert_eq!(space.len(), 4);

    registry.teardown();
    assert!(space.is_empty());
    assert_eq!(space.release_count(), 4);
}

#[test]
fn test_teardown_spares_producer_held_records() {
    let (space, registry) = new_registry();
    let held = create_and_register(&registry, 1, RecordKind::PEL, b"held").unwrap();
    let node = held.node();

    registry.teardown();
    assert_eq!(held.state(), RecordState::Removing);
    assert_eq!(held.ref_count(), 1);
    assert!(space.contains(node), "held record must survive teardown");
    assert_eq!(held.payload(), b"held");

    held.release();
    assert!(!space.contains(node));
}

/// Concurrent shows with no store in flight: every reader sees fully formed
/// strings, every time.
#[test]
fn test_concurrent_shows_are_well_formed() {
    let (_, registry) = new_registry();
    let record = create_and_register(&registry, 0xabc, RecordKind::PEL, b"").unwrap();
    let node = record.node();

    crossbeam::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|_| {
                for _ in 0..500 {
                    assert_eq!(show(&registry, node, "id").unwrap(), "0xabc\n");
                    assert_eq!(show(&registry, node, "type").unwrap(), "0x0 PEL\n");
                }
            });
        }
    })
    .unwrap();
}

/// A doorbell store racing shows on the same record: each show either
/// completes with a fully formed string or fails `NotFound`; nothing else is
/// acceptable. Repeated rounds to give the race room to bite.
#[test]
fn test_racing_doorbell_against_shows() {
    let (space, registry) = new_registry();

    for round in 0..200u64 {
        let record =
            create_and_register(&registry, round, RecordKind::PEL, b"racing").unwrap();
        let node = record.node();
        let expected = format!("0x{round:x}\n");

        crossbeam::thread::scope(|scope| {
            for _ in 0..3 {
                scope.spawn(|_| loop {
                    match show(&registry, node, "id") {
                        Ok(text) => assert_eq!(text, expected),
                        Err(EventLogError::NotFound { .. }) => break,
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                });
            }
            scope.spawn(|_| {
                assert_eq!(
                    handle_store(&registry, node, "acknowledge", b"x").unwrap(),
                    1
                );
            });
            // Readers only stop once the record is gone; surrender the
            // producer handle from inside the scope.
            record.release();
        })
        .unwrap();

        assert!(!space.contains(node));
    }
}

/// Racing doorbells on one record: every store that still found the file
/// reports success, but the registration credit is surrendered exactly once.
#[test]
fn test_racing_doorbells_surrender_credit_once() {
    let (space, registry) = new_registry();

    for round in 0..100u64 {
        let record =
            create_and_register(&registry, round, RecordKind::PEL, b"").unwrap();
        let node = record.node();
        let acknowledged = AtomicUsize::new(0);

        crossbeam::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|_| {
                    match handle_store(&registry, node, "acknowledge", b"ring") {
                        Ok(consumed) => {
                            assert_eq!(consumed, 4);
                            acknowledged.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(EventLogError::NotFound { .. }) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                });
            }
        })
        .unwrap();

        assert!(acknowledged.load(Ordering::Relaxed) >= 1);
        // Only the producer handle remains, however many doorbells rang.
        assert_eq!(record.ref_count(), 1);
        record.release();
        assert!(!space.contains(node));
    }
}
