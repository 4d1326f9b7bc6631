//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use revisioned_stream_client::client::RevisionedStreamClient;
use revisioned_stream_client::config::ClientConfig;
use revisioned_stream_client::mock::InMemorySegment;
use revisioned_stream_client::serializer::CborSerializer;
use tokio::runtime::Runtime;
use tracing::info;

/// Installs a fmt subscriber so `tracing::info!`/`warn!` calls made by the
/// client surface when a test is run with `--nocapture`. Safe to call from
/// every test; a second install attempt is ignored.
fn init_test_logging() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Scenario 1: three unconditional appends are read back in ascending
/// revision order, and `latest_revision` tracks the last one written.
#[test]
fn test_unconditional_appends_are_read_in_order() {
    init_test_logging();
    info!("test unconditional appends are read in order");
    let mut rt = Runtime::new().expect("runtime");
    let segment = InMemorySegment::new(1);
    let client = RevisionedStreamClient::new(
        segment.segment_id(),
        Box::new(segment.reader()),
        Box::new(segment.writer()),
        Box::new(segment.metadata()),
        CborSerializer::new(),
        ClientConfig::default(),
        rt.handle().clone(),
    );

    rt.block_on(client.write(&"a".to_owned())).expect("write a");
    rt.block_on(client.write(&"b".to_owned())).expect("write b");
    rt.block_on(client.write(&"c".to_owned())).expect("write c");

    let oldest = rt.block_on(client.oldest_revision()).expect("oldest");
    let mut iter = rt.block_on(client.read_from(oldest)).expect("read_from oldest");

    let (r1, v1) = iter.next().expect("first").expect("ok");
    let (r2, v2) = iter.next().expect("second").expect("ok");
    let (r3, v3) = iter.next().expect("third").expect("ok");
    assert!(iter.next().is_none(), "iterator exhausted after three records");

    assert_eq!((v1.as_str(), v2.as_str(), v3.as_str()), ("a", "b", "c"));
    assert!(r1 < r2 && r2 < r3);

    let latest = rt.block_on(client.latest_revision()).expect("latest");
    assert_eq!(latest, r3);
    info!("test unconditional appends are read in order passed");
}

/// Scenario 2: two conditional appends race from the same expected revision;
/// exactly one wins, and the stream reflects only the winner.
#[test]
fn test_conditional_append_resolves_a_race() {
    let mut rt = Runtime::new().expect("runtime");
    let segment = InMemorySegment::new(2);
    let client = new_client_in(&segment, &mut rt);

    let r0 = rt.block_on(client.latest_revision()).expect("latest");

    let first = rt
        .block_on(client.write_if_at(r0, &"first".to_owned()))
        .expect("write_if_at first");
    let second = rt
        .block_on(client.write_if_at(r0, &"second".to_owned()))
        .expect("write_if_at second");

    assert!(first.is_some() ^ second.is_some(), "exactly one append should win");

    let mut iter = rt.block_on(client.read_from(r0)).expect("read_from r0");
    let (_, value) = iter.next().expect("winning record").expect("ok");
    assert!(iter.next().is_none(), "only the winner is visible");
    assert!(value == "first" || value == "second");
    if first.is_some() {
        assert_eq!(value, "first");
    } else {
        assert_eq!(value, "second");
    }
}

/// Scenario 3: the mark is a CAS'd single slot, independent of append data.
#[test]
fn test_mark_compare_and_set() {
    let mut rt = Runtime::new().expect("runtime");
    let segment = InMemorySegment::new(3);
    let client = new_client_in(&segment, &mut rt);

    rt.block_on(client.write(&"a".to_owned())).expect("write a");
    let r1 = rt.block_on(client.latest_revision()).expect("latest");
    rt.block_on(client.write(&"b".to_owned())).expect("write b");
    let r2 = rt.block_on(client.latest_revision()).expect("latest");

    assert!(rt
        .block_on(client.compare_and_set_mark(None, Some(r1)))
        .expect("cas 1"));
    assert!(!rt
        .block_on(client.compare_and_set_mark(None, Some(r2)))
        .expect("cas 2 should fail, mark is no longer None"));
    assert_eq!(rt.block_on(client.get_mark()).expect("get mark"), Some(r1));

    assert!(rt
        .block_on(client.compare_and_set_mark(Some(r1), Some(r2)))
        .expect("cas 3"));
    assert_eq!(rt.block_on(client.get_mark()).expect("get mark"), Some(r2));
}

/// Scenario 4: an iterator's upper bound is frozen at creation; appends made
/// after the iterator exists are invisible to it.
#[test]
fn test_iterator_is_snapshot_bounded() {
    let mut rt = Runtime::new().expect("runtime");
    let segment = InMemorySegment::new(4);
    let client = new_client_in(&segment, &mut rt);

    rt.block_on(client.write(&"a".to_owned())).expect("write a");
    rt.block_on(client.write(&"b".to_owned())).expect("write b");
    rt.block_on(client.write(&"c".to_owned())).expect("write c");

    let oldest = rt.block_on(client.oldest_revision()).expect("oldest");
    let mut iter = rt.block_on(client.read_from(oldest)).expect("read_from");

    rt.block_on(client.write(&"d".to_owned())).expect("write d after iterator created");

    let values: Vec<String> = std::iter::from_fn(|| iter.next()).map(|r| r.expect("ok").1).collect();
    assert_eq!(values, vec!["a", "b", "c"]);
}

/// Scenario 5: truncation makes the truncated prefix unreadable while
/// leaving reads starting at or after the truncation point intact.
#[test]
fn test_truncation_blocks_stale_reads() {
    let mut rt = Runtime::new().expect("runtime");
    let segment = InMemorySegment::new(5);
    let client = new_client_in(&segment, &mut rt);

    rt.block_on(client.write(&"a".to_owned())).expect("write a");
    let r1 = rt.block_on(client.latest_revision()).expect("latest after a");
    rt.block_on(client.write(&"b".to_owned())).expect("write b");
    let r2 = rt.block_on(client.latest_revision()).expect("latest after b");

    rt.block_on(client.truncate_to(r2)).expect("truncate to r2");

    assert!(rt.block_on(client.read_from(r1)).is_err(), "reads below r2 are truncated");
    let mut iter = rt.block_on(client.read_from(r2)).expect("read_from r2 should succeed");
    assert!(iter.next().is_none(), "nothing has been appended since r2");

    let oldest = rt.block_on(client.oldest_revision()).expect("oldest");
    assert!(oldest >= r2);
}

/// Scenario 6: a segment sealed mid-append surfaces as `CorruptedState`, but
/// `close()` still succeeds afterwards.
#[test]
fn test_sealed_segment_during_append_is_corrupted_state() {
    let mut rt = Runtime::new().expect("runtime");
    let segment = InMemorySegment::new(6);
    let client = new_client_in(&segment, &mut rt);

    rt.block_on(segment.seal());

    let result = rt.block_on(client.write(&"a".to_owned()));
    assert!(result.is_err(), "append into a sealed segment must fail");

    rt.block_on(client.close()).expect("close must succeed even after a sealed-segment failure");
}

#[test]
fn test_conditional_append_rejection_does_not_advance_write_offset() {
    let mut rt = Runtime::new().expect("runtime");
    let segment = InMemorySegment::new(7);
    let client = new_client_in(&segment, &mut rt);

    rt.block_on(client.write(&"a".to_owned())).expect("write a");
    let latest_before = rt.block_on(client.latest_revision()).expect("latest before");
    let stale = rt.block_on(client.oldest_revision()).expect("oldest, now stale");

    let result = rt.block_on(client.write_if_at(stale, &"b".to_owned())).expect("write_if_at");
    assert!(result.is_none(), "append from a stale expected revision must be rejected");

    let latest_after = rt.block_on(client.latest_revision()).expect("latest after");
    assert_eq!(latest_before, latest_after, "rejected append must not move the write offset");
}

fn new_client_in(
    segment: &InMemorySegment,
    rt: &mut Runtime,
) -> RevisionedStreamClient<String, CborSerializer<String>> {
    init_test_logging();
    RevisionedStreamClient::new(
        segment.segment_id(),
        Box::new(segment.reader()),
        Box::new(segment.writer()),
        Box::new(segment.metadata()),
        CborSerializer::new(),
        ClientConfig::default(),
        rt.handle().clone(),
    )
}
