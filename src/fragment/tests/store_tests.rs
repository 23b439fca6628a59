//! Tests for session bookkeeping and the concurrent store.

use std::{
    num::NonZeroU32,
    time::{Duration, Instant},
};

use bytes::Bytes;

use crate::fragment::{CorrelationId, FragmentStore, SequenceNumber, store::Session};

fn seq(value: u32) -> SequenceNumber { SequenceNumber::new(value).expect("non-zero") }

fn total(value: u32) -> NonZeroU32 { NonZeroU32::new(value).expect("non-zero") }

#[test]
fn session_merges_payloads_in_sequence_order() {
    let now = Instant::now();
    let mut session = Session::new(total(3), now);
    session.insert(seq(3), Bytes::from_static(b"IJ"), now);
    session.insert(seq(1), Bytes::from_static(b"ABCD"), now);
    assert!(!session.is_complete());
    session.insert(seq(2), Bytes::from_static(b"EFGH"), now);

    assert!(session.is_complete());
    assert_eq!(session.buffered_bytes(), 10);
    assert_eq!(session.into_payload(), Bytes::from_static(b"ABCDEFGHIJ"));
}

#[test]
fn evict_idle_removes_only_sessions_past_the_timeout() {
    let store = FragmentStore::new();
    let start = Instant::now();
    for (id, offset) in [("old", 0), ("edge", 5), ("fresh", 9)] {
        let mut session = Session::new(total(2), start);
        session.insert(seq(1), Bytes::new(), start + Duration::from_secs(offset));
        let dashmap::mapref::entry::Entry::Vacant(vacant) = store.entry(id.into()) else {
            panic!("identifier {id} already present");
        };
        vacant.insert(session);
    }

    // At t=10 with a 5s timeout: "old" idled 10s, "edge" exactly 5s, "fresh" 1s.
    let evicted = store.evict_idle(start + Duration::from_secs(10), Duration::from_secs(5));

    assert_eq!(evicted, vec![CorrelationId::from("old")]);
    assert!(store.contains("edge"));
    assert!(store.contains("fresh"));
    assert_eq!(store.len(), 2);
}

#[test]
fn lookup_returns_detached_snapshot() {
    let store = FragmentStore::new();
    let now = Instant::now();
    let mut session = Session::new(total(4), now);
    session.insert(seq(2), Bytes::from_static(b"xy"), now);
    session.insert(seq(4), Bytes::from_static(b"z"), now);
    if let dashmap::mapref::entry::Entry::Vacant(vacant) = store.entry("snap".into()) {
        vacant.insert(session);
    }

    let snapshot = store.lookup("snap").expect("session present");
    assert_eq!(snapshot.total_fragments, total(4));
    assert_eq!(snapshot.received, 2);
    assert_eq!(snapshot.buffered_bytes, 3);
    assert_eq!(snapshot.sequences, vec![seq(2), seq(4)]);
    assert_eq!(snapshot.last_activity, now);

    assert!(store.remove("snap"));
    assert!(!store.remove("snap"));
    assert!(store.lookup("snap").is_none());
    assert!(store.is_empty());
}
