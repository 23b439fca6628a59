//! Concurrent store of in-flight reassembly sessions.
//!
//! [`FragmentStore`] maps each [`CorrelationId`] to the fragments collected so
//! far. It is backed by a [`DashMap`], so the check-then-act sequence of
//! admission runs under a single shard lock per identifier while unrelated
//! identifiers proceed in parallel. Sweeping uses `retain`, which is safe to
//! run alongside admissions.

use std::{
    collections::BTreeMap,
    num::NonZeroU32,
    time::{Duration, Instant},
};

use bytes::{Bytes, BytesMut};
use dashmap::{DashMap, mapref::entry::Entry};

use super::{CorrelationId, SequenceNumber};

/// Fragments collected for one correlation identifier.
#[derive(Debug)]
pub(crate) struct Session {
    total_fragments: NonZeroU32,
    fragments: BTreeMap<SequenceNumber, Bytes>,
    buffered_bytes: usize,
    last_activity: Instant,
}

impl Session {
    pub(crate) fn new(total_fragments: NonZeroU32, now: Instant) -> Self {
        Self {
            total_fragments,
            fragments: BTreeMap::new(),
            buffered_bytes: 0,
            last_activity: now,
        }
    }

    pub(crate) fn total_fragments(&self) -> NonZeroU32 { self.total_fragments }

    pub(crate) fn received(&self) -> usize { self.fragments.len() }

    pub(crate) fn buffered_bytes(&self) -> usize { self.buffered_bytes }

    pub(crate) fn contains(&self, sequence: SequenceNumber) -> bool {
        self.fragments.contains_key(&sequence)
    }

    /// Store a fragment that is known to be new and refresh the activity stamp.
    pub(crate) fn insert(&mut self, sequence: SequenceNumber, payload: Bytes, now: Instant) {
        debug_assert!(sequence.get() <= self.total_fragments.get());
        self.buffered_bytes += payload.len();
        self.fragments.insert(sequence, payload);
        self.last_activity = now;
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.received() == self.total_fragments.get() as usize
    }

    fn idle_for(&self, now: Instant) -> Duration { now.saturating_duration_since(self.last_activity) }

    /// Concatenate the payloads in ascending sequence order.
    pub(crate) fn into_payload(self) -> Bytes {
        if self.fragments.len() == 1 {
            return self.fragments.into_values().next().unwrap_or_default();
        }
        let mut merged = BytesMut::with_capacity(self.buffered_bytes);
        for payload in self.fragments.into_values() {
            merged.extend_from_slice(&payload);
        }
        merged.freeze()
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            total_fragments: self.total_fragments,
            received: self.received(),
            buffered_bytes: self.buffered_bytes,
            sequences: self.fragments.keys().copied().collect(),
            last_activity: self.last_activity,
        }
    }
}

/// Point-in-time view of a session, detached from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Fragment count established by the first fragment of the session.
    pub total_fragments: NonZeroU32,
    /// Number of distinct fragments received so far.
    pub received: usize,
    /// Total payload bytes buffered so far.
    pub buffered_bytes: usize,
    /// Sequence numbers received so far, ascending.
    pub sequences: Vec<SequenceNumber>,
    /// Moment the most recent fragment was accepted.
    pub last_activity: Instant,
}

/// Concurrent map of in-flight sessions keyed by [`CorrelationId`].
#[derive(Debug, Default)]
pub struct FragmentStore(DashMap<CorrelationId, Session>);

impl FragmentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Return a snapshot of the session for `id`, if one is in flight.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<SessionSnapshot> {
        self.0.get(id).map(|session| session.snapshot())
    }

    /// Report whether a session for `id` is in flight.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool { self.0.contains_key(id) }

    /// Number of sessions currently in flight.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether no sessions are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Remove the session for `id`, discarding its fragments.
    ///
    /// Returns `true` when a session was removed.
    pub fn remove(&self, id: &str) -> bool { self.0.remove(id).is_some() }

    /// Identifiers of all sessions currently in flight, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<CorrelationId> { self.0.iter().map(|entry| entry.key().clone()).collect() }

    /// Lock the entry for `id` for a check-then-act sequence.
    pub(crate) fn entry(&self, id: CorrelationId) -> Entry<'_, CorrelationId, Session> {
        self.0.entry(id)
    }

    /// Evict every session idle for strictly longer than `timeout`.
    ///
    /// `DashMap::retain` holds per-shard write locks while it runs, so
    /// admissions contend briefly but never observe a half-removed session.
    pub(crate) fn evict_idle(&self, now: Instant, timeout: Duration) -> Vec<CorrelationId> {
        let mut evicted = Vec::new();
        self.0.retain(|id, session| {
            let expired = session.idle_for(now) > timeout;
            if expired {
                evicted.push(id.clone());
            }
            !expired
        });
        evicted
    }
}
