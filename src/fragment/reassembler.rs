//! Inbound engine that stitches fragments back into complete messages.
//!
//! [`Reassembler`] mirrors the outbound [`Fragmenter`](crate::fragment::Fragmenter)
//! by collecting fragment payloads keyed by
//! [`CorrelationId`](crate::fragment::CorrelationId). It rejects fragments
//! that disagree with an established session, suppresses duplicates, merges
//! a session as soon as its last missing fragment arrives and purges stale
//! partial sessions on request. Every operation takes `&self`, so one engine
//! can be shared between a receive loop and a periodic sweeper.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use log::{debug, warn};

use super::{
    AdmissionStatus,
    CorrelationId,
    EnvelopeCodec,
    FragmentEnvelope,
    FragmentHeader,
    FragmentStore,
    InvalidFragment,
    JsonEnvelopeCodec,
    ReassemblyConfig,
    ReassemblyError,
    SessionSnapshot,
    store::Session,
};
use crate::{
    message::MessageDecoder,
    metrics::{self, Direction},
};

/// Callback receiving every successfully reassembled message.
pub type MessageHandler<M> = Arc<dyn Fn(M) + Send + Sync>;

/// Stateful fragment re-assembler with timeout-based eviction.
pub struct Reassembler<D: MessageDecoder, C = JsonEnvelopeCodec> {
    config: ReassemblyConfig,
    store: FragmentStore,
    decoder: D,
    codec: C,
    handler: Option<MessageHandler<D::Message>>,
}

impl<D: MessageDecoder> Reassembler<D> {
    /// Start building a re-assembler that decodes merged payloads with
    /// `decoder` and parses envelopes as JSON.
    #[must_use]
    pub fn builder(decoder: D) -> ReassemblerBuilder<D> {
        ReassemblerBuilder {
            config: ReassemblyConfig::default(),
            decoder,
            codec: JsonEnvelopeCodec,
            handler: None,
        }
    }

    /// Create a re-assembler with default configuration and `handler`
    /// receiving every reassembled message.
    #[must_use]
    pub fn new<F>(decoder: D, handler: F) -> Self
    where
        F: Fn(D::Message) + Send + Sync + 'static,
    {
        Self::builder(decoder).handler(handler).build()
    }
}

impl<D: MessageDecoder, C: EnvelopeCodec> Reassembler<D, C> {
    /// Return the active configuration.
    #[must_use]
    pub fn config(&self) -> &ReassemblyConfig { &self.config }

    /// Borrow the session store for inspection.
    #[must_use]
    pub fn store(&self) -> &FragmentStore { &self.store }

    /// Borrow the envelope codec.
    #[must_use]
    pub fn codec(&self) -> &C { &self.codec }

    /// Whether a message handler has been configured.
    #[must_use]
    pub fn has_handler(&self) -> bool { self.handler.is_some() }

    /// Number of partial sessions currently buffered.
    #[must_use]
    pub fn session_count(&self) -> usize { self.store.len() }

    /// Snapshot the session for `id`, if one is in flight.
    #[must_use]
    pub fn session(&self, id: &str) -> Option<SessionSnapshot> { self.store.lookup(id) }

    /// Report whether a session for `id` is in flight.
    #[must_use]
    pub fn contains_session(&self, id: &str) -> bool { self.store.contains(id) }

    /// Number of distinct fragments buffered for `id`, or zero when no
    /// session is in flight.
    #[must_use]
    pub fn received_count(&self, id: &str) -> usize {
        self.store.lookup(id).map_or(0, |session| session.received)
    }

    /// Decode a raw envelope and admit the fragment it carries.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Envelope`] when the envelope does not parse,
    /// leaving the store untouched, or any error of [`Reassembler::admit`].
    pub fn ingest(&self, raw: &[u8]) -> Result<AdmissionStatus, ReassemblyError> {
        self.ingest_at(raw, Instant::now())
    }

    /// Decode a raw envelope and admit its fragment using an explicit clock
    /// reading.
    ///
    /// # Errors
    ///
    /// See [`Reassembler::ingest`].
    pub fn ingest_at(&self, raw: &[u8], now: Instant) -> Result<AdmissionStatus, ReassemblyError> {
        let result = self
            .codec
            .decode(raw)
            .map_err(ReassemblyError::from)
            .and_then(FragmentEnvelope::into_parts)
            .and_then(|(header, payload)| self.admit_inner(header, payload, now));
        observe(result)
    }

    /// Admit a fragment using the current time.
    ///
    /// Returns [`AdmissionStatus::Accepted`] while more fragments are
    /// required, [`AdmissionStatus::Duplicate`] when `seq` was already
    /// received, and [`AdmissionStatus::Completed`] once the fragment
    /// completed the message and the handler has run.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::InvalidFragment`] for out-of-range header
    /// values, [`ReassemblyError::InconsistentTotal`] when `total` disagrees
    /// with the established session, [`ReassemblyError::MessageTooLarge`]
    /// when the session outgrows the byte cap, and
    /// [`ReassemblyError::MalformedMergedPayload`] or
    /// [`ReassemblyError::NoHandlerRegistered`] when a completed message
    /// cannot be delivered.
    pub fn admit(
        &self,
        id: impl Into<CorrelationId>,
        seq: i64,
        total: i64,
        payload: impl Into<Bytes>,
    ) -> Result<AdmissionStatus, ReassemblyError> {
        self.admit_at(id, seq, total, payload, Instant::now())
    }

    /// Admit a fragment using an explicit clock reading.
    ///
    /// Accepting an explicit `now` simplifies deterministic testing and allows
    /// callers to co-ordinate eviction sweeps with their own timers.
    ///
    /// # Errors
    ///
    /// See [`Reassembler::admit`].
    pub fn admit_at(
        &self,
        id: impl Into<CorrelationId>,
        seq: i64,
        total: i64,
        payload: impl Into<Bytes>,
        now: Instant,
    ) -> Result<AdmissionStatus, ReassemblyError> {
        let result = FragmentHeader::try_new(id, seq, total)
            .and_then(|header| self.admit_inner(header, payload.into(), now));
        observe(result)
    }

    /// Admit a fragment whose header was already validated.
    ///
    /// # Errors
    ///
    /// See [`Reassembler::admit`].
    pub fn admit_fragment_at(
        &self,
        header: FragmentHeader,
        payload: impl Into<Bytes>,
        now: Instant,
    ) -> Result<AdmissionStatus, ReassemblyError> {
        observe(self.admit_inner(header, payload.into(), now))
    }

    /// Discard the session for `id` and all its fragments.
    ///
    /// Returns `true` when a session was removed.
    pub fn delete_session(&self, id: &str) -> bool {
        let removed = self.store.remove(id);
        if removed {
            debug!("session deleted: id={id}");
        }
        removed
    }

    /// Evict sessions idle for longer than `timeout`, measured now.
    ///
    /// Returns the identifiers of the evicted sessions.
    pub fn check_timeouts(&self, timeout: Duration) -> Vec<CorrelationId> {
        self.sweep_at(Instant::now(), timeout)
    }

    /// Evict sessions idle for longer than the configured timeout.
    ///
    /// Returns the identifiers of the evicted sessions.
    pub fn purge_expired(&self) -> Vec<CorrelationId> { self.check_timeouts(self.config.timeout) }

    /// Evict every session whose last accepted fragment is strictly older
    /// than `timeout` at `now`. No merge is attempted for evicted sessions.
    ///
    /// Returns the identifiers of the evicted sessions.
    pub fn sweep_at(&self, now: Instant, timeout: Duration) -> Vec<CorrelationId> {
        let evicted = self.store.evict_idle(now, timeout);
        for id in &evicted {
            debug!("session expired: id={id}, timeout={timeout:?}");
        }
        if !evicted.is_empty() {
            metrics::inc_expired(evicted.len() as u64);
        }
        evicted
    }

    fn admit_inner(
        &self,
        header: FragmentHeader,
        payload: Bytes,
        now: Instant,
    ) -> Result<AdmissionStatus, ReassemblyError> {
        let total = header.total_fragments();
        let sequence = header.sequence();
        let limit = self.config.max_fragments;
        if total > limit {
            return Err(ReassemblyError::InvalidFragment {
                id: header.into_id(),
                reason: InvalidFragment::TooManyFragments {
                    total: i64::from(total.get()),
                    limit,
                },
            });
        }

        // The entry holds the shard lock for this identifier until the match
        // ends; the handler runs after it is released.
        let completed = match self.store.entry(header.into_id()) {
            Entry::Vacant(vacant) => {
                let mut session = Session::new(total, now);
                self.check_size(vacant.key(), &session, payload.len())?;
                session.insert(sequence, payload, now);
                if session.is_complete() {
                    Some((vacant.into_key(), session))
                } else {
                    debug!(
                        "session opened: id={}, seq={sequence}, total={total}",
                        vacant.key()
                    );
                    vacant.insert(session);
                    None
                }
            }
            Entry::Occupied(mut occupied) => {
                let expected = occupied.get().total_fragments();
                if expected != total {
                    return Err(ReassemblyError::InconsistentTotal {
                        id: occupied.key().clone(),
                        expected,
                        found: total,
                    });
                }
                if occupied.get().contains(sequence) {
                    debug!(
                        "duplicate fragment ignored: id={}, seq={sequence}",
                        occupied.key()
                    );
                    return Ok(AdmissionStatus::Duplicate);
                }
                if let Err(err) = self.check_size(occupied.key(), occupied.get(), payload.len()) {
                    occupied.remove();
                    return Err(err);
                }
                occupied.get_mut().insert(sequence, payload, now);
                if occupied.get().is_complete() {
                    let id = occupied.key().clone();
                    Some((id, occupied.remove()))
                } else {
                    None
                }
            }
        };

        metrics::inc_fragments(Direction::Inbound, 1);
        match completed {
            Some((id, session)) => {
                self.merge(id, session)?;
                Ok(AdmissionStatus::Completed)
            }
            None => Ok(AdmissionStatus::Accepted),
        }
    }

    fn check_size(
        &self,
        id: &CorrelationId,
        session: &Session,
        incoming: usize,
    ) -> Result<(), ReassemblyError> {
        let limit = self.config.max_message_size;
        let attempted = session.buffered_bytes().saturating_add(incoming);
        if attempted > limit.get() {
            return Err(ReassemblyError::MessageTooLarge {
                id: id.clone(),
                attempted,
                limit,
            });
        }
        Ok(())
    }

    /// Deliver a complete session that has already left the store.
    fn merge(&self, id: CorrelationId, session: Session) -> Result<(), ReassemblyError> {
        let fragments = session.received();
        let payload = session.into_payload();
        let message = self.decoder.decode(&payload).map_err(|source| {
            ReassemblyError::MalformedMergedPayload {
                id: id.clone(),
                source: Box::new(source),
            }
        })?;
        let Some(handler) = self.handler.as_ref() else {
            return Err(ReassemblyError::NoHandlerRegistered { id });
        };
        debug!(
            "message reassembled: id={id}, fragments={fragments}, bytes={}",
            payload.len()
        );
        handler(message);
        metrics::inc_reassembled();
        Ok(())
    }
}

fn observe(
    result: Result<AdmissionStatus, ReassemblyError>,
) -> Result<AdmissionStatus, ReassemblyError> {
    if let Err(err) = &result {
        metrics::inc_errors(err.kind());
        match err.correlation_id() {
            Some(id) => warn!("reassembly error: id={id}, error={err}"),
            None => warn!("reassembly error: error={err}"),
        }
    }
    result
}

impl<D: MessageDecoder, C> fmt::Debug for Reassembler<D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reassembler")
            .field("config", &self.config)
            .field("sessions", &self.store.len())
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Reassembler`].
pub struct ReassemblerBuilder<D: MessageDecoder, C = JsonEnvelopeCodec> {
    config: ReassemblyConfig,
    decoder: D,
    codec: C,
    handler: Option<MessageHandler<D::Message>>,
}

impl<D: MessageDecoder, C> ReassemblerBuilder<D, C> {
    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ReassemblyConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the idle timeout used by [`Reassembler::purge_expired`].
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Parse envelopes with `codec` instead of JSON.
    #[must_use]
    pub fn codec<C2>(self, codec: C2) -> ReassemblerBuilder<D, C2> {
        ReassemblerBuilder {
            config: self.config,
            decoder: self.decoder,
            codec,
            handler: self.handler,
        }
    }

    /// Register the callback receiving every reassembled message.
    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(D::Message) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Register a shared callback receiving every reassembled message.
    #[must_use]
    pub fn shared_handler(mut self, handler: MessageHandler<D::Message>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Finish building the re-assembler.
    #[must_use]
    pub fn build(self) -> Reassembler<D, C> {
        Reassembler {
            config: self.config,
            store: FragmentStore::new(),
            decoder: self.decoder,
            codec: self.codec,
            handler: self.handler,
        }
    }
}
