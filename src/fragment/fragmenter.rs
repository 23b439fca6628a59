//! Outbound helper that splits payloads into size-bounded, encoded fragments.
//!
//! [`Fragmenter`] partitions a payload so that every encoded envelope fits a
//! caller-supplied byte budget. Framing overhead is measured by encoding an
//! envelope with an empty payload. Because the numeric header fields may grow
//! with the fragment count, the overhead is measured with `seq` and `total`
//! set to the candidate fragment count and the candidate is raised until the
//! partition no longer needs more fragments than assumed.

use std::{num::NonZeroU32, ops::Range};

use bytes::Bytes;
use log::debug;

use super::{
    CorrelationId,
    EnvelopeCodec,
    EnvelopeError,
    FragmentEnvelope,
    FragmentHeader,
    FragmentationError,
    JsonEnvelopeCodec,
    SequenceNumber,
};
use crate::metrics::{self, Direction};

/// Splits payloads into fragments that fit a per-fragment byte budget.
#[derive(Clone, Debug, Default)]
pub struct Fragmenter<C = JsonEnvelopeCodec> {
    codec: C,
}

impl<C: EnvelopeCodec> Fragmenter<C> {
    /// Create a fragmenter that encodes envelopes with `codec`.
    #[must_use]
    pub const fn new(codec: C) -> Self { Self { codec } }

    /// Borrow the envelope codec.
    #[must_use]
    pub const fn codec(&self) -> &C { &self.codec }

    /// Encoded size of an envelope for `id` with an empty payload, assuming
    /// `total` fragments.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if the codec cannot encode the probe envelope.
    pub fn overhead(&self, id: &CorrelationId, total: u32) -> Result<usize, EnvelopeError> {
        let probe = FragmentEnvelope {
            id: id.as_str().to_owned(),
            seq: i64::from(total),
            total: i64::from(total),
            payload: Bytes::new(),
        };
        Ok(self.codec.encode(&probe)?.len())
    }

    /// Split `payload` into fragments tagged with `id`, each encoding to at
    /// most `max_fragment_bytes` bytes.
    ///
    /// An empty payload still yields exactly one fragment with an empty slice.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::BudgetTooSmall`] when the budget cannot
    /// carry the envelope overhead plus at least one unit of payload,
    /// [`FragmentationError::TooManyFragments`] when the fragment count does
    /// not fit a sequence number, and [`FragmentationError::Envelope`] when the
    /// codec rejects the payload.
    pub fn split(
        &self,
        payload: impl Into<Bytes>,
        id: impl Into<CorrelationId>,
        max_fragment_bytes: usize,
    ) -> Result<FragmentBatch, FragmentationError> {
        let payload = payload.into();
        let id = id.into();

        // A larger assumed total never shrinks the overhead, so this settles
        // on a fixed point within a handful of rounds.
        let mut assumed_total = 1_u32;
        loop {
            let overhead = self.overhead(&id, assumed_total)?;
            let budget = max_fragment_bytes
                .checked_sub(overhead)
                .filter(|budget| *budget > 0)
                .ok_or(FragmentationError::BudgetTooSmall {
                    max_fragment_bytes,
                    overhead,
                })?;
            let ranges = self.cut_points(&payload, budget, max_fragment_bytes, overhead)?;
            let count = ranges.len();
            let total = u32::try_from(count)
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or(FragmentationError::TooManyFragments { count })?;
            if total.get() <= assumed_total {
                return self.emit(id, &payload, ranges, total, max_fragment_bytes);
            }
            assumed_total = total.get();
        }
    }

    fn cut_points(
        &self,
        payload: &[u8],
        budget: usize,
        max_fragment_bytes: usize,
        overhead: usize,
    ) -> Result<Vec<Range<usize>>, FragmentationError> {
        if payload.is_empty() {
            return Ok(vec![0..0]);
        }

        let mut ranges = Vec::with_capacity(payload.len().div_ceil(budget));
        let mut start = 0usize;
        while start < payload.len() {
            let end = self.codec.next_cut(payload, start, budget)?.min(payload.len());
            if end <= start {
                // The next character alone needs more room than the budget.
                return Err(FragmentationError::BudgetTooSmall {
                    max_fragment_bytes,
                    overhead,
                });
            }
            ranges.push(start..end);
            start = end;
        }
        Ok(ranges)
    }

    fn emit(
        &self,
        id: CorrelationId,
        payload: &Bytes,
        ranges: Vec<Range<usize>>,
        total: NonZeroU32,
        max_fragment_bytes: usize,
    ) -> Result<FragmentBatch, FragmentationError> {
        let count = ranges.len();
        let sequences = (1..=total.get()).filter_map(SequenceNumber::new);
        let mut fragments = Vec::with_capacity(count);
        for (sequence, range) in sequences.zip(ranges) {
            let header = FragmentHeader::new(id.clone(), sequence, total)
                .ok_or(FragmentationError::TooManyFragments { count })?;
            let slice = payload.slice(range);
            let encoded = self
                .codec
                .encode(&FragmentEnvelope::from_header(&header, slice.clone()))?;
            debug_assert!(
                encoded.len() <= max_fragment_bytes,
                "fragment of {} bytes exceeds budget of {max_fragment_bytes}",
                encoded.len()
            );
            fragments.push(FragmentFrame::new(header, slice, Bytes::from(encoded)));
        }

        debug!(
            "split payload: id={id}, bytes={}, fragments={total}, budget={max_fragment_bytes}",
            payload.len()
        );
        metrics::inc_fragments(Direction::Outbound, count as u64);
        Ok(FragmentBatch::new(id, fragments))
    }
}

/// Header, payload slice and wire encoding of a single outbound fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentFrame {
    header: FragmentHeader,
    payload: Bytes,
    encoded: Bytes,
}

impl FragmentFrame {
    fn new(header: FragmentHeader, payload: Bytes, encoded: Bytes) -> Self {
        Self {
            header,
            payload,
            encoded,
        }
    }

    /// Return the fragment header.
    #[must_use]
    pub fn header(&self) -> &FragmentHeader { &self.header }

    /// Return the payload slice carried by this fragment.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Return the encoded envelope ready for the transport.
    #[must_use]
    pub fn encoded(&self) -> &[u8] { &self.encoded }

    /// Consume the frame, returning the encoded envelope.
    #[must_use]
    pub fn into_encoded(self) -> Bytes { self.encoded }

    /// Consume the frame, returning header and payload slice.
    #[must_use]
    pub fn into_parts(self) -> (FragmentHeader, Bytes) { (self.header, self.payload) }
}

/// Ordered fragments produced for a single logical message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    id: CorrelationId,
    fragments: Vec<FragmentFrame>,
}

impl FragmentBatch {
    fn new(id: CorrelationId, fragments: Vec<FragmentFrame>) -> Self {
        debug_assert!(!fragments.is_empty(), "fragment batches must not be empty");
        Self { id, fragments }
    }

    /// Return the [`CorrelationId`] shared by all fragments.
    #[must_use]
    pub fn id(&self) -> &CorrelationId { &self.id }

    /// Return the fragments in sequence order.
    #[must_use]
    pub fn fragments(&self) -> &[FragmentFrame] { self.fragments.as_slice() }

    /// Number of fragments in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.fragments.len() }

    /// Whether the message required more than one fragment.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.len() > 1 }

    /// Iterate over the encoded envelopes in sequence order.
    pub fn encoded(&self) -> impl DoubleEndedIterator<Item = &[u8]> + ExactSizeIterator {
        self.fragments.iter().map(FragmentFrame::encoded)
    }

    /// Consume the batch, returning all fragments.
    #[must_use]
    pub fn into_fragments(self) -> Vec<FragmentFrame> { self.fragments }
}

impl IntoIterator for FragmentBatch {
    type Item = FragmentFrame;
    type IntoIter = std::vec::IntoIter<FragmentFrame>;

    fn into_iter(self) -> Self::IntoIter { self.fragments.into_iter() }
}
