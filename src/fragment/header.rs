//! Validated fragment metadata.

use std::num::NonZeroU32;

use super::{CorrelationId, InvalidFragment, ReassemblyError, SequenceNumber};

/// Header describing a single fragment.
///
/// A header is only ever constructed in a valid state: the fragment count is
/// positive and the sequence number lies in `1..=total`. Raw wire values go
/// through [`FragmentHeader::try_new`].
///
/// # Examples
///
/// ```
/// use segments::fragment::FragmentHeader;
/// let header = FragmentHeader::try_new("x1", 2, 3).expect("valid header");
/// assert_eq!(header.id().as_str(), "x1");
/// assert_eq!(header.sequence().get(), 2);
/// assert_eq!(header.total_fragments().get(), 3);
/// assert!(!header.is_last_fragment());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FragmentHeader {
    id: CorrelationId,
    sequence: SequenceNumber,
    total_fragments: NonZeroU32,
}

impl FragmentHeader {
    /// Create a header from already validated parts.
    ///
    /// Returns `None` when `sequence` exceeds `total_fragments`.
    #[must_use]
    pub fn new(
        id: impl Into<CorrelationId>,
        sequence: SequenceNumber,
        total_fragments: NonZeroU32,
    ) -> Option<Self> {
        (sequence.get() <= total_fragments.get()).then(|| Self {
            id: id.into(),
            sequence,
            total_fragments,
        })
    }

    /// Validate raw wire values and build a header.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::InvalidFragment`] when `total` is not
    /// positive, `seq` is below one, or `seq` exceeds `total`.
    pub fn try_new(
        id: impl Into<CorrelationId>,
        seq: i64,
        total: i64,
    ) -> Result<Self, ReassemblyError> {
        let id = id.into();
        match validate(seq, total) {
            Ok((sequence, total_fragments)) => Ok(Self {
                id,
                sequence,
                total_fragments,
            }),
            Err(reason) => Err(ReassemblyError::InvalidFragment { id, reason }),
        }
    }

    /// Return the correlation identifier.
    #[must_use]
    pub fn id(&self) -> &CorrelationId { &self.id }

    /// Return the one-based position of the fragment.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber { self.sequence }

    /// Return the number of fragments the message was split into.
    #[must_use]
    pub const fn total_fragments(&self) -> NonZeroU32 { self.total_fragments }

    /// Report whether this is the final fragment by position.
    #[must_use]
    pub const fn is_last_fragment(&self) -> bool {
        self.sequence.get() == self.total_fragments.get()
    }

    /// Consume the header, returning the identifier.
    #[must_use]
    pub fn into_id(self) -> CorrelationId { self.id }
}

fn validate(seq: i64, total: i64) -> Result<(SequenceNumber, NonZeroU32), InvalidFragment> {
    if total <= 0 {
        return Err(InvalidFragment::NonPositiveTotal { total });
    }
    if seq < 1 {
        return Err(InvalidFragment::SequenceBelowOne { seq });
    }
    if seq > total {
        return Err(InvalidFragment::SequenceBeyondTotal { seq, total });
    }
    let total_fragments = u32::try_from(total)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(InvalidFragment::TooManyFragments {
            total,
            limit: NonZeroU32::MAX,
        })?;
    // seq <= total, so it fits whenever total does.
    let sequence = u32::try_from(seq)
        .ok()
        .and_then(SequenceNumber::new)
        .ok_or(InvalidFragment::SequenceBelowOne { seq })?;
    Ok((sequence, total_fragments))
}
