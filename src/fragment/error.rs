//! Error and status types emitted by the fragmentation layer.
//!
//! Admission outcomes that leave the engine in a healthy state are reported
//! through [`AdmissionStatus`]; everything else surfaces as a
//! [`ReassemblyError`] or [`FragmentationError`] with enough context for
//! callers to log and move on.

use std::{
    error::Error as StdError,
    num::{NonZeroU32, NonZeroUsize},
};

use thiserror::Error;

use super::{CorrelationId, EnvelopeError};

/// Result of admitting a fragment into the reassembly store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionStatus {
    /// The fragment was stored and the message still expects more fragments.
    Accepted,
    /// The sequence number was already present; the session is unchanged.
    Duplicate,
    /// The fragment completed the message, which was merged, decoded and
    /// handed to the message handler.
    Completed,
}

/// Reasons a fragment header fails validation.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InvalidFragment {
    /// The declared fragment count is zero or negative.
    #[error("total fragment count {total} is not positive")]
    NonPositiveTotal { total: i64 },
    /// The sequence number is zero or negative.
    #[error("sequence number {seq} is below one")]
    SequenceBelowOne { seq: i64 },
    /// The sequence number points past the declared fragment count.
    #[error("sequence number {seq} exceeds total fragment count {total}")]
    SequenceBeyondTotal { seq: i64, total: i64 },
    /// The declared fragment count exceeds the configured or addressable limit.
    #[error("total fragment count {total} exceeds the limit of {limit}")]
    TooManyFragments { total: i64, limit: NonZeroU32 },
}

/// Errors produced while admitting fragments or merging completed messages.
#[derive(Debug, Error)]
pub enum ReassemblyError {
    /// The fragment header is malformed; the store was not touched.
    #[error("invalid fragment for message {id}: {reason}")]
    InvalidFragment {
        id: CorrelationId,
        reason: InvalidFragment,
    },
    /// The fragment disagrees with the fragment count of an established
    /// session. The session is left untouched.
    #[error("inconsistent total for message {id}: expected {expected}, found {found}")]
    InconsistentTotal {
        id: CorrelationId,
        expected: NonZeroU32,
        found: NonZeroU32,
    },
    /// Buffering the fragment would exceed the per-message byte limit. The
    /// partial session is evicted.
    #[error("message {id} exceeds reassembly limit: attempted {attempted} bytes, limit {limit}")]
    MessageTooLarge {
        id: CorrelationId,
        attempted: usize,
        limit: NonZeroUsize,
    },
    /// The concatenated payload of a complete session failed to decode. The
    /// session has been evicted.
    #[error("merged payload for message {id} failed to decode: {source}")]
    MalformedMergedPayload {
        id: CorrelationId,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// A message completed but no handler was configured. The session has
    /// been evicted.
    #[error("no message handler registered, dropped message {id}")]
    NoHandlerRegistered { id: CorrelationId },
    /// A raw envelope could not be parsed; the store was not touched.
    #[error("malformed fragment envelope: {0}")]
    Envelope(#[from] EnvelopeError),
}

impl ReassemblyError {
    /// Identifier of the message the error refers to, when known.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::InvalidFragment { id, .. }
            | Self::InconsistentTotal { id, .. }
            | Self::MessageTooLarge { id, .. }
            | Self::MalformedMergedPayload { id, .. }
            | Self::NoHandlerRegistered { id } => Some(id),
            Self::Envelope(_) => None,
        }
    }

    /// Short label naming the error variant, used for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFragment { .. } => "invalid_fragment",
            Self::InconsistentTotal { .. } => "inconsistent_total",
            Self::MessageTooLarge { .. } => "message_too_large",
            Self::MalformedMergedPayload { .. } => "malformed_merged_payload",
            Self::NoHandlerRegistered { .. } => "no_handler_registered",
            Self::Envelope(_) => "envelope",
        }
    }
}

/// Errors produced while fragmenting outbound payloads.
#[derive(Debug, Error)]
pub enum FragmentationError {
    /// The fragment budget cannot hold the envelope overhead plus at least
    /// one unit of payload.
    #[error(
        "fragment budget of {max_fragment_bytes} bytes cannot carry {overhead} bytes of envelope \
         overhead plus payload"
    )]
    BudgetTooSmall {
        max_fragment_bytes: usize,
        overhead: usize,
    },
    /// The payload needs more fragments than a sequence number can address.
    #[error("payload requires {count} fragments, more than a sequence number can address")]
    TooManyFragments { count: usize },
    /// Encoding a fragment envelope failed.
    #[error("failed to encode fragment envelope: {0}")]
    Envelope(#[from] EnvelopeError),
}
