//! Wire envelopes that carry a fragment and its metadata.
//!
//! An envelope holds the correlation identifier, the one-based sequence
//! number, the total fragment count and the payload slice. The reassembly
//! engine only needs to encode and decode envelopes, so the concrete format is
//! pluggable through [`EnvelopeCodec`]. Two codecs ship with the crate:
//!
//! - [`JsonEnvelopeCodec`] writes compact JSON objects with the fixed keys
//!   `uid`, `seq`, `abs` and `seg`. Payloads must be UTF-8 text.
//! - [`BincodeEnvelopeCodec`] writes a compact `bincode` record and accepts
//!   arbitrary bytes.

mod binary;
mod json;

use bincode::error::{DecodeError, EncodeError};
use bytes::Bytes;
use thiserror::Error;

pub use self::{binary::BincodeEnvelopeCodec, json::JsonEnvelopeCodec};
use super::{CorrelationId, FragmentHeader, ReassemblyError};

/// Errors raised while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The JSON envelope is malformed, misses a field, or has a field of the
    /// wrong type.
    #[error("malformed JSON envelope: {0}")]
    Json(#[from] serde_json::Error),
    /// Encoding a binary envelope failed.
    #[error("failed to encode binary envelope: {0}")]
    Encode(#[from] EncodeError),
    /// Decoding a binary envelope failed.
    #[error("failed to decode binary envelope: {0}")]
    Decode(#[from] DecodeError),
    /// The binary envelope was followed by unexpected bytes.
    #[error("{trailing} trailing bytes after binary envelope")]
    TrailingBytes { trailing: usize },
    /// A text envelope was asked to carry bytes that are not UTF-8.
    #[error("payload is not valid UTF-8 and cannot travel in a text envelope")]
    NonUtf8Payload,
}

/// Decoded fragment envelope holding raw, unvalidated header values.
///
/// Numeric fields are kept as signed integers because the wire may carry any
/// number; [`FragmentEnvelope::into_parts`] performs validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentEnvelope {
    /// Correlation identifier.
    pub id: String,
    /// One-based sequence number.
    pub seq: i64,
    /// Total fragment count.
    pub total: i64,
    /// Payload slice carried by this fragment.
    pub payload: Bytes,
}

impl FragmentEnvelope {
    /// Build an envelope for a validated header and payload slice.
    #[must_use]
    pub fn from_header(header: &FragmentHeader, payload: Bytes) -> Self {
        Self {
            id: header.id().as_str().to_owned(),
            seq: i64::from(header.sequence().get()),
            total: i64::from(header.total_fragments().get()),
            payload,
        }
    }

    /// Validate the raw fields and split the envelope into header and payload.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::InvalidFragment`] when the header values are
    /// out of range.
    pub fn into_parts(self) -> Result<(FragmentHeader, Bytes), ReassemblyError> {
        let header = FragmentHeader::try_new(CorrelationId::new(self.id), self.seq, self.total)?;
        Ok((header, self.payload))
    }
}

/// Encoding contract for fragment envelopes.
///
/// Implementations must be deterministic: encoding the same envelope twice
/// yields the same bytes. The fragmenter relies on this to compute framing
/// overhead from an envelope with an empty payload.
pub trait EnvelopeCodec {
    /// Encode an envelope into its wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when the envelope cannot be represented.
    fn encode(&self, envelope: &FragmentEnvelope) -> Result<Vec<u8>, EnvelopeError>;

    /// Decode a wire representation into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when a field is missing, has the wrong type,
    /// or the input is otherwise malformed.
    fn decode(&self, raw: &[u8]) -> Result<FragmentEnvelope, EnvelopeError>;

    /// Return the end offset of the longest slice starting at `start` whose
    /// encoded growth over an empty payload stays within `budget` bytes.
    ///
    /// The default assumes payload bytes are copied verbatim. Returning
    /// `start` signals that not even one unit of payload fits.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when the payload cannot be represented by
    /// this codec.
    fn next_cut(&self, payload: &[u8], start: usize, budget: usize) -> Result<usize, EnvelopeError> {
        Ok(payload.len().min(start.saturating_add(budget)))
    }
}

impl<C: EnvelopeCodec + ?Sized> EnvelopeCodec for &C {
    fn encode(&self, envelope: &FragmentEnvelope) -> Result<Vec<u8>, EnvelopeError> {
        (**self).encode(envelope)
    }

    fn decode(&self, raw: &[u8]) -> Result<FragmentEnvelope, EnvelopeError> { (**self).decode(raw) }

    fn next_cut(&self, payload: &[u8], start: usize, budget: usize) -> Result<usize, EnvelopeError> {
        (**self).next_cut(payload, start, budget)
    }
}
