//! JSON envelope codec using the fixed `uid`/`seq`/`abs`/`seg` keys.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::{EnvelopeCodec, EnvelopeError, FragmentEnvelope};

#[derive(Serialize)]
struct WireEnvelopeRef<'a> {
    uid: &'a str,
    seq: i64,
    abs: i64,
    seg: &'a str,
}

#[derive(Deserialize)]
struct WireEnvelope {
    uid: String,
    seq: i64,
    abs: i64,
    seg: String,
}

/// Codec writing envelopes as compact JSON objects.
///
/// The payload travels as a JSON string, so fragments must carry UTF-8 text.
/// Cut points chosen by [`EnvelopeCodec::next_cut`] never split a character
/// and account for the bytes JSON string escaping adds, which keeps every
/// encoded fragment inside the caller's budget.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use segments::fragment::{EnvelopeCodec, FragmentEnvelope, JsonEnvelopeCodec};
///
/// let envelope = FragmentEnvelope {
///     id: "x1".into(),
///     seq: 1,
///     total: 3,
///     payload: Bytes::from_static(b"ABCD"),
/// };
/// let raw = JsonEnvelopeCodec.encode(&envelope).expect("encode");
/// assert_eq!(raw, br#"{"uid":"x1","seq":1,"abs":3,"seg":"ABCD"}"#);
/// assert_eq!(JsonEnvelopeCodec.decode(&raw).expect("decode"), envelope);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEnvelopeCodec;

impl EnvelopeCodec for JsonEnvelopeCodec {
    fn encode(&self, envelope: &FragmentEnvelope) -> Result<Vec<u8>, EnvelopeError> {
        let seg = std::str::from_utf8(&envelope.payload).map_err(|_| EnvelopeError::NonUtf8Payload)?;
        let wire = WireEnvelopeRef {
            uid: &envelope.id,
            seq: envelope.seq,
            abs: envelope.total,
            seg,
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    fn decode(&self, raw: &[u8]) -> Result<FragmentEnvelope, EnvelopeError> {
        let wire: WireEnvelope = serde_json::from_slice(raw)?;
        Ok(FragmentEnvelope {
            id: wire.uid,
            seq: wire.seq,
            total: wire.abs,
            payload: Bytes::from(wire.seg),
        })
    }

    fn next_cut(&self, payload: &[u8], start: usize, budget: usize) -> Result<usize, EnvelopeError> {
        let rest = payload.get(start..).unwrap_or_default();
        let mut used = 0usize;
        let mut end = start;
        for chunk in rest.utf8_chunks() {
            for ch in chunk.valid().chars() {
                let width = escaped_len(ch);
                if used + width > budget {
                    return Ok(end);
                }
                used += width;
                end += ch.len_utf8();
            }
            if !chunk.invalid().is_empty() {
                return Err(EnvelopeError::NonUtf8Payload);
            }
        }
        Ok(end)
    }
}

/// Bytes `serde_json` emits for `ch` inside a string literal.
fn escaped_len(ch: char) -> usize {
    match ch {
        '"' | '\\' | '\u{08}' | '\t' | '\n' | '\u{0c}' | '\r' => 2,
        c if u32::from(c) < 0x20 => 6,
        c => c.len_utf8(),
    }
}
