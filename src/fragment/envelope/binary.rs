//! Compact binary envelope codec built on `bincode`.

use bincode::{Decode, Encode, config, decode_from_slice, encode_to_vec};
use bytes::Bytes;

use super::{EnvelopeCodec, EnvelopeError, FragmentEnvelope};

/// Upper bound on the size of a decoded binary envelope.
const DECODE_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Encode)]
struct WireEnvelopeRef<'a> {
    id: &'a str,
    seq: i64,
    total: i64,
    payload: &'a [u8],
}

#[derive(Decode)]
struct WireEnvelope {
    id: String,
    seq: i64,
    total: i64,
    payload: Vec<u8>,
}

/// Codec writing envelopes as `bincode` records with the standard
/// (variable-width integer) configuration.
///
/// Payload bytes are copied verbatim, so any binary payload is accepted. The
/// payload length prefix grows with the slice length, which
/// [`EnvelopeCodec::next_cut`] accounts for.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeEnvelopeCodec;

impl EnvelopeCodec for BincodeEnvelopeCodec {
    fn encode(&self, envelope: &FragmentEnvelope) -> Result<Vec<u8>, EnvelopeError> {
        let wire = WireEnvelopeRef {
            id: &envelope.id,
            seq: envelope.seq,
            total: envelope.total,
            payload: &envelope.payload,
        };
        Ok(encode_to_vec(wire, config::standard())?)
    }

    fn decode(&self, raw: &[u8]) -> Result<FragmentEnvelope, EnvelopeError> {
        let (wire, consumed): (WireEnvelope, usize) =
            decode_from_slice(raw, config::standard().with_limit::<DECODE_LIMIT>())?;
        if consumed != raw.len() {
            return Err(EnvelopeError::TrailingBytes {
                trailing: raw.len() - consumed,
            });
        }
        Ok(FragmentEnvelope {
            id: wire.id,
            seq: wire.seq,
            total: wire.total,
            payload: Bytes::from(wire.payload),
        })
    }

    fn next_cut(&self, payload: &[u8], start: usize, budget: usize) -> Result<usize, EnvelopeError> {
        // The empty-payload overhead already includes a one-byte length prefix.
        let remaining = payload.len().saturating_sub(start);
        let mut take = remaining.min(budget);
        while take > 0 && take + varint_len(take) - 1 > budget {
            take -= 1;
        }
        Ok(start + take)
    }
}

/// Width of a `bincode` variable-length integer encoding of `value`.
fn varint_len(value: usize) -> usize {
    match value {
        0..=250 => 1,
        251..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn envelope(payload: Vec<u8>) -> FragmentEnvelope {
        FragmentEnvelope {
            id: "bin".into(),
            seq: 1,
            total: 1,
            payload: Bytes::from(payload),
        }
    }

    #[test]
    fn carries_arbitrary_bytes() {
        let original = envelope(vec![0x00, 0xff, 0x7f, b'\n']);
        let raw = BincodeEnvelopeCodec.encode(&original).expect("encode");
        assert_eq!(BincodeEnvelopeCodec.decode(&raw).expect("decode"), original);
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut raw = BincodeEnvelopeCodec
            .encode(&envelope(vec![1, 2, 3]))
            .expect("encode");
        raw.extend_from_slice(&[9, 9]);
        let err = BincodeEnvelopeCodec
            .decode(&raw)
            .expect_err("trailing bytes must be rejected");
        assert!(matches!(err, EnvelopeError::TrailingBytes { trailing: 2 }));
    }

    #[test]
    fn decode_rejects_truncated_records() {
        let raw = BincodeEnvelopeCodec
            .encode(&envelope(vec![1, 2, 3]))
            .expect("encode");
        let err = BincodeEnvelopeCodec
            .decode(&raw[..raw.len() - 1])
            .expect_err("truncated record must be rejected");
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }

    #[rstest]
    #[case(10)]
    #[case(250)]
    #[case(251)]
    #[case(252)]
    #[case(300)]
    #[case(70_000)]
    fn next_cut_keeps_encoded_growth_within_budget(#[case] budget: usize) {
        let payload = vec![0xaa_u8; budget * 2];
        let empty = BincodeEnvelopeCodec
            .encode(&envelope(Vec::new()))
            .expect("encode empty");
        let cut = BincodeEnvelopeCodec
            .next_cut(&payload, 0, budget)
            .expect("binary payloads always fit");
        assert!(cut > 0);
        let encoded = BincodeEnvelopeCodec
            .encode(&envelope(payload[..cut].to_vec()))
            .expect("encode slice");
        assert!(encoded.len() - empty.len() <= budget);
    }
}
