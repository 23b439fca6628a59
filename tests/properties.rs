//! Property tests for fragmentation and reassembly invariants.

use std::{
    collections::BTreeSet,
    time::{Duration, Instant},
};

use bytes::Bytes;
use proptest::prelude::*;
use segments::{
    AdmissionStatus,
    BincodeEnvelopeCodec,
    BytesDecoder,
    CorrelationId,
    FragmentationError,
    Fragmenter,
    JsonEnvelopeCodec,
    Reassembler,
    ReassemblyError,
};
use segments_testing::{Collector, deliver_in_order};

fn bincode_engine(collector: &Collector<Bytes>) -> Reassembler<BytesDecoder, BincodeEnvelopeCodec> {
    Reassembler::builder(BytesDecoder)
        .codec(BincodeEnvelopeCodec)
        .shared_handler(collector.handler())
        .build()
}

/// Order `count` positions by the generated sort keys.
fn shuffled(count: usize, keys: &[u32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by_key(|&index| (keys[index % keys.len()], index));
    order
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn ascii_split_uses_ceiling_of_length_over_budget(
        text in "[a-zA-Z0-9 ]{0,400}",
        max in 40usize..160,
    ) {
        let fragmenter = Fragmenter::new(JsonEnvelopeCodec);
        let id = CorrelationId::from("prop");
        let batch = match fragmenter.split(text.clone(), id.clone(), max) {
            Ok(batch) => batch,
            Err(FragmentationError::BudgetTooSmall { .. }) => return Ok(()),
            Err(err) => return Err(TestCaseError::fail(err.to_string())),
        };
        let count = u32::try_from(batch.len()).expect("count fits u32");
        let budget = max - fragmenter.overhead(&id, count).expect("probe encodes");

        prop_assert_eq!(batch.len(), text.len().div_ceil(budget).max(1));
        let mut joined = Vec::new();
        for (index, frame) in batch.fragments().iter().enumerate() {
            prop_assert!(frame.encoded().len() <= max);
            prop_assert_eq!(frame.header().sequence().get() as usize, index + 1);
            if index + 1 < batch.len() {
                prop_assert_eq!(frame.payload().len(), budget);
            }
            joined.extend_from_slice(frame.payload());
        }
        prop_assert_eq!(joined, text.into_bytes());
    }

    #[test]
    fn shuffled_delivery_with_duplicates_reassembles_once(
        payload in proptest::collection::vec(any::<u8>(), 0..600),
        max in 24usize..96,
        keys in proptest::collection::vec(any::<u32>(), 64),
        duplicates in 0usize..8,
    ) {
        let collector = Collector::new();
        let engine = bincode_engine(&collector);
        let batch = Fragmenter::new(BincodeEnvelopeCodec)
            .split(payload.clone(), "bin", max)
            .expect("budget always exceeds bincode overhead");

        let order = shuffled(batch.len(), &keys);
        let (last, head) = order.split_last().expect("at least one fragment");
        let replayed: Vec<usize> = head.iter().copied().take(duplicates).collect();
        let sequence = head.iter().chain(&replayed).chain([last]).copied();
        let statuses = deliver_in_order(&engine, &batch, sequence).expect("deliver");

        let duplicate_count = statuses
            .iter()
            .filter(|status| **status == AdmissionStatus::Duplicate)
            .count();
        prop_assert_eq!(duplicate_count, replayed.len());
        prop_assert_eq!(statuses.last(), Some(&AdmissionStatus::Completed));
        prop_assert_eq!(collector.take(), vec![Bytes::from(payload)]);
        prop_assert_eq!(engine.session_count(), 0);
    }

    #[test]
    fn conflicting_total_never_mutates_a_session(
        total in 2i64..50,
        other in 1i64..50,
        seq in 1i64..50,
    ) {
        prop_assume!(other != total && seq <= other);
        let collector = Collector::<Bytes>::new();
        let engine = Reassembler::builder(BytesDecoder)
            .shared_handler(collector.handler())
            .build();
        engine.admit("c", 1, total, "first").expect("open session");
        let before = engine.session("c");

        let err = engine.admit("c", seq, other, "second").expect_err("conflict");

        let is_inconsistent = matches!(err, ReassemblyError::InconsistentTotal { .. });
        prop_assert!(is_inconsistent);
        prop_assert_eq!(engine.session("c"), before);
        prop_assert!(collector.is_empty());
    }

    #[test]
    fn sweep_evicts_exactly_the_sessions_idle_beyond_timeout(
        ages in proptest::collection::vec(0u64..20, 1..24),
        timeout in 0u64..20,
    ) {
        let engine = Reassembler::builder(BytesDecoder).build();
        let start = Instant::now();
        let horizon = Duration::from_secs(20);
        for (index, age) in ages.iter().enumerate() {
            let seen = start + horizon - Duration::from_secs(*age);
            engine
                .admit_at(format!("s{index}"), 1, 2, "x", seen)
                .expect("open session");
        }

        let evicted: BTreeSet<CorrelationId> = engine
            .sweep_at(start + horizon, Duration::from_secs(timeout))
            .into_iter()
            .collect();

        let expected: BTreeSet<CorrelationId> = ages
            .iter()
            .enumerate()
            .filter(|(_, age)| **age > timeout)
            .map(|(index, _)| CorrelationId::from(format!("s{index}")))
            .collect();
        prop_assert_eq!(engine.session_count(), ages.len() - expected.len());
        prop_assert_eq!(evicted, expected);
    }
}
