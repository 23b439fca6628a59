//! Tests for identifiers, sequence numbers and header validation.

use std::num::NonZeroU32;

use rstest::rstest;

use crate::fragment::{
    CorrelationId,
    FragmentHeader,
    InvalidFragment,
    ReassemblyError,
    SequenceNumber,
};

#[test]
fn correlation_id_borrows_as_str() {
    let id = CorrelationId::new(String::from("uid-7"));
    let borrowed: &str = std::borrow::Borrow::borrow(&id);
    assert_eq!(borrowed, "uid-7");
    assert_eq!(CorrelationId::from("uid-7"), id);
    assert_eq!(String::from(id), "uid-7");
}

#[test]
fn sequence_number_starts_at_one() {
    assert_eq!(SequenceNumber::FIRST.get(), 1);
    assert_eq!(
        SequenceNumber::FIRST.checked_increment(),
        SequenceNumber::new(2)
    );
    assert!(
        SequenceNumber::new(u32::MAX)
            .and_then(SequenceNumber::checked_increment)
            .is_none()
    );
}

#[test]
fn header_reports_last_fragment_by_position() {
    let last = FragmentHeader::try_new("x1", 3, 3).expect("valid header");
    let middle = FragmentHeader::try_new("x1", 2, 3).expect("valid header");
    assert!(last.is_last_fragment());
    assert!(!middle.is_last_fragment());
}

#[test]
fn header_new_rejects_sequence_past_total() {
    let seq = SequenceNumber::new(4).expect("non-zero");
    let total = NonZeroU32::new(3).expect("non-zero");
    assert!(FragmentHeader::new("x1", seq, total).is_none());
}

#[rstest]
#[case::zero_total(1, 0, InvalidFragment::NonPositiveTotal { total: 0 })]
#[case::negative_total(1, -2, InvalidFragment::NonPositiveTotal { total: -2 })]
#[case::zero_seq(0, 3, InvalidFragment::SequenceBelowOne { seq: 0 })]
#[case::negative_seq(-1, 3, InvalidFragment::SequenceBelowOne { seq: -1 })]
#[case::seq_past_total(4, 3, InvalidFragment::SequenceBeyondTotal { seq: 4, total: 3 })]
#[case::total_overflows_u32(
    1,
    i64::from(u32::MAX) + 1,
    InvalidFragment::TooManyFragments { total: i64::from(u32::MAX) + 1, limit: NonZeroU32::MAX }
)]
fn header_validation_rejects_out_of_range_values(
    #[case] seq: i64,
    #[case] total: i64,
    #[case] expected: InvalidFragment,
) {
    let err = FragmentHeader::try_new("bad", seq, total).expect_err("header must be rejected");
    match err {
        ReassemblyError::InvalidFragment { id, reason } => {
            assert_eq!(id.as_str(), "bad");
            assert_eq!(reason, expected);
        }
        other => panic!("expected InvalidFragment, got {other:?}"),
    }
}
