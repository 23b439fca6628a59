//! Metric helpers for `segments`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking fragments emitted or admitted.
pub const FRAGMENTS_PROCESSED: &str = "segments_fragments_processed_total";
/// Name of the counter tracking messages successfully reassembled.
pub const MESSAGES_REASSEMBLED: &str = "segments_messages_reassembled_total";
/// Name of the counter tracking sessions evicted by the timeout sweeper.
pub const SESSIONS_EXPIRED: &str = "segments_sessions_expired_total";
/// Name of the counter tracking rejected fragments and failed merges.
pub const ERRORS_TOTAL: &str = "segments_errors_total";

/// Direction of fragment processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Fragments admitted into the reassembly store.
    Inbound,
    /// Fragments produced by the fragmenter.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "labels only feed metrics"))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record `count` fragments processed in the given direction.
pub fn inc_fragments(direction: Direction, count: u64) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_PROCESSED, "direction" => direction.as_str()).increment(count);
    #[cfg(not(feature = "metrics"))]
    let _ = (direction, count);
}

/// Record a message handed to the message handler.
pub fn inc_reassembled() {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_REASSEMBLED).increment(1);
}

/// Record sessions evicted by a timeout sweep.
pub fn inc_expired(count: u64) {
    #[cfg(feature = "metrics")]
    counter!(SESSIONS_EXPIRED).increment(count);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record an error occurrence, labelled by kind.
pub fn inc_errors(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}
