#![doc(html_root_url = "https://docs.rs/segments/latest")]
//! Public API for the `segments` library.
//!
//! This crate splits payloads that exceed a transport's per-message size
//! limit into self-describing fragments and stitches them back together on
//! the receiving side, tolerating reordering, duplication and loss.

pub mod fragment;
pub mod message;
pub mod metrics;
pub mod sweeper;

pub use fragment::{
    AdmissionStatus,
    BincodeEnvelopeCodec,
    CorrelationId,
    EnvelopeCodec,
    EnvelopeError,
    FragmentBatch,
    FragmentEnvelope,
    FragmentFrame,
    FragmentHeader,
    FragmentStore,
    FragmentationError,
    Fragmenter,
    InvalidFragment,
    JsonEnvelopeCodec,
    MessageHandler,
    Reassembler,
    ReassemblerBuilder,
    ReassemblyConfig,
    ReassemblyError,
    SequenceNumber,
    SessionSnapshot,
};
pub use message::{BincodeDecoder, BytesDecoder, JsonDecoder, Message, MessageDecoder};
pub use metrics::{
    Direction,
    ERRORS_TOTAL,
    FRAGMENTS_PROCESSED,
    MESSAGES_REASSEMBLED,
    SESSIONS_EXPIRED,
};
pub use sweeper::spawn_sweeper;
