//! Fragmentation and reassembly of messages that exceed a transport's
//! per-message size limit.
//!
//! This module collects the domain types used on both sides of the link.
//! Each sub-module focuses on a single concept to keep the code small and
//! easy to audit while still providing a cohesive API at the crate root.

pub mod config;
pub mod envelope;
pub mod error;
pub mod fragmenter;
pub mod header;
pub mod id;
pub mod reassembler;
pub mod sequence;
pub mod store;

pub use config::ReassemblyConfig;
pub use envelope::{
    BincodeEnvelopeCodec,
    EnvelopeCodec,
    EnvelopeError,
    FragmentEnvelope,
    JsonEnvelopeCodec,
};
pub use error::{AdmissionStatus, FragmentationError, InvalidFragment, ReassemblyError};
pub use fragmenter::{FragmentBatch, FragmentFrame, Fragmenter};
pub use header::FragmentHeader;
pub use id::CorrelationId;
pub use reassembler::{MessageHandler, Reassembler, ReassemblerBuilder};
pub use sequence::SequenceNumber;
pub use store::{FragmentStore, SessionSnapshot};
