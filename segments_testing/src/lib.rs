//! Test utilities for exercising the `segments` reassembly engine.
//!
//! Provides a serialised handle to the global `logtest` logger, a message
//! collector usable as a reassembly handler, and helpers for delivering a
//! [`FragmentBatch`](segments::FragmentBatch) in arbitrary order.
//!
//! ```rust
//! use segments::{BytesDecoder, Fragmenter, JsonEnvelopeCodec, Reassembler};
//! use segments_testing::{Collector, deliver_in_order};
//!
//! let collector = Collector::new();
//! let engine = Reassembler::builder(BytesDecoder)
//!     .shared_handler(collector.handler())
//!     .build();
//! let batch = Fragmenter::new(JsonEnvelopeCodec)
//!     .split("hello fragments", "doc", 40)
//!     .expect("split payload");
//! deliver_in_order(&engine, &batch, (0..batch.len()).rev()).expect("deliver");
//! assert_eq!(collector.take(), vec![bytes::Bytes::from_static(b"hello fragments")]);
//! ```

mod collect;
mod logging;

pub use collect::{Collector, deliver_in_order};
pub use logging::{LoggerHandle, logger};
