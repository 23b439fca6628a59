use std::sync::{Arc, Mutex};

use segments::{
    AdmissionStatus,
    EnvelopeCodec,
    FragmentBatch,
    MessageDecoder,
    MessageHandler,
    Reassembler,
    ReassemblyError,
};

/// Records every message delivered by a reassembly engine.
pub struct Collector<M> {
    messages: Arc<Mutex<Vec<M>>>,
}

impl<M: Send + 'static> Collector<M> {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Build a handler that appends each message to this collector.
    #[must_use]
    pub fn handler(&self) -> MessageHandler<M> {
        let messages = Arc::clone(&self.messages);
        Arc::new(move |message: M| messages.lock().expect("collector poisoned").push(message))
    }

    /// Take every message collected so far.
    ///
    /// # Panics
    ///
    /// Panics if a handler panicked while holding the collector.
    #[must_use]
    pub fn take(&self) -> Vec<M> { std::mem::take(&mut *self.messages.lock().expect("collector poisoned")) }

    /// Number of messages collected and not yet taken.
    ///
    /// # Panics
    ///
    /// Panics if a handler panicked while holding the collector.
    #[must_use]
    pub fn len(&self) -> usize { self.messages.lock().expect("collector poisoned").len() }

    /// Whether no messages are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl<M: Send + 'static> Default for Collector<M> {
    fn default() -> Self { Self::new() }
}

impl<M> Clone for Collector<M> {
    fn clone(&self) -> Self {
        Self {
            messages: Arc::clone(&self.messages),
        }
    }
}

/// Ingest the encoded fragments of `batch` in the order given by `order`,
/// which holds zero-based positions and may repeat or omit some.
///
/// Returns the status of every ingestion.
///
/// # Errors
///
/// Stops at and returns the first [`ReassemblyError`].
///
/// # Panics
///
/// Panics if `order` names a position outside the batch.
pub fn deliver_in_order<D, C>(
    engine: &Reassembler<D, C>,
    batch: &FragmentBatch,
    order: impl IntoIterator<Item = usize>,
) -> Result<Vec<AdmissionStatus>, ReassemblyError>
where
    D: MessageDecoder,
    C: EnvelopeCodec,
{
    let fragments = batch.fragments();
    order
        .into_iter()
        .map(|index| engine.ingest(fragments[index].encoded()))
        .collect()
}
