//! Configuration bounding reassembly resource usage.

use std::{
    num::{NonZeroU32, NonZeroUsize},
    time::Duration,
};

/// Settings that bound how long and how large in-flight sessions may grow.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use segments::fragment::ReassemblyConfig;
/// let config = ReassemblyConfig::default().with_timeout(Duration::from_secs(5));
/// assert_eq!(config.timeout, Duration::from_secs(5));
/// assert_eq!(config.max_fragments, ReassemblyConfig::DEFAULT_MAX_FRAGMENTS);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReassemblyConfig {
    /// Idle duration after which [`Reassembler::purge_expired`] evicts a
    /// partial session.
    ///
    /// [`Reassembler::purge_expired`]: crate::fragment::Reassembler::purge_expired
    pub timeout: Duration,
    /// Largest fragment count a sender may declare for one message.
    pub max_fragments: NonZeroU32,
    /// Hard cap on the bytes buffered for a single message.
    pub max_message_size: NonZeroUsize,
}

impl ReassemblyConfig {
    /// Default idle timeout for partial sessions.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    /// Default cap on declared fragment counts: every count a sequence
    /// number can address, so any batch from [`Fragmenter`] is accepted.
    ///
    /// [`Fragmenter`]: crate::fragment::Fragmenter
    pub const DEFAULT_MAX_FRAGMENTS: NonZeroU32 = NonZeroU32::MAX;
    /// Default cap on buffered bytes per message: unbounded. Receivers facing
    /// untrusted senders should opt into a limit with
    /// [`ReassemblyConfig::with_max_message_size`].
    pub const DEFAULT_MAX_MESSAGE_SIZE: NonZeroUsize = NonZeroUsize::MAX;

    /// Replace the idle timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the cap on declared fragment counts.
    #[must_use]
    pub const fn with_max_fragments(mut self, max_fragments: NonZeroU32) -> Self {
        self.max_fragments = max_fragments;
        self
    }

    /// Replace the cap on buffered bytes per message.
    #[must_use]
    pub const fn with_max_message_size(mut self, max_message_size: NonZeroUsize) -> Self {
        self.max_message_size = max_message_size;
        self
    }
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            max_fragments: Self::DEFAULT_MAX_FRAGMENTS,
            max_message_size: Self::DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
