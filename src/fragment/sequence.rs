//! One-based fragment positioning within logical messages.
//!
//! Provides [`SequenceNumber`], a type-safe wrapper around a non-zero `u32`.
//! Sequence numbers start at one and never exceed the declared fragment
//! count of their message.

use std::num::NonZeroU32;

use derive_more::{Display, From, Into};

/// One-based ordinal describing a fragment's position within its message.
///
/// # Examples
///
/// ```
/// use segments::fragment::SequenceNumber;
/// let seq = SequenceNumber::new(3).expect("non-zero");
/// assert_eq!(seq.get(), 3);
/// assert!(SequenceNumber::new(0).is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct SequenceNumber(NonZeroU32);

impl SequenceNumber {
    /// The first fragment of every message.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Construct a sequence number, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Return the underlying numeric value.
    #[must_use]
    pub const fn get(self) -> u32 { self.0.get() }

    /// Advance to the next position, returning `None` on overflow.
    #[must_use]
    pub fn checked_increment(self) -> Option<Self> { self.0.checked_add(1).map(Self) }
}

impl From<SequenceNumber> for u32 {
    fn from(value: SequenceNumber) -> Self { value.get() }
}
