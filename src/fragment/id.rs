//! Correlation identifiers shared by every fragment of one logical message.

use std::borrow::Borrow;

use derive_more::{Display, From, Into};

/// Identifier that ties fragments of the same logical message together.
///
/// Identifiers are opaque strings chosen by the sender. The store keys
/// sessions by this value, so two concurrent messages must never share one.
///
/// # Examples
///
/// ```
/// use segments::fragment::CorrelationId;
/// let id = CorrelationId::from("x1");
/// assert_eq!(id.as_str(), "x1");
/// assert_eq!(id.to_string(), "x1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a new identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { self.0.as_str() }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self { Self(value.to_owned()) }
}

impl From<&CorrelationId> for CorrelationId {
    fn from(value: &CorrelationId) -> Self { value.clone() }
}

impl Borrow<str> for CorrelationId {
    fn borrow(&self) -> &str { self.as_str() }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str { self.as_str() }
}
