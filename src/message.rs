//! Message types and the decoders applied to reassembled payloads.
//!
//! Once every fragment of a message has arrived, the engine concatenates the
//! payload slices and hands the bytes to a [`MessageDecoder`]. The decoded
//! value is what the application's message handler receives.

use std::{convert::Infallible, error::Error, fmt, marker::PhantomData};

use bincode::error::{DecodeError, EncodeError};
use bincode::{BorrowDecode, Encode, borrow_decode_from_slice, config, encode_to_vec};
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Wrapper trait for application message types carried in binary form.
///
/// Any type deriving [`Encode`] and [`BorrowDecode`] automatically implements
/// this trait via a blanket implementation. The default methods provide
/// convenient helpers to serialize and deserialize using bincode's
/// standard configuration.
pub trait Message: Encode + for<'de> BorrowDecode<'de, ()> {
    /// Serialize the message into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if serialization fails.
    fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        encode_to_vec(self, config::standard())
    }

    /// Deserialize a message from a byte slice, returning the message and
    /// the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if deserialization fails.
    fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), DecodeError>
    where
        Self: Sized,
    {
        borrow_decode_from_slice(bytes, config::standard())
    }
}

impl<T> Message for T where for<'de> T: Encode + BorrowDecode<'de, ()> {}

/// Turns the concatenated payload of a complete session into a message.
pub trait MessageDecoder {
    /// Decoded message handed to the message handler.
    type Message;
    /// Error raised when the payload does not decode.
    type Error: Error + Send + Sync + 'static;

    /// Decode a complete, concatenated payload.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] when the bytes do not form a valid message.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Message, Self::Error>;
}

/// Decodes merged payloads as JSON documents.
///
/// The default target is [`serde_json::Value`], matching senders that split
/// arbitrary JSON text; any [`DeserializeOwned`] type works.
///
/// # Examples
///
/// ```
/// use segments::message::{JsonDecoder, MessageDecoder};
/// let decoder = JsonDecoder::<serde_json::Value>::new();
/// let value = decoder.decode(br#"{"temp":21}"#).expect("valid JSON");
/// assert_eq!(value["temp"], 21);
/// ```
pub struct JsonDecoder<T = serde_json::Value>(PhantomData<fn() -> T>);

impl<T> JsonDecoder<T> {
    /// Create a JSON decoder.
    #[must_use]
    pub const fn new() -> Self { Self(PhantomData) }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for JsonDecoder<T> {}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("JsonDecoder") }
}

impl<T: DeserializeOwned> MessageDecoder for JsonDecoder<T> {
    type Message = T;
    type Error = serde_json::Error;

    fn decode(&self, bytes: &[u8]) -> Result<T, serde_json::Error> { serde_json::from_slice(bytes) }
}

/// Decodes merged payloads as [`Message`] values with bincode's standard
/// configuration.
pub struct BincodeDecoder<M>(PhantomData<fn() -> M>);

impl<M> BincodeDecoder<M> {
    /// Create a bincode decoder.
    #[must_use]
    pub const fn new() -> Self { Self(PhantomData) }
}

impl<M> Default for BincodeDecoder<M> {
    fn default() -> Self { Self::new() }
}

impl<M> Clone for BincodeDecoder<M> {
    fn clone(&self) -> Self { *self }
}

impl<M> Copy for BincodeDecoder<M> {}

impl<M> fmt::Debug for BincodeDecoder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("BincodeDecoder") }
}

impl<M: Message> MessageDecoder for BincodeDecoder<M> {
    type Message = M;
    type Error = DecodeError;

    fn decode(&self, bytes: &[u8]) -> Result<M, DecodeError> {
        let (message, consumed) = M::from_bytes(bytes)?;
        if consumed != bytes.len() {
            return Err(DecodeError::OtherString(format!(
                "{} trailing bytes after message",
                bytes.len() - consumed
            )));
        }
        Ok(message)
    }
}

/// Hands merged payloads through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesDecoder;

impl MessageDecoder for BytesDecoder {
    type Message = Bytes;
    type Error = Infallible;

    fn decode(&self, bytes: &[u8]) -> Result<Bytes, Infallible> { Ok(Bytes::copy_from_slice(bytes)) }
}
