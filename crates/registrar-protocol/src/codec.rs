//! Codec trait and implementations for request and response bodies.
//!
//! A "codec" (coder/decoder) converts between Rust values and raw bytes.
//! The session layer never calls `serde_json` directly; it goes through a
//! [`Codec`], and for responses through [`Codec::decode_validated`], so a
//! body is only accepted once it both parses and satisfies its schema.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ProtocolError, Validate};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec lives inside the session
/// gateway, which is shared between tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value without schema checks.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Deserializes bytes and runs the schema's [`Validate`] rules.
    ///
    /// # Errors
    /// Anything [`decode`](Self::decode) returns, plus
    /// `ProtocolError::Invalid` when the value breaks a schema rule.
    fn decode_validated<T: DeserializeOwned + Validate>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        let value: T = self.decode(data)?;
        value.validate()?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`), the only format the
/// records API speaks.
///
/// ## Example
///
/// ```rust
/// use registrar_protocol::{Codec, JsonCodec, v1::CurrentUserResponse};
///
/// let codec = JsonCodec;
/// let me: CurrentUserResponse =
///     codec.decode_validated(br#"{"username":"registrar"}"#).unwrap();
/// assert_eq!(me.username.as_str(), "registrar");
///
/// // An empty username parses, but fails validation.
/// let bad = codec.decode_validated::<CurrentUserResponse>(br#"{"username":""}"#);
/// assert!(bad.is_err());
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
