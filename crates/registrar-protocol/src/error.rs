//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means "the bytes and the schema disagree":
//! the server sent something we could not parse, or parsed into a value
//! the schema does not allow. Network trouble lives in `TransportError`.

/// Errors that can occur while encoding, decoding, or validating a message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// wrong data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates the schema's rules, e.g. an empty
    /// username or a zero expiry.
    #[error("invalid field `{field}`: {reason}")]
    Invalid {
        /// Wire name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ProtocolError {
    /// Shorthand for [`ProtocolError::Invalid`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
