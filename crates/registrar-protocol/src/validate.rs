use crate::ProtocolError;

/// Schema rules that serde's type checks cannot express.
///
/// Every response schema implements this; [`Codec::decode_validated`]
/// runs it right after parsing, so nothing past the protocol boundary ever
/// holds, say, an empty username.
///
/// [`Codec::decode_validated`]: crate::Codec::decode_validated
pub trait Validate {
    /// Returns `Err(ProtocolError::Invalid)` on the first broken rule.
    fn validate(&self) -> Result<(), ProtocolError>;
}
