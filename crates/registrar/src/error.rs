//! Unified error type for the Registrar console.

use registrar_protocol::ProtocolError;
use registrar_session::SessionError;
use registrar_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `registrar` crate you deal with this single error type
/// instead of importing errors from each layer. `#[from]` on each variant
/// generates the `From` impls, so `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RegistrarError {
    /// Building or using the HTTP transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The auth service rejected a call, or a refresh failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A configuration value is missing or unparseable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
