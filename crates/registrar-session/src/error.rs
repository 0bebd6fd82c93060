//! Error types for the session layer.

use std::sync::Arc;

use registrar_protocol::{Endpoint, ProtocolError};
use registrar_transport::{STATUS_UNAUTHORIZED, TransportError};

/// Errors that can occur while talking to the auth service or running an
/// authenticated request.
///
/// `SessionError` is `Clone` because one refresh outcome is handed to every
/// caller waiting on it. The wrapped transport and protocol errors are not
/// cloneable themselves, so they sit behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// No response at all: connection refused, timeout, DNS failure.
    /// Never triggers a refresh.
    #[error("transport failed: {0}")]
    Transport(#[source] Arc<TransportError>),

    /// The endpoint answered 2xx but the body broke its schema.
    #[error("malformed {endpoint} response: {source}")]
    Protocol {
        endpoint: Endpoint,
        #[source]
        source: Arc<ProtocolError>,
    },

    /// The endpoint answered with a non-2xx status.
    ///
    /// `message` is the server's `{"error": ...}` text when it sent one.
    #[error("{endpoint} rejected with status {status}: {message}")]
    Rejected {
        endpoint: Endpoint,
        status: u16,
        message: String,
    },
}

impl SessionError {
    pub(crate) fn protocol(endpoint: Endpoint, err: ProtocolError) -> Self {
        Self::Protocol {
            endpoint,
            source: Arc::new(err),
        }
    }

    /// `true` when the auth service said 401 to this call.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            SessionError::Rejected { status, .. } if *status == STATUS_UNAUTHORIZED
        )
    }

    /// The endpoint that failed, if the failure came from one.
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            SessionError::Transport(_) => None,
            SessionError::Protocol { endpoint, .. }
            | SessionError::Rejected { endpoint, .. } => Some(*endpoint),
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        Self::Transport(Arc::new(err))
    }
}
