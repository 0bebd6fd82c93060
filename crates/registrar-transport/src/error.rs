/// Errors that can occur in the transport layer.
///
/// A `TransportError` means no HTTP response was obtained at all. A response
/// with an error status (401, 404, 500, ...) is NOT a transport error; it is
/// returned as a normal [`ApiResponse`](crate::ApiResponse) so higher layers
/// can decide what it means.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or its response could not be read.
    #[error("request to {url} failed: {source}")]
    RequestFailed {
        /// The absolute URL the request was sent to.
        url: String,
        /// The underlying I/O-level cause.
        #[source]
        source: std::io::Error,
    },

    /// No response arrived within the configured timeout.
    #[error("request to {0} timed out")]
    TimedOut(String),

    /// The request description could not be turned into an HTTP request
    /// (bad header name, unparsable URL, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The transport itself could not be constructed.
    #[error("transport setup failed: {0}")]
    Setup(String),
}

impl TransportError {
    /// Shorthand for a [`TransportError::RequestFailed`] with the given kind.
    pub fn request_failed(
        url: impl Into<String>,
        kind: std::io::ErrorKind,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::RequestFailed {
            url: url.into(),
            source: std::io::Error::new(kind, cause),
        }
    }
}
