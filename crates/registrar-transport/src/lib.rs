//! HTTP transport abstraction for the Registrar console.
//!
//! Provides the [`HttpTransport`] trait plus the request/response values
//! that travel through it. Everything above this crate (protocol, session)
//! talks to the network only through this trait, which keeps the session
//! logic testable without a server.
//!
//! # Feature Flags
//!
//! - `http` (default): [`ReqwestTransport`], a real HTTP client with a
//!   cookie jar for requests sent with [`Credentials::Include`]
//! - `mock`: [`MockTransport`], a scripted in-memory transport for tests

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "mock")]
mod mock;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::ReqwestTransport;
#[cfg(feature = "mock")]
pub use mock::{MockReply, MockTransport, RecordedCall};

use std::fmt;

use rand::Rng;

/// Status code the session layer reacts to.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// The canonical upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether ambient credentials (session cookies) accompany a request.
///
/// The console's refresh credential lives in a cookie set by the auth
/// service, so every authenticated call uses [`Credentials::Include`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Send stored cookies and remember any the server sets.
    Include,
    /// Send the request without cookies.
    #[default]
    Omit,
}

/// Opaque correlation id attached to log lines for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a `RequestId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Generates a random id.
    pub fn generate() -> Self {
        Self(rand::rng().random())
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{:016x}", self.0)
    }
}

/// An outbound HTTP request, independent of any client library.
///
/// `path` is relative to the transport's base URL (e.g. `/api/students`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    credentials: Credentials,
}

impl ApiRequest {
    /// Creates a request with no headers, no body and credentials omitted.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            credentials: Credentials::Omit,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Appends a header. Repeated names are sent as repeated headers.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the raw body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and the matching `content-type` header.
    pub fn with_json_body(self, body: impl Into<Vec<u8>>) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(body)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
    }
}

/// A response as received from the server, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` for 401, the only status that triggers a token refresh.
    pub fn is_unauthorized(&self) -> bool {
        self.status == STATUS_UNAUTHORIZED
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Sends [`ApiRequest`]s and returns [`ApiResponse`]s.
///
/// Implementations must return `Ok` for every response that arrived,
/// including error statuses. `Err` is reserved for "no response at all".
///
/// The returned future is `Send` so the session layer can share in-flight
/// work between tasks.
pub trait HttpTransport: Send + Sync + 'static {
    /// Sends one request and waits for its response.
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl std::future::Future<Output = Result<ApiResponse, TransportError>>
    + Send;
}
