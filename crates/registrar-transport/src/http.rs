//! HTTP transport implementation using `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

use crate::{
    ApiRequest, ApiResponse, Credentials, HttpTransport, Method,
    TransportError,
};

/// Applied when the caller does not pick a timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An [`HttpTransport`] backed by two `reqwest` clients sharing one
/// base URL.
///
/// Requests with [`Credentials::Include`] go through a client that owns a
/// cookie jar, so the refresh cookie the auth service sets on login is sent
/// back on every later authenticated call. Requests with
/// [`Credentials::Omit`] use a client without a jar.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    with_cookies: reqwest::Client,
    without_cookies: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport for `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a transport whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TransportError::Setup("base URL is empty".into()));
        }

        let jar = Arc::new(Jar::default());
        let with_cookies = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        let without_cookies = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        tracing::debug!(%base_url, ?timeout, "HTTP transport ready");
        Ok(Self {
            base_url,
            with_cookies,
            without_cookies,
        })
    }

    /// The base URL every request path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(request.path());
        let client = match request.credentials() {
            Credentials::Include => &self.with_cookies,
            Credentials::Omit => &self.without_cookies,
        };

        let mut builder =
            client.request(to_reqwest_method(request.method()), &url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                // Non-UTF-8 header values are dropped rather than mangled.
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&url, e))?;

        tracing::trace!(
            method = %request.method(),
            %url,
            status,
            "HTTP response received"
        );

        Ok(ApiResponse::new(status, body.to_vec()).with_headers(headers))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::TimedOut(url.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else if err.is_connect() {
        TransportError::request_failed(
            url,
            std::io::ErrorKind::ConnectionRefused,
            err,
        )
    } else {
        TransportError::request_failed(url, std::io::ErrorKind::Other, err)
    }
}
