//! Typed client for the remote auth service.
//!
//! The session core doesn't implement authentication; the auth service
//! does. [`AuthClient`] is the thin layer that turns "log in", "refresh",
//! "who am I" into HTTP requests and turns the answers back into validated
//! [`v1`](registrar_protocol::v1) schema values.
//!
//! Every call goes out with credentials included, because the service
//! keeps the long-lived refresh credential in a cookie.

use registrar_protocol::v1::{
    CurrentUserResponse, ErrorBody, LoginRequest, LoginResponse,
    MessageResponse, RefreshResponse, SignupRequest,
};
use registrar_protocol::{Codec, Endpoint, Secret, Timestamp, Username, Validate};
use registrar_transport::{ApiRequest, ApiResponse, Credentials, HttpTransport};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::SessionError;

/// Calls the auth service endpoints listed in [`Endpoint`].
///
/// `AuthClient` has no state of its own beyond the transport and codec;
/// it never touches the session. Deciding what a response means for the
/// session is the gateway's job.
pub struct AuthClient<T: HttpTransport, C: Codec> {
    transport: T,
    codec: C,
}

impl<T: HttpTransport, C: Codec> AuthClient<T, C> {
    pub fn new(transport: T, codec: C) -> Self {
        Self { transport, codec }
    }

    /// The transport every call (auth or not) goes through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `POST /api/user/login`.
    ///
    /// # Errors
    /// [`SessionError::Rejected`] with status 401 for bad credentials.
    pub async fn login(
        &self,
        email: &str,
        password: &Secret,
    ) -> Result<LoginResponse, SessionError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.clone(),
        };
        self.call(Endpoint::Login, Some(&body)).await
    }

    /// `POST /api/user/signup`.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &Secret,
    ) -> Result<MessageResponse, SessionError> {
        let body = SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.clone(),
        };
        self.call(Endpoint::Signup, Some(&body)).await
    }

    /// `POST /api/user/logout`.
    pub async fn logout(&self) -> Result<MessageResponse, SessionError> {
        self.call::<(), _>(Endpoint::Logout, None).await
    }

    /// `POST /api/user/refresh`, returning the new token's expiry.
    ///
    /// Fails when the ambient refresh credential is missing or expired.
    pub async fn refresh(&self) -> Result<Timestamp, SessionError> {
        let resp: RefreshResponse =
            self.call::<(), _>(Endpoint::Refresh, None).await?;
        Ok(resp.access_token_expires_at)
    }

    /// `GET /api/user/me`. Fails without a valid access token.
    pub async fn current_user(&self) -> Result<Username, SessionError> {
        let resp: CurrentUserResponse =
            self.call::<(), _>(Endpoint::CurrentUser, None).await?;
        Ok(resp.username)
    }

    async fn call<B, R>(
        &self,
        endpoint: Endpoint,
        body: Option<&B>,
    ) -> Result<R, SessionError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Validate,
    {
        let mut request = ApiRequest::new(endpoint.method(), endpoint.path())
            .with_credentials(Credentials::Include);
        if let Some(body) = body {
            let bytes = self
                .codec
                .encode(body)
                .map_err(|e| SessionError::protocol(endpoint, e))?;
            request = request.with_json_body(bytes);
        }

        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            let message = self.error_message(&response);
            tracing::debug!(
                %endpoint,
                status = response.status(),
                %message,
                "auth endpoint rejected the call"
            );
            return Err(SessionError::Rejected {
                endpoint,
                status: response.status(),
                message,
            });
        }

        self.codec
            .decode_validated(response.body())
            .map_err(|e| SessionError::protocol(endpoint, e))
    }

    /// The server's `{"error": ...}` text, or the raw body as a fallback.
    fn error_message(&self, response: &ApiResponse) -> String {
        if let Ok(body) = self.codec.decode::<ErrorBody>(response.body()) {
            return body.error;
        }
        let text = String::from_utf8_lossy(response.body()).trim().to_string();
        if text.is_empty() {
            "no error message".to_string()
        } else {
            text
        }
    }
}
