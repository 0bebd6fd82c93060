//! Version 1 of the auth service's wire schemas.
//!
//! One request and/or response type per endpoint. Field names follow the
//! service's camelCase JSON (`accessTokenExpiresAt`, `messageTitle`); the
//! Rust side uses snake_case via `#[serde(rename_all = "camelCase")]`.
//!
//! | endpoint | request | response |
//! |---|---|---|
//! | [`Endpoint::Login`] | [`LoginRequest`] | [`LoginResponse`] |
//! | [`Endpoint::Signup`] | [`SignupRequest`] | [`MessageResponse`] |
//! | [`Endpoint::Refresh`] | none | [`RefreshResponse`] |
//! | [`Endpoint::CurrentUser`] | none | [`CurrentUserResponse`] |
//! | [`Endpoint::Logout`] | none | [`MessageResponse`] |
//!
//! Any endpoint may answer an error status with an [`ErrorBody`].

use std::fmt;

use registrar_transport::Method;
use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Secret, Timestamp, Username, Validate};

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// The auth service endpoints the session core calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Signup,
    Logout,
    Refresh,
    CurrentUser,
}

impl Endpoint {
    /// Path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Login => "/api/user/login",
            Endpoint::Signup => "/api/user/signup",
            Endpoint::Logout => "/api/user/logout",
            Endpoint::Refresh => "/api/user/refresh",
            Endpoint::CurrentUser => "/api/user/me",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::CurrentUser => Method::Get,
            _ => Method::Post,
        }
    }

    /// Short name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Login => "login",
            Endpoint::Signup => "signup",
            Endpoint::Logout => "logout",
            Endpoint::Refresh => "refresh",
            Endpoint::CurrentUser => "me",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /api/user/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Secret,
}

/// Body of `POST /api/user/signup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: Secret,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Successful login.
///
/// The service also hands back the access token, but the console relies on
/// the session cookie, so the token is kept only as a redacted [`Secret`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: Username,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub access_token: Option<Secret>,
}

impl Validate for LoginResponse {
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.username.is_blank() {
            return Err(ProtocolError::invalid("username", "must not be empty"));
        }
        Ok(())
    }
}

/// Title-plus-message acknowledgement (signup, logout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    #[serde(default)]
    pub message_title: Option<String>,
    pub message: String,
}

impl Validate for MessageResponse {
    fn validate(&self) -> Result<(), ProtocolError> {
        Ok(())
    }
}

/// Successful refresh: the new access token's absolute expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token_expires_at: Timestamp,
}

impl Validate for RefreshResponse {
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.access_token_expires_at.as_millis() == 0 {
            return Err(ProtocolError::invalid(
                "accessTokenExpiresAt",
                "must be a positive epoch-millisecond timestamp",
            ));
        }
        Ok(())
    }
}

/// `GET /api/user/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub username: Username,
}

impl Validate for CurrentUserResponse {
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.username.is_blank() {
            return Err(ProtocolError::invalid("username", "must not be empty"));
        }
        Ok(())
    }
}

/// Body the service sends with error statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl Validate for ErrorBody {
    fn validate(&self) -> Result<(), ProtocolError> {
        Ok(())
    }
}
