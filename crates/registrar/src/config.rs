//! Console configuration.
//!
//! Everything has a default except the API base URL, which differs per
//! deployment. [`ConsoleConfig::from_env`] reads overrides from the
//! environment:
//!
//! | variable                          | field             | default            |
//! |-----------------------------------|-------------------|--------------------|
//! | `REGISTRAR_API_URL`               | `api_url`         | `http://localhost:8080` |
//! | `REGISTRAR_REFRESH_MARGIN_SECS`   | `refresh_margin`  | 30 s               |
//! | `REGISTRAR_REQUEST_TIMEOUT_SECS`  | `request_timeout` | 30 s               |

use std::time::Duration;

use registrar_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::RegistrarError;

pub const API_URL_VAR: &str = "REGISTRAR_API_URL";
pub const REFRESH_MARGIN_VAR: &str = "REGISTRAR_REFRESH_MARGIN_SECS";
pub const REQUEST_TIMEOUT_VAR: &str = "REGISTRAR_REQUEST_TIMEOUT_SECS";

// ---------------------------------------------------------------------------
// RouteConfig
// ---------------------------------------------------------------------------

/// The two routes the navigation guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Where unauthenticated users are sent.
    pub login_path: String,

    /// Where authenticated users land, and where they are sent when they
    /// open a guest-only page such as the login form.
    pub home_path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            home_path: "/manage/students".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConsoleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the records API; endpoint paths are appended to it.
    pub api_url: String,

    /// See [`SessionConfig::safety_margin`].
    pub refresh_margin: Duration,

    /// Per-request timeout for the HTTP transport.
    pub request_timeout: Duration,

    pub routes: RouteConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            refresh_margin: SessionConfig::default().safety_margin,
            request_timeout: Duration::from_secs(30),
            routes: RouteConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Defaults, overridden by whichever `REGISTRAR_*` variables are set.
    ///
    /// # Errors
    /// [`RegistrarError::Config`] when a variable is set but unparseable.
    pub fn from_env() -> Result<Self, RegistrarError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup` instead of the process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RegistrarError> {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_VAR) {
            let url = url.trim();
            if url.is_empty() {
                return Err(RegistrarError::Config(format!(
                    "{API_URL_VAR} is set but empty"
                )));
            }
            config.api_url = url.to_string();
        }
        if let Some(raw) = lookup(REFRESH_MARGIN_VAR) {
            config.refresh_margin = parse_secs(REFRESH_MARGIN_VAR, &raw)?;
        }
        if let Some(raw) = lookup(REQUEST_TIMEOUT_VAR) {
            let timeout = parse_secs(REQUEST_TIMEOUT_VAR, &raw)?;
            if timeout.is_zero() {
                return Err(RegistrarError::Config(format!(
                    "{REQUEST_TIMEOUT_VAR} must be greater than zero"
                )));
            }
            config.request_timeout = timeout;
        }

        Ok(config)
    }

    /// The session settings derived from this config.
    pub fn session(&self) -> SessionConfig {
        SessionConfig::with_margin(self.refresh_margin)
    }
}

fn parse_secs(var: &str, raw: &str) -> Result<Duration, RegistrarError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            RegistrarError::Config(format!(
                "{var}={raw:?} is not a whole number of seconds: {e}"
            ))
        })
}
