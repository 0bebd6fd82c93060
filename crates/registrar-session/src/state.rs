//! Session types: what the console knows about the signed-in user.
//!
//! The session core tracks only two facts:
//! - WHO is signed in (`username`)
//! - WHEN their access token stops working (`access_token_expires_at`)
//!
//! Everything else (is the user authenticated? does the token need a
//! refresh?) is derived from those two.

use std::time::Duration;

use registrar_protocol::{Timestamp, Username};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for token freshness decisions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long before expiry a token already counts as stale.
    ///
    /// A navigation that finds the token inside this window refreshes
    /// first, so the page it lands on doesn't fire requests with a token
    /// that dies mid-load.
    ///
    /// Default: 30 seconds.
    pub safety_margin: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    pub fn with_margin(safety_margin: Duration) -> Self {
        Self { safety_margin }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The gateway's private, mutable view of the session.
///
/// There is no `is_authenticated` field: it is computed from
/// `username`, so the two can never disagree.
///
/// `generation` increases every time the state is cleared. A refresh
/// remembers the generation it started in and only writes its result if
/// nothing cleared the session meanwhile (e.g. a logout).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SessionState {
    pub(crate) username: Option<Username>,
    pub(crate) access_token_expires_at: Option<Timestamp>,
    pub(crate) generation: u64,
}

impl SessionState {
    /// `true` when there is no known token, or it expires within `margin`
    /// of `now`.
    pub(crate) fn needs_refresh(&self, now: Timestamp, margin: Duration) -> bool {
        match self.access_token_expires_at {
            None => true,
            Some(expires_at) => now.saturating_add(margin) >= expires_at,
        }
    }

    /// Resets to unauthenticated and starts a new generation.
    pub(crate) fn clear(&mut self) {
        self.username = None;
        self.access_token_expires_at = None;
        self.generation += 1;
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            username: self.username.clone(),
            is_authenticated: self.username.is_some(),
            access_token_expires_at: self.access_token_expires_at,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A read-only copy of the session for display and routing.
///
/// Snapshots are advisory: the real state may change the moment after one
/// is taken. Use [`SessionGateway::subscribe`] to follow changes.
///
/// [`SessionGateway::subscribe`]: crate::SessionGateway::subscribe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub username: Option<Username>,
    pub is_authenticated: bool,
    pub access_token_expires_at: Option<Timestamp>,
}
