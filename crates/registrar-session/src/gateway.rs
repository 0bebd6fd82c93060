//! The session gateway: the one door every authenticated call goes through.
//!
//! # Request flow
//!
//! ```text
//! authenticated_request(req)
//!   │
//!   ├─ send (credentials included) ──→ 2xx / 4xx / 5xx ──→ returned as-is
//!   │                              └─→ no response ─────→ SessionError::Transport
//!   │
//!   └─ 401 ──→ refresh() ── single flight, shared by every concurrent 401
//!                 │
//!                 ├─ ok  ──→ send req once more ──→ returned as-is (even a 401)
//!                 └─ err ──→ session cleared, refresh error returned
//! ```
//!
//! # Navigation flow
//!
//! ```text
//! ensure_session_fresh()
//!   ├─ expiry unknown or inside the safety margin → refresh()
//!   ├─ username unknown                            → GET /api/user/me
//!   │                                                 (401 → refresh(), once more)
//!   └─ any failure                                 → clear session, Err
//! ```
//!
//! Identity fetches are single-flight too: several navigations racing on
//! an unknown username share one `GET /api/user/me`.
//!
//! # Sharing
//!
//! `SessionGateway` is cheap to clone. Clones share the session state, the
//! single-flight slots and the auth client, so handing a clone to every
//! task is the intended way to use it. There are no globals.

use std::sync::Arc;

use futures_util::future::FutureExt;
use registrar_protocol::v1::MessageResponse;
use registrar_protocol::{Codec, JsonCodec, Secret, Timestamp, Username};
use registrar_transport::{
    ApiRequest, ApiResponse, Credentials, HttpTransport, RequestId,
};
use tokio::sync::watch;
use tracing::Instrument;

use crate::flight::SingleFlight;
use crate::{
    AuthClient, Clock, SessionConfig, SessionError, SessionSnapshot,
    SessionState, SystemClock,
};

/// Owns the session state and mediates every authenticated call.
pub struct SessionGateway<T: HttpTransport, C: Codec = JsonCodec> {
    auth: Arc<AuthClient<T, C>>,
    state: Arc<watch::Sender<SessionState>>,
    refresh_flight: Arc<SingleFlight<Timestamp>>,
    identity_flight: Arc<SingleFlight<Username>>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

// Manual impl: a derive would demand `T: Clone` and `C: Clone`, but every
// field is already shared behind an `Arc`.
impl<T: HttpTransport, C: Codec> Clone for SessionGateway<T, C> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            state: Arc::clone(&self.state),
            refresh_flight: Arc::clone(&self.refresh_flight),
            identity_flight: Arc::clone(&self.identity_flight),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T: HttpTransport> SessionGateway<T, JsonCodec> {
    /// Creates a gateway speaking JSON over `transport`, with an empty
    /// (unauthenticated) session.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self::with_codec(transport, JsonCodec, config)
    }
}

impl<T: HttpTransport, C: Codec> SessionGateway<T, C> {
    pub fn with_codec(transport: T, codec: C, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            auth: Arc::new(AuthClient::new(transport, codec)),
            state: Arc::new(state),
            refresh_flight: SingleFlight::new("refresh"),
            identity_flight: SingleFlight::new("identity"),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for expiry checks.
    ///
    /// Call this before cloning the gateway; clones made earlier keep the
    /// old clock.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Authenticated requests
    // -----------------------------------------------------------------------

    /// Sends `request` with credentials included, refreshing and retrying
    /// once if the server answers 401.
    ///
    /// Any status other than 401 is returned unchanged; deciding what a
    /// 404 or 500 means is the caller's job. The retry's response is also
    /// returned unchanged, so a second 401 reaches the caller instead of
    /// looping.
    ///
    /// # Errors
    /// - [`SessionError::Transport`] when no response arrived. No refresh
    ///   is attempted for those.
    /// - Whatever [`refresh`](Self::refresh) failed with, when the 401
    ///   could not be recovered from. The session is cleared in that case.
    pub async fn authenticated_request(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse, SessionError> {
        let request_id = RequestId::generate();
        let span = tracing::debug_span!(
            "authenticated_request",
            %request_id,
            method = %request.method(),
            path = request.path(),
        );

        async move {
            let request = request.with_credentials(Credentials::Include);
            let response = self.auth.transport().send(&request).await?;
            if !response.is_unauthorized() {
                return Ok(response);
            }

            tracing::debug!("request unauthorized, refreshing access token");
            self.refresh().await?;

            let retried = self.auth.transport().send(&request).await?;
            if retried.is_unauthorized() {
                tracing::warn!("request still unauthorized after refresh");
            }
            Ok(retried)
        }
        .instrument(span)
        .await
    }

    // -----------------------------------------------------------------------
    // Freshness
    // -----------------------------------------------------------------------

    /// Makes sure the session is usable before a navigation lands.
    ///
    /// Refreshes when the access token's expiry is unknown or falls inside
    /// [`SessionConfig::safety_margin`], then fetches the username if it
    /// isn't known yet. Cheap when the session is fresh: no network call.
    ///
    /// # Errors
    /// The first refresh or identity failure. The session is cleared
    /// before the error is returned.
    pub async fn ensure_session_fresh(&self) -> Result<(), SessionError> {
        match self.try_ensure_fresh().await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "session could not be made fresh");
                self.clear();
                Err(err)
            }
        }
    }

    async fn try_ensure_fresh(&self) -> Result<(), SessionError> {
        let stale = self
            .state
            .borrow()
            .needs_refresh(self.clock.now(), self.config.safety_margin);
        if stale {
            self.refresh().await?;
        }

        let identified = self.state.borrow().username.is_some();
        if !identified {
            self.fetch_identity().await?;
        }
        Ok(())
    }

    /// Exchanges the refresh credential for a new access token.
    ///
    /// At most one refresh is in flight per gateway (and its clones):
    /// concurrent callers all wait on the same request and all receive its
    /// outcome. On success the new expiry is stored; on failure the session
    /// is cleared. Either write is skipped if the session was cleared (for
    /// example by [`logout`](Self::logout)) while the refresh was running.
    pub async fn refresh(&self) -> Result<Timestamp, SessionError> {
        shared_refresh(&self.refresh_flight, &self.auth, &self.state).await
    }

    /// Fetches the current user's name and stores it.
    ///
    /// A 401 means the access token is gone but the refresh cookie may not
    /// be: refresh (shared with any other caller) and ask once more.
    /// Concurrent callers share one fetch.
    async fn fetch_identity(&self) -> Result<Username, SessionError> {
        let auth = Arc::clone(&self.auth);
        let state = Arc::clone(&self.state);
        let refresh_flight = Arc::clone(&self.refresh_flight);

        self.identity_flight
            .run(move || {
                let generation = state.borrow().generation;
                async move {
                    let username = match auth.current_user().await {
                        Err(err) if err.is_unauthorized() => {
                            tracing::debug!("identity unauthorized, refreshing access token");
                            shared_refresh(&refresh_flight, &auth, &state).await?;
                            auth.current_user().await?
                        }
                        other => other?,
                    };

                    let stored = state.send_if_modified(|state| {
                        if state.generation != generation {
                            return false;
                        }
                        state.username = Some(username.clone());
                        true
                    });
                    if stored {
                        tracing::debug!(%username, "identity resolved");
                    }
                    Ok::<_, SessionError>(username)
                }
                .boxed()
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Sign-in lifecycle
    // -----------------------------------------------------------------------

    /// Signs in and records who the user is.
    ///
    /// The access token's expiry stays unknown until the first refresh,
    /// which the next [`ensure_session_fresh`](Self::ensure_session_fresh)
    /// performs. A 401 here means bad credentials and never triggers a
    /// refresh.
    ///
    /// Returns the server's greeting.
    pub async fn login(
        &self,
        email: &str,
        password: &Secret,
    ) -> Result<String, SessionError> {
        let response = self.auth.login(email, password).await?;

        self.state.send_modify(|state| {
            state.username = Some(response.username.clone());
            state.access_token_expires_at = None;
        });
        tracing::info!(username = %response.username, "signed in");

        Ok(response
            .message
            .unwrap_or_else(|| format!("Signed in as {}", response.username)))
    }

    /// Registers a new account. The session is left untouched; the new user
    /// still has to [`login`](Self::login).
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &Secret,
    ) -> Result<MessageResponse, SessionError> {
        let response = self.auth.signup(username, email, password).await?;
        tracing::info!(%username, "account created");
        Ok(response)
    }

    /// Signs out remotely, then clears the session.
    ///
    /// The session is cleared whatever the remote call did.
    ///
    /// # Errors
    /// The remote failure, reported after the session was cleared.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let remote = self.auth.logout().await;
        self.clear();

        match remote {
            Ok(_) => {
                tracing::info!("signed out");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "remote logout failed; local session cleared anyway");
                Err(err)
            }
        }
    }

    /// Start-up identity probe.
    ///
    /// Asks the auth service who is signed in (the browser may still hold
    /// a valid cookie from an earlier visit). On success the username is
    /// stored; on any failure the session is cleared. Never fails.
    pub async fn bootstrap(&self) -> SessionSnapshot {
        if let Err(err) = self.fetch_identity().await {
            tracing::debug!(error = %err, "no existing session");
            self.clear();
        }
        self.snapshot()
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// A copy of the session as it is right now.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().snapshot()
    }

    /// Follows session changes.
    pub fn subscribe(&self) -> SessionWatch {
        SessionWatch {
            rx: self.state.subscribe(),
        }
    }

    /// `true` while a refresh request is outstanding.
    pub async fn is_refreshing(&self) -> bool {
        self.refresh_flight.is_busy().await
    }

    /// How many refresh requests this gateway has sent so far.
    pub fn refreshes_started(&self) -> u64 {
        self.refresh_flight.started()
    }

    fn clear(&self) {
        self.state.send_modify(SessionState::clear);
    }
}

/// Joins the in-flight refresh or starts one.
///
/// Free-standing so the identity fetch can refresh from inside its own
/// shared future without holding a whole gateway.
async fn shared_refresh<T: HttpTransport, C: Codec>(
    flight: &Arc<SingleFlight<Timestamp>>,
    auth: &Arc<AuthClient<T, C>>,
    state: &Arc<watch::Sender<SessionState>>,
) -> Result<Timestamp, SessionError> {
    let auth = Arc::clone(auth);
    let state = Arc::clone(state);

    flight
        .run(move || {
            let generation = state.borrow().generation;
            async move {
                let outcome = auth.refresh().await;
                settle_refresh(&state, generation, &outcome);
                outcome
            }
            .boxed()
        })
        .await
}

/// Writes a refresh outcome into the session, unless the session was
/// cleared after the refresh started.
fn settle_refresh(
    state: &watch::Sender<SessionState>,
    generation: u64,
    outcome: &Result<Timestamp, SessionError>,
) {
    let applied = state.send_if_modified(|state| {
        if state.generation != generation {
            return false;
        }
        match outcome {
            Ok(expires_at) => state.access_token_expires_at = Some(*expires_at),
            Err(_) => state.clear(),
        }
        true
    });

    match (applied, outcome) {
        (false, _) => {
            tracing::debug!("session cleared during refresh; outcome discarded");
        }
        (true, Ok(expires_at)) => {
            tracing::info!(%expires_at, "access token refreshed");
        }
        (true, Err(err)) => {
            tracing::warn!(error = %err, "refresh failed; session cleared");
        }
    }
}

// ---------------------------------------------------------------------------
// SessionWatch
// ---------------------------------------------------------------------------

/// A subscription to session changes, from [`SessionGateway::subscribe`].
///
/// Only the latest state is kept: a slow watcher skips intermediate
/// states rather than queueing them.
pub struct SessionWatch {
    rx: watch::Receiver<SessionState>,
}

impl SessionWatch {
    /// The latest session state, marking it as seen.
    pub fn current(&mut self) -> SessionSnapshot {
        self.rx.borrow_and_update().snapshot()
    }

    /// Waits until the session changes, then returns the new state.
    ///
    /// Returns `None` once every clone of the gateway has been dropped.
    pub async fn changed(&mut self) -> Option<SessionSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }
}
