//! `Console` builder and handle.
//!
//! This is the entry point for a Registrar console front end. It ties the
//! layers together: transport → protocol → session → navigation.

use std::time::Duration;

use registrar_session::{SessionGateway, SessionSnapshot};
use registrar_transport::{HttpTransport, ReqwestTransport};

use crate::{ConsoleConfig, NavigationGuard, RegistrarError, RouteConfig};

/// Builder for configuring a [`Console`].
///
/// # Example
///
/// ```rust,no_run
/// use registrar::prelude::*;
///
/// # async fn run() -> Result<(), RegistrarError> {
/// let console = Console::builder()
///     .api_url("https://records.example.edu")
///     .refresh_margin(std::time::Duration::from_secs(60))
///     .build()?;
///
/// let session = console.start().await;
/// println!("signed in: {}", session.is_authenticated);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConsoleBuilder {
    config: ConsoleConfig,
}

impl ConsoleBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration, e.g. with
    /// [`ConsoleConfig::from_env`].
    pub fn config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the records API base URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Sets how long before expiry a token is refreshed.
    pub fn refresh_margin(mut self, margin: Duration) -> Self {
        self.config.refresh_margin = margin;
        self
    }

    /// Sets the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Sets the login and home routes used by the navigation guard.
    pub fn routes(mut self, routes: RouteConfig) -> Self {
        self.config.routes = routes;
        self
    }

    /// Builds a console talking HTTP to the configured API.
    ///
    /// # Errors
    /// [`RegistrarError::Transport`] when the HTTP client can't be set up
    /// (for example an empty base URL).
    pub fn build(self) -> Result<Console<ReqwestTransport>, RegistrarError> {
        let transport = ReqwestTransport::with_timeout(
            self.config.api_url.clone(),
            self.config.request_timeout,
        )?;
        Ok(self.build_with_transport(transport))
    }

    /// Builds a console over any transport; tests pass a mock here.
    /// `api_url` and `request_timeout` are ignored.
    pub fn build_with_transport<T: HttpTransport>(self, transport: T) -> Console<T> {
        let gateway = SessionGateway::new(transport, self.config.session());
        let guard = NavigationGuard::new(gateway.clone(), self.config.routes.clone());
        tracing::debug!(
            api_url = %self.config.api_url,
            margin = ?self.config.refresh_margin,
            "console built"
        );
        Console {
            gateway,
            guard,
            config: self.config,
        }
    }
}

/// A configured console: the session gateway plus its navigation guard.
///
/// Both handles share one session; cloning the console shares it too.
pub struct Console<T: HttpTransport> {
    gateway: SessionGateway<T>,
    guard: NavigationGuard<T>,
    config: ConsoleConfig,
}

impl<T: HttpTransport> Clone for Console<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            guard: self.guard.clone(),
            config: self.config.clone(),
        }
    }
}

impl Console<ReqwestTransport> {
    /// Creates a new builder.
    pub fn builder() -> ConsoleBuilder {
        ConsoleBuilder::new()
    }
}

impl<T: HttpTransport> Console<T> {
    /// Probes for an existing session; run once at start-up.
    pub async fn start(&self) -> SessionSnapshot {
        let snapshot = self.gateway.bootstrap().await;
        match &snapshot.username {
            Some(username) => tracing::info!(%username, "resumed existing session"),
            None => tracing::info!("no active session"),
        }
        snapshot
    }

    pub fn gateway(&self) -> &SessionGateway<T> {
        &self.gateway
    }

    pub fn guard(&self) -> &NavigationGuard<T> {
        &self.guard
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }
}
