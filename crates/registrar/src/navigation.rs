//! Navigation guard: may this route change proceed?
//!
//! The router asks [`NavigationGuard::check`] before every transition and
//! acts on the returned [`NavigationDecision`]. The guard never performs
//! the redirect itself.
//!
//! ```text
//! RouteAccess::Public         → Proceed
//! RouteAccess::GuestOnly      → authenticated?  Redirect(home) : Proceed
//! RouteAccess::Authenticated  → ensure_session_fresh()
//!                                 ok   → Proceed
//!                                 err  → Redirect(login)   (unless already there)
//! ```

use registrar_protocol::{Codec, JsonCodec};
use registrar_session::SessionGateway;
use registrar_transport::HttpTransport;

use crate::RouteConfig;

/// How a route is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Anyone may open it.
    Public,
    /// Only signed-out users, e.g. the login and signup pages.
    GuestOnly,
    /// Requires a fresh session.
    Authenticated,
}

/// What the router should do with a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    Redirect(String),
}

/// Decides route transitions from the session's state.
pub struct NavigationGuard<T: HttpTransport, C: Codec = JsonCodec> {
    gateway: SessionGateway<T, C>,
    routes: RouteConfig,
}

impl<T: HttpTransport, C: Codec> Clone for NavigationGuard<T, C> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            routes: self.routes.clone(),
        }
    }
}

impl<T: HttpTransport, C: Codec> NavigationGuard<T, C> {
    pub fn new(gateway: SessionGateway<T, C>, routes: RouteConfig) -> Self {
        Self { gateway, routes }
    }

    pub fn routes(&self) -> &RouteConfig {
        &self.routes
    }

    /// Decides whether navigating to `target` may proceed.
    ///
    /// Only [`RouteAccess::Authenticated`] targets touch the network, and
    /// only when the session is stale or the username unknown.
    pub async fn check(
        &self,
        target: &str,
        access: RouteAccess,
    ) -> NavigationDecision {
        match access {
            RouteAccess::Public => NavigationDecision::Proceed,
            RouteAccess::GuestOnly => {
                if self.gateway.snapshot().is_authenticated {
                    tracing::debug!(%target, "signed-in user sent home");
                    self.redirect(&self.routes.home_path)
                } else {
                    NavigationDecision::Proceed
                }
            }
            RouteAccess::Authenticated => {
                match self.gateway.ensure_session_fresh().await {
                    Ok(()) => NavigationDecision::Proceed,
                    Err(err) if target == self.routes.login_path => {
                        tracing::debug!(error = %err, "already on login page");
                        NavigationDecision::Proceed
                    }
                    Err(err) => {
                        tracing::info!(%target, error = %err, "session unusable, sending to login");
                        self.redirect(&self.routes.login_path)
                    }
                }
            }
        }
    }

    /// Where the root route leads: home when signed in, login otherwise.
    pub fn landing(&self) -> NavigationDecision {
        if self.gateway.snapshot().is_authenticated {
            self.redirect(&self.routes.home_path)
        } else {
            self.redirect(&self.routes.login_path)
        }
    }

    fn redirect(&self, path: &str) -> NavigationDecision {
        NavigationDecision::Redirect(path.to_string())
    }
}
