//! # Registrar
//!
//! Session core for the Registrar records console.
//!
//! A console page never talks to the records API directly. It goes through
//! a [`SessionGateway`], which keeps the access token alive (one refresh at
//! a time, however many requests need it) and retries a request once when
//! the token turned out to be stale. Before a route change, the
//! [`NavigationGuard`] decides whether the page may open or where to send
//! the user instead.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use registrar::prelude::*;
//!
//! # async fn run() -> Result<(), RegistrarError> {
//! init_tracing();
//! let console = Console::builder()
//!     .config(ConsoleConfig::from_env()?)
//!     .build()?;
//! console.start().await;
//!
//! match console.guard().check("/manage/students", RouteAccess::Authenticated).await {
//!     NavigationDecision::Proceed => {
//!         let students = console
//!             .gateway()
//!             .authenticated_request(ApiRequest::get("/api/students"))
//!             .await?;
//!         println!("{} bytes of students", students.body().len());
//!     }
//!     NavigationDecision::Redirect(path) => println!("go to {path}"),
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod console;
mod error;
mod logging;
mod navigation;

pub use config::{
    API_URL_VAR, ConsoleConfig, REFRESH_MARGIN_VAR, REQUEST_TIMEOUT_VAR,
    RouteConfig,
};
pub use console::{Console, ConsoleBuilder};
pub use error::RegistrarError;
pub use logging::init_tracing;
pub use navigation::{NavigationDecision, NavigationGuard, RouteAccess};

pub use registrar_protocol::{Endpoint, Secret, Timestamp, Username};
pub use registrar_session::{
    SessionConfig, SessionError, SessionGateway, SessionSnapshot, SessionWatch,
};
pub use registrar_transport::{
    ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport,
    TransportError,
};

/// Everything a console front end usually needs.
pub mod prelude {
    pub use crate::{
        ApiRequest, ApiResponse, Console, ConsoleBuilder, ConsoleConfig,
        NavigationDecision, NavigationGuard, RegistrarError, RouteAccess,
        RouteConfig, Secret, SessionGateway, SessionSnapshot, init_tracing,
    };
}
