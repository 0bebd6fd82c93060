//! Session management for the Registrar console.
//!
//! This crate owns the access-token lifecycle of a signed-in console user:
//!
//! 1. **Authenticated requests**: every API call goes through
//!    [`SessionGateway::authenticated_request`], which recovers from an
//!    expired access token by refreshing once and retrying once.
//! 2. **Refresh coordination**: however many calls hit a 401 at the same
//!    moment, only one refresh request goes out; everyone shares its
//!    outcome.
//! 3. **Freshness for navigation**: [`SessionGateway::ensure_session_fresh`]
//!    refreshes ahead of expiry (see [`SessionConfig::safety_margin`]) and
//!    resolves the username when it's unknown.
//!
//! # How it fits in the stack
//!
//! ```text
//! Console / navigation (above)  ← asks the gateway before every route change
//!     ↕
//! Session Layer (this crate)    ← session state, refresh, retry-on-401
//!     ↕
//! Protocol Layer (below)        ← endpoint schemas, Username, Timestamp
//!     ↕
//! Transport Layer (below)       ← HttpTransport, ApiRequest, ApiResponse
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use registrar_session::{SessionConfig, SessionGateway};
//! use registrar_transport::{ApiRequest, ReqwestTransport};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestTransport::new("https://records.example.edu")?;
//! let gateway = SessionGateway::new(transport, SessionConfig::default());
//!
//! gateway.ensure_session_fresh().await?;
//! let students = gateway
//!     .authenticated_request(ApiRequest::get("/api/students"))
//!     .await?;
//! println!("status {}", students.status());
//! # Ok(())
//! # }
//! ```

mod auth;
mod clock;
mod error;
mod flight;
mod gateway;
mod state;

pub use auth::AuthClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SessionError;
pub use gateway::{SessionGateway, SessionWatch};
pub use state::{SessionConfig, SessionSnapshot};

pub(crate) use state::SessionState;
