//! Wire protocol for the Registrar console's auth service.
//!
//! This crate defines what the console and the auth service say to each
//! other:
//!
//! - **Schemas** ([`v1`]): one explicit request/response type per
//!   endpoint, plus the [`Endpoint`] table of paths and methods.
//! - **Identity types** ([`Username`], [`Timestamp`], [`Secret`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes ⇄ values, with
//!   schema validation on the way in.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (ApiResponse bytes) → Protocol (validated schema) → Session (state)
//! ```

mod codec;
mod error;
mod types;
mod validate;
pub mod v1;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Secret, Timestamp, Username};
pub use v1::Endpoint;
pub use validate::Validate;
