//! Client side of the API: typed calls against a server built from the
//! same definition.
//!
//! # Data Flow
//! ```text
//! ApiClient::fetch(name, params)
//!     → registry lookup (fails before any I/O)
//!     → POST <base_url>/api/<route> with JSON body
//!     → decode envelope → data or ClientError::Remote
//! ```
//!
//! # Design Decisions
//! - Base URL is explicit or comes from an injected OriginResolver
//! - No client-side validation, retries or timeouts: one call per fetch

pub mod invoker;
pub mod origin;

pub use invoker::{ApiClient, ApiClientBuilder, ClientError};
pub use origin::{Origin, OriginResolver};
