//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/<route>
//!     → server.rs (axum router, request ID, tracing)
//!     → request.rs (method, path, query, headers)
//!     → body.rs (accumulate chunks, watch for abort)
//!     → dispatcher.rs (parse, validate, invoke handler)
//!     → envelope.rs ({success, data | error})
//!     → Send to client (unless aborted)
//! ```

pub mod body;
pub mod dispatcher;
pub mod envelope;
pub mod request;
pub mod server;

pub use envelope::{Envelope, Reply};
pub use request::{ApiRequest, RequestHead, X_REQUEST_ID};
pub use server::{ApiServer, ServerError};
