//! Typed JSON-over-HTTP RPC.
//!
//! Declare routes once (request schema + response schema), then build an
//! [`ApiServer`] that dispatches validated `POST /api/<route>` bodies to
//! handlers and an [`ApiClient`] that calls them.

// Declaration
pub mod api;
pub mod schema;

// Server and client
pub mod client;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub mod demo;

pub use api::{define_api, route, ApiDefinition, Route};
pub use client::{ApiClient, ClientError, Origin, OriginResolver};
pub use config::ApiConfig;
pub use http::{ApiRequest, ApiServer, Envelope, ServerError};
pub use lifecycle::Shutdown;
pub use schema::{JsonSchema, Schema, SchemaError, Typed};
