//! API declaration: named routes and the registry shared by server and client.
//!
//! # Data Flow
//! ```text
//! route(accepts, returns) → Route
//! ApiDefinition::new().route(name, Route)...
//!     → define_api (identity anchor)
//!     → Arc<ApiDefinition> shared read-only by ApiServer and ApiClient
//! ```
//!
//! # Design Decisions
//! - Registry is immutable once built; server and client built from the same
//!   definition agree on every route
//! - Route names are looked up exactly as declared; only the wire path is
//!   normalized

pub mod registry;
pub mod route;

pub use registry::{define_api, ApiDefinition};
pub use route::{api_path, normalize_route, route, Route};
