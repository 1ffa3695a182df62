//! A single route: request schema, response schema, and its wire path.

use std::fmt;
use std::sync::Arc;

use crate::schema::Schema;

/// Prefix under which every route is mounted.
pub const API_PREFIX: &str = "/api/";

/// A named pair of validators.
#[derive(Clone)]
pub struct Route {
    accepts: Arc<dyn Schema>,
    returns: Arc<dyn Schema>,
}

impl Route {
    pub fn new(accepts: Arc<dyn Schema>, returns: Arc<dyn Schema>) -> Self {
        Self { accepts, returns }
    }

    /// Schema the request body must satisfy.
    pub fn accepts(&self) -> &dyn Schema {
        self.accepts.as_ref()
    }

    /// Schema the handler's return value is declared to satisfy.
    pub fn returns(&self) -> &dyn Schema {
        self.returns.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("accepts", &self.accepts.describe())
            .field("returns", &self.returns.describe())
            .finish()
    }
}

/// Create a new route from a request and a response schema.
pub fn route<A, R>(accepts: A, returns: R) -> Route
where
    A: Schema + 'static,
    R: Schema + 'static,
{
    Route::new(Arc::new(accepts), Arc::new(returns))
}

/// Strip every leading `/` from a route name.
pub fn normalize_route(name: &str) -> &str {
    name.trim_start_matches('/')
}

/// Wire path for a route name, e.g. `/greet` → `/api/greet`.
pub fn api_path(name: &str) -> String {
    format!("{}{}", API_PREFIX, normalize_route(name))
}
