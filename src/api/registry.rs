//! Ordered route registry.

use indexmap::IndexMap;

use crate::api::route::Route;

/// Ordered mapping from route name to [`Route`].
#[derive(Debug, Clone, Default)]
pub struct ApiDefinition {
    routes: IndexMap<String, Route>,
}

impl ApiDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. A later declaration with the same name replaces the earlier one.
    pub fn route(mut self, name: impl Into<String>, route: Route) -> Self {
        self.routes.insert(name.into(), route);
        self
    }

    /// Look up a route by its declared name.
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Route names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Route)> {
        self.routes.iter().map(|(name, route)| (name.as_str(), route))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Route)> for ApiDefinition {
    fn from_iter<I: IntoIterator<Item = (S, Route)>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().map(|(n, r)| (n.into(), r)).collect(),
        }
    }
}

/// Define a new API. Returns its argument unchanged so that server and
/// client can be built from one canonical declaration.
pub fn define_api(api: ApiDefinition) -> ApiDefinition {
    api
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::route::route;
    use crate::schema::Any;

    #[test]
    fn test_declaration_order_and_lookup() {
        let api = define_api(
            ApiDefinition::new()
                .route("/auth", route(Any, Any))
                .route("/greet", route(Any, Any)),
        );

        assert_eq!(api.names().collect::<Vec<_>>(), vec!["/auth", "/greet"]);
        assert!(api.contains("/greet"));
        assert!(!api.contains("greet"));
        assert!(api.get("/missing").is_none());
        assert_eq!(api.len(), 2);
    }

    #[test]
    fn test_from_iter() {
        let api: ApiDefinition = vec![("/a", route(Any, Any))].into_iter().collect();
        assert!(api.contains("/a"));
        assert!(!api.is_empty());
    }
}
