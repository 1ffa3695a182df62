//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Bind route implementations to `POST /api/<route>`
//! - Reject handlers for undeclared routes at registration time
//! - Wire up middleware (tracing, request ID)
//! - Bind the listener and serve until shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::Request, routing::post, Router};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::{api_path, ApiDefinition};
use crate::config::ServerConfig;
use crate::http::dispatcher::{Endpoint, TypedHandler};
use crate::http::request::{ApiRequest, UuidRequestId};
use crate::lifecycle::signals::shutdown_signal;

/// Errors raised while configuring or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A handler was registered for a route the API does not declare.
    #[error("cannot implement route '{0}', as it does not exist")]
    UnknownRoute(String),

    /// A handler is already bound to this route's path.
    #[error("route '{0}' is already implemented")]
    AlreadyImplemented(String),

    /// The listener could not be bound.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// HTTP server dispatching validated JSON bodies to route handlers.
pub struct ApiServer {
    api: Arc<ApiDefinition>,
    config: ServerConfig,
    endpoints: IndexMap<String, Arc<Endpoint>>,
}

impl ApiServer {
    /// Create a new server for an API definition with default settings.
    pub fn new(api: impl Into<Arc<ApiDefinition>>) -> Self {
        Self::with_config(api, ServerConfig::default())
    }

    pub fn with_config(api: impl Into<Arc<ApiDefinition>>, config: ServerConfig) -> Self {
        Self {
            api: api.into(),
            config,
            endpoints: IndexMap::new(),
        }
    }

    /// Add an implementation for a route.
    ///
    /// Fails immediately if `name` is not declared in the API or its path is
    /// already implemented.
    pub fn on<Req, Res, F, Fut>(&mut self, name: &str, handler: F) -> Result<&mut Self, ServerError>
    where
        F: Fn(ApiRequest<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Res> + Send + 'static,
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
    {
        let route = self
            .api
            .get(name)
            .ok_or_else(|| ServerError::UnknownRoute(name.to_string()))?
            .clone();

        let path = api_path(name);
        if self.endpoints.contains_key(&path) {
            return Err(ServerError::AlreadyImplemented(name.to_string()));
        }

        let endpoint = Endpoint::new(
            name,
            route,
            Arc::new(TypedHandler::new(handler)),
            self.config.validate_responses,
        );

        tracing::debug!(route = %name, path = %path, "Route implemented");
        self.endpoints.insert(path, Arc::new(endpoint));
        Ok(self)
    }

    /// Names of the routes that have a handler, in registration order.
    pub fn implemented(&self) -> impl Iterator<Item = &str> {
        self.endpoints.values().map(|endpoint| endpoint.name())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the axum router with all middleware layers.
    pub fn into_router(self) -> Router {
        for name in self.api.names() {
            if !self.endpoints.contains_key(&api_path(name)) {
                tracing::warn!(route = %name, "Route declared but not implemented");
            }
        }

        let mut router = Router::new();
        for (path, endpoint) in self.endpoints {
            router = router.route(
                &path,
                post(move |request: Request| endpoint.clone().dispatch(request)),
            );
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Start listening on `port` (or the configured port) until Ctrl+C.
    pub async fn listen(self, port: Option<u16>) -> Result<(), ServerError> {
        self.listen_with(port, |_| {}).await
    }

    /// Like [`ApiServer::listen`], calling `on_listening` once the port is bound.
    pub async fn listen_with<F>(self, port: Option<u16>, on_listening: F) -> Result<(), ServerError>
    where
        F: FnOnce(SocketAddr),
    {
        let port = port.unwrap_or(self.config.port);
        let addr = format!("{}:{}", self.config.host, port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        on_listening(local_addr);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.endpoints.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
