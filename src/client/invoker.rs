//! Typed calls against an API server.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::api::{api_path, ApiDefinition};
use crate::client::origin::OriginResolver;
use crate::config::ClientConfig;
use crate::http::envelope::Envelope;

/// Errors surfaced by [`ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The route is not declared in the API definition.
    #[error("client tried to request non existent route '{0}'")]
    UnknownRoute(String),

    /// No base URL was given and no origin could be resolved.
    #[error("a base url is required when no origin is available")]
    MissingBaseUrl,

    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to serialize parameters: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The HTTP call itself failed.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server's reply is not a response envelope.
    #[error("invalid response envelope (status {status}): {source}")]
    InvalidEnvelope {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The server answered with `success: false`.
    #[error("{0}")]
    Remote(String),

    /// The envelope's data does not decode into the expected type.
    #[error("failed to decode response data: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Client for an API definition.
#[derive(Clone)]
pub struct ApiClient {
    api: Arc<ApiDefinition>,
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client. `base_url` is required since no origin resolver is
    /// given; use [`ApiClient::builder`] to supply one.
    pub fn new(
        api: impl Into<Arc<ApiDefinition>>,
        base_url: Option<&str>,
    ) -> Result<Self, ClientError> {
        let mut builder = Self::builder(api);
        if let Some(base_url) = base_url {
            builder = builder.base_url(base_url);
        }
        builder.build()
    }

    pub fn from_config(
        api: impl Into<Arc<ApiDefinition>>,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        Self::new(api, config.base_url.as_deref())
    }

    pub fn builder(api: impl Into<Arc<ApiDefinition>>) -> ApiClientBuilder {
        ApiClientBuilder {
            api: api.into(),
            base_url: None,
            resolver: None,
            http: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a declared route. Fails without any network activity when
    /// the route is unknown.
    pub fn route(&self, name: &str) -> Result<RouteCall<'_>, ClientError> {
        if !self.api.contains(name) {
            return Err(ClientError::UnknownRoute(name.to_string()));
        }

        Ok(RouteCall {
            client: self,
            name: name.to_string(),
            url: format!("{}{}", self.base_url, api_path(name)),
        })
    }

    /// Call a route with typed parameters and result.
    pub async fn fetch<Req, Res>(&self, name: &str, parameters: &Req) -> Result<Res, ClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.route(name)?.send(parameters).await
    }

    /// Call a route with raw JSON parameters and result.
    pub async fn fetch_value(&self, name: &str, parameters: Value) -> Result<Value, ClientError> {
        self.route(name)?.send_value(parameters).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("routes", &self.api.len())
            .finish()
    }
}

/// A pending call to one declared route.
#[derive(Debug)]
pub struct RouteCall<'a> {
    client: &'a ApiClient,
    name: String,
    url: String,
}

impl RouteCall<'_> {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn send<Req, Res>(self, parameters: &Req) -> Result<Res, ClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let parameters = serde_json::to_value(parameters).map_err(ClientError::Serialize)?;
        let data = self.send_value(parameters).await?;
        serde_json::from_value(data).map_err(ClientError::Decode)
    }

    pub async fn send_value(self, parameters: Value) -> Result<Value, ClientError> {
        tracing::debug!(route = %self.name, url = %self.url, "Calling route");

        let response = self
            .client
            .http
            .post(&self.url)
            .json(&parameters)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        let envelope: Envelope = serde_json::from_slice(&body).map_err(|source| {
            ClientError::InvalidEnvelope {
                status: status.as_u16(),
                source,
            }
        })?;

        match envelope {
            Envelope::Success(data) => Ok(data),
            Envelope::Failure(error) => {
                tracing::debug!(route = %self.name, status = %status, error = %error, "Route call failed");
                Err(ClientError::Remote(error))
            }
        }
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    api: Arc<ApiDefinition>,
    base_url: Option<String>,
    resolver: Option<Arc<dyn OriginResolver>>,
    http: Option<reqwest::Client>,
}

impl ApiClientBuilder {
    /// Where the server is located, e.g. `http://localhost:3000`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Origin used when no base URL is set.
    pub fn origin_resolver(mut self, resolver: impl OriginResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientError> {
        let raw = match self.base_url {
            Some(base_url) => base_url,
            None => self
                .resolver
                .and_then(|resolver| resolver.origin())
                .map(|origin| origin.to_string())
                .ok_or(ClientError::MissingBaseUrl)?,
        };

        let parsed = Url::parse(&raw).map_err(|e| ClientError::InvalidBaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
                url: raw,
            });
        }

        Ok(ApiClient {
            api: self.api,
            base_url: raw.trim_end_matches('/').to_string(),
            http: self.http.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::route;
    use crate::client::origin::Origin;
    use crate::schema::Any;
    use serde_json::json;

    fn api() -> ApiDefinition {
        ApiDefinition::new().route("//greet", route(Any, Any))
    }

    #[test]
    fn test_base_url_required_without_origin() {
        assert!(matches!(ApiClient::new(api(), None), Err(ClientError::MissingBaseUrl)));

        let unresolved = ApiClient::builder(api())
            .origin_resolver(|| -> Option<Origin> { None })
            .build();
        assert!(matches!(unresolved, Err(ClientError::MissingBaseUrl)));
    }

    #[test]
    fn test_base_url_from_origin() {
        let client = ApiClient::builder(api())
            .origin_resolver(Origin::new("https", "example.com", Some(8443)))
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://example.com:8443");
    }

    #[test]
    fn test_explicit_base_url_wins_and_is_trimmed() {
        let client = ApiClient::builder(api())
            .base_url("http://localhost:3000/")
            .origin_resolver(Origin::new("https", "example.com", None))
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(
            client.route("//greet").unwrap().url(),
            "http://localhost:3000/api/greet"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new(api(), Some("not a url")),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            ApiClient::new(api(), Some("ftp://host")),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_route_fails_before_io() {
        // Nothing listens on the discard port; an attempted call would be a transport error.
        let client = ApiClient::new(api(), Some("http://127.0.0.1:9")).unwrap();

        assert!(matches!(client.route("/missing"), Err(ClientError::UnknownRoute(_))));
        let err = client.fetch_value("/missing", json!({})).await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownRoute(ref name) if name == "/missing"));
        assert_eq!(err.to_string(), "client tried to request non existent route '/missing'");
    }
}
