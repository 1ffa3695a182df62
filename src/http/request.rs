//! Request normalization.
//!
//! # Responsibilities
//! - Capture method, path, query string and headers from the transport
//! - Parse the query string into a key/value map
//! - Expose headers with lower-cased keys and case-insensitive lookup
//! - Generate a request ID (UUID v4) for every incoming request
//!
//! # Design Decisions
//! - Query values are taken verbatim (no percent-decoding)
//! - Duplicate query keys and duplicate headers: last one wins
//! - Header values that are not valid UTF-8 are decoded lossily

use std::collections::HashMap;

use axum::http::{request::Parts, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request metadata captured before the body is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    /// Path of the request, without the query string.
    pub url: String,
    pub query_string: String,
    /// Headers keyed by lower-cased name.
    pub headers: HashMap<String, String>,
}

impl RequestHead {
    pub fn from_parts(parts: &Parts) -> Self {
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Self {
            method: parts.method.as_str().to_string(),
            url: parts.uri.path().to_string(),
            query_string: parts.uri.query().unwrap_or_default().to_string(),
            headers,
        }
    }
}

/// A normalized request handed to route handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest<T> {
    /// The request headers, keyed by lower-cased name.
    pub headers: HashMap<String, String>,
    /// The query extracted from the url.
    /// eg.: `?name=world&test` -> `{ name: "world", test: "" }`
    pub query: HashMap<String, String>,
    /// The request body, validated against the route's schema.
    pub body: T,
    /// The method of the request.
    pub method: String,
    /// The path of the request, eg.: `/api/test`.
    pub url: String,
}

impl<T> ApiRequest<T> {
    pub fn new(head: RequestHead, body: T) -> Self {
        Self {
            query: parse_query(&head.query_string),
            headers: head.headers,
            body,
            method: head.method,
            url: head.url,
        }
    }

    /// Get a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The ID assigned to this request by the server.
    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    /// Replace the body, keeping the rest of the request.
    pub fn try_map_body<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<ApiRequest<U>, E> {
        Ok(ApiRequest {
            headers: self.headers,
            query: self.query,
            body: f(self.body)?,
            method: self.method,
            url: self.url,
        })
    }
}

/// Parse `key=value&flag` style query strings.
///
/// Parts without `=` map to an empty string, empty parts are skipped and a
/// later duplicate key overwrites an earlier one. For `a=b=c` the value is
/// `b`: only the segment between the first and second `=` is kept.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut parsed = HashMap::new();

    for part in query.split('&').filter(|part| !part.is_empty()) {
        let mut segments = part.split('=');
        let name = segments.next().unwrap_or_default();
        let value = segments.next().unwrap_or_default();
        parsed.insert(name.to_string(), value.to_string());
    }

    parsed
}

/// Request ID generator backed by UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}
