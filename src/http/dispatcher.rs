//! Per-route request pipeline.
//!
//! # Responsibilities
//! - Read the body, parse JSON, validate against the route's request schema
//! - Decode the validated value into the handler's request type
//! - Invoke the handler and wrap its value in a success envelope
//! - Write exactly one reply, unless the client has gone away
//!
//! # Design Decisions
//! - The pipeline runs on its own task: a disconnect never cancels a
//!   running handler, it only suppresses the final write
//! - Parse and validation failures become 400 envelopes with fixed messages;
//!   schema diagnostics go to the debug log only
//! - Response schemas are checked only when `validate_responses` is set

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::Stream;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::api::Route;
use crate::http::body::{accumulate, AbortFlag, BodyOutcome};
use crate::http::envelope::{Reply, RESPONSE_VALIDATION_FAILED};
use crate::http::request::{ApiRequest, RequestHead};
use crate::observability::metrics;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Why a handler call did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum HandlerFailure {
    /// The validated body does not decode into the handler's request type.
    #[error("request body does not match handler type: {0}")]
    InvalidBody(#[source] serde_json::Error),

    /// The handler's return value could not be serialized.
    #[error("failed to serialize handler result: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Handler with its request and response types erased to JSON values.
pub trait ErasedHandler: Send + Sync {
    fn call(&self, request: ApiRequest<Value>) -> BoxFuture<Result<Value, HandlerFailure>>;
}

/// Adapts a typed async function to [`ErasedHandler`].
pub struct TypedHandler<F, Req, Res> {
    f: F,
    _marker: PhantomData<fn(Req) -> Res>,
}

impl<F, Req, Res> TypedHandler<F, Req, Res> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(ApiRequest<Req>) -> Fut,
        Fut: Future<Output = Res>,
    {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, Fut, Req, Res> ErasedHandler for TypedHandler<F, Req, Res>
where
    F: Fn(ApiRequest<Req>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Res> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Res: Serialize + Send + 'static,
{
    fn call(&self, request: ApiRequest<Value>) -> BoxFuture<Result<Value, HandlerFailure>> {
        let request = match request.try_map_body(serde_json::from_value::<Req>) {
            Ok(request) => request,
            Err(e) => return Box::pin(async move { Err(HandlerFailure::InvalidBody(e)) }),
        };

        let pending = (self.f)(request);
        Box::pin(async move {
            let returned = pending.await;
            serde_json::to_value(returned).map_err(HandlerFailure::Serialize)
        })
    }
}

/// Write side of a request: one reply, skipped once the client aborted.
#[derive(Debug)]
pub struct ResponseSink {
    tx: oneshot::Sender<Reply>,
    abort: AbortFlag,
}

impl ResponseSink {
    pub fn channel(abort: AbortFlag) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx, abort }, rx)
    }

    pub fn abort_flag(&self) -> &AbortFlag {
        &self.abort
    }

    /// Deliver the reply. Returns false when the write was suppressed.
    pub fn write(self, reply: Reply) -> bool {
        if self.abort.is_aborted() {
            return false;
        }
        self.tx.send(reply).is_ok()
    }
}

/// A route bound to its implementation.
pub struct Endpoint {
    name: String,
    route: Route,
    handler: Arc<dyn ErasedHandler>,
    validate_responses: bool,
}

impl Endpoint {
    pub fn new(
        name: impl Into<String>,
        route: Route,
        handler: Arc<dyn ErasedHandler>,
        validate_responses: bool,
    ) -> Self {
        Self {
            name: name.into(),
            route,
            handler,
            validate_responses,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry point from the HTTP server.
    pub async fn dispatch(self: Arc<Self>, request: Request) -> Response {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let head = RequestHead::from_parts(&parts);

        let abort = AbortFlag::new();
        let guard = abort.guard();
        let (sink, written) = ResponseSink::channel(abort.clone());

        let endpoint = self.clone();
        tokio::spawn(
            async move {
                endpoint.process(head, body.into_data_stream(), sink).await;
            }
            .instrument(tracing::Span::current()),
        );

        let reply = written.await;
        guard.disarm();

        match reply {
            Ok(reply) => {
                metrics::record_request(&self.name, reply.status().as_u16(), start);
                reply.into_response()
            }
            // Body stream failed. If the client is gone this write goes nowhere;
            // otherwise it is a broken framing and gets a proper envelope.
            Err(_) if abort.is_aborted() => {
                let reply = Reply::malformed();
                metrics::record_request(&self.name, reply.status().as_u16(), start);
                reply.into_response()
            }
            Err(_) => {
                tracing::error!(route = %self.name, "Request pipeline ended without a reply");
                let reply = Reply::internal_error();
                metrics::record_request(&self.name, reply.status().as_u16(), start);
                reply.into_response()
            }
        }
    }

    /// Accumulate the body, then respond through the sink.
    pub async fn process<S, E>(&self, head: RequestHead, body: S, sink: ResponseSink)
    where
        S: Stream<Item = Result<Bytes, E>>,
    {
        let bytes = match accumulate(body, sink.abort_flag()).await {
            BodyOutcome::Complete(bytes) => bytes,
            BodyOutcome::Aborted => return,
        };

        let reply = self.respond(head, &bytes).await;
        sink.write(reply);
    }

    /// Turn a complete body into a reply.
    pub async fn respond(&self, head: RequestHead, body: &[u8]) -> Reply {
        let decoded = String::from_utf8_lossy(body);
        let text = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(route = %self.name, error = %e, "Malformed request body");
                return Reply::malformed();
            }
        };

        if let Err(e) = self.route.accepts().validate(&value) {
            tracing::debug!(route = %self.name, error = %e, "Request body failed validation");
            return Reply::invalid();
        }

        let data = match self.handler.call(ApiRequest::new(head, value)).await {
            Ok(data) => data,
            Err(e @ HandlerFailure::InvalidBody(_)) => {
                tracing::debug!(route = %self.name, error = %e, "Request body failed validation");
                return Reply::invalid();
            }
            Err(e @ HandlerFailure::Serialize(_)) => {
                tracing::error!(route = %self.name, error = %e, "Handler returned an unserializable value");
                return Reply::internal_error();
            }
        };

        if self.validate_responses {
            if let Err(e) = self.route.returns().validate(&data) {
                tracing::error!(route = %self.name, error = %e, "Handler result failed response validation");
                return Reply::failure(StatusCode::INTERNAL_SERVER_ERROR, RESPONSE_VALIDATION_FAILED);
            }
        }

        Reply::success(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::route;
    use crate::http::envelope::{Envelope, MALFORMED_BODY, VALIDATION_FAILED};
    use crate::schema::Typed;
    use futures_util::stream;
    use serde::Deserialize;
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize)]
    struct Greet {
        name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Message {
        msg: String,
    }

    fn greet_endpoint(calls: Arc<AtomicUsize>, validate_responses: bool) -> Endpoint {
        let handler = TypedHandler::new(move |req: ApiRequest<Greet>| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let name = req.body.name.unwrap_or_else(|| "World".to_string());
                Message { msg: format!("Hello, {}!", name) }
            }
        });
        Endpoint::new(
            "/greet",
            route(Typed::<Greet>::new(), Typed::<Message>::new()),
            Arc::new(handler),
            validate_responses,
        )
    }

    fn chunked(body: &'static str) -> impl Stream<Item = Result<Bytes, io::Error>> {
        stream::iter(body.as_bytes().chunks(3).map(|c| Ok(Bytes::copy_from_slice(c))).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_success_reply() {
        let endpoint = greet_endpoint(Arc::new(AtomicUsize::new(0)), false);
        let reply = endpoint
            .respond(RequestHead::default(), br#"{"name":"Swift Api"}"#)
            .await;

        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(reply.envelope(), &Envelope::Success(json!({"msg": "Hello, Swift Api!"})));
    }

    #[tokio::test]
    async fn test_malformed_body_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let endpoint = greet_endpoint(calls.clone(), false);

        let reply = endpoint.respond(RequestHead::default(), b"not json").await;
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
        assert_eq!(reply.envelope(), &Envelope::Failure(MALFORMED_BODY.into()));

        let reply = endpoint.respond(RequestHead::default(), b"").await;
        assert_eq!(reply.envelope(), &Envelope::Failure(MALFORMED_BODY.into()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_schema_mismatch_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let endpoint = greet_endpoint(calls.clone(), false);

        let reply = endpoint.respond(RequestHead::default(), br#"{"name": 5}"#).await;
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
        assert_eq!(reply.envelope(), &Envelope::Failure(VALIDATION_FAILED.into()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_byte_order_mark_is_ignored() {
        let endpoint = greet_endpoint(Arc::new(AtomicUsize::new(0)), false);
        let reply = endpoint
            .respond(RequestHead::default(), "\u{feff}{}".as_bytes())
            .await;
        assert_eq!(reply.envelope(), &Envelope::Success(json!({"msg": "Hello, World!"})));
    }

    #[tokio::test]
    async fn test_response_validation_opt_in() {
        let handler = TypedHandler::new(|_req: ApiRequest<Value>| async { json!({"wrong": true}) });
        let unchecked = Endpoint::new(
            "/greet",
            route(Typed::<Value>::new(), Typed::<Message>::new()),
            Arc::new(handler),
            false,
        );
        let reply = unchecked.respond(RequestHead::default(), b"{}").await;
        assert_eq!(reply.status(), StatusCode::OK);

        let handler = TypedHandler::new(|_req: ApiRequest<Value>| async { json!({"wrong": true}) });
        let checked = Endpoint::new(
            "/greet",
            route(Typed::<Value>::new(), Typed::<Message>::new()),
            Arc::new(handler),
            true,
        );
        let reply = checked.respond(RequestHead::default(), b"{}").await;
        assert_eq!(reply.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.envelope(), &Envelope::Failure(RESPONSE_VALIDATION_FAILED.into()));
    }

    #[tokio::test]
    async fn test_process_writes_once() {
        let endpoint = greet_endpoint(Arc::new(AtomicUsize::new(0)), false);
        let (sink, written) = ResponseSink::channel(AbortFlag::new());

        endpoint
            .process(RequestHead::default(), chunked(r#"{"name":"chunks"}"#), sink)
            .await;

        let reply = written.await.unwrap();
        assert_eq!(reply.envelope(), &Envelope::Success(json!({"msg": "Hello, chunks!"})));
    }

    #[tokio::test]
    async fn test_abort_before_last_chunk() {
        let calls = Arc::new(AtomicUsize::new(0));
        let endpoint = greet_endpoint(calls.clone(), false);
        let (sink, written) = ResponseSink::channel(AbortFlag::new());

        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"name\"")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        endpoint.process(RequestHead::default(), body, sink).await;

        assert!(written.await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abort_during_handler_suppresses_write() {
        let abort = AbortFlag::new();
        let flag = abort.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let handler = TypedHandler::new(move |_req: ApiRequest<Value>| {
            let flag = flag.clone();
            let counter = counter.clone();
            async move {
                flag.abort();
                counter.fetch_add(1, Ordering::SeqCst);
                json!("done")
            }
        });
        let endpoint = Endpoint::new(
            "/slow",
            route(Typed::<Value>::new(), Typed::<Value>::new()),
            Arc::new(handler),
            false,
        );

        let (sink, written) = ResponseSink::channel(abort);
        endpoint.process(RequestHead::default(), chunked("{}"), sink).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(written.await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_dispatch_does_not_cancel_handler() {
        let (started_tx, mut started) = tokio::sync::mpsc::unbounded_channel();
        let (done_tx, mut done) = tokio::sync::mpsc::unbounded_channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let handler = TypedHandler::new(move |_req: ApiRequest<Value>| {
            let started_tx = started_tx.clone();
            let done_tx = done_tx.clone();
            let counter = counter.clone();
            async move {
                let _ = started_tx.send(());
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = done_tx.send(());
                Value::Null
            }
        });
        let endpoint = Arc::new(Endpoint::new(
            "/slow",
            route(Typed::<Value>::new(), Typed::<Value>::new()),
            Arc::new(handler),
            false,
        ));

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/slow")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let transport = tokio::spawn(endpoint.dispatch(request));

        started.recv().await.unwrap();
        transport.abort();
        assert!(transport.await.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::timeout(std::time::Duration::from_secs(2), done.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
