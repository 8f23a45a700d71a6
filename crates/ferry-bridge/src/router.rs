use std::future::Future;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::{Router, routing};
use bytes::Bytes;
use ferry_core::Failure;
use futures_util::Stream;
use http::HeaderMap;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::Instrument;

use crate::Bridge;
use crate::framing::Framing;
use crate::streaming::{OutputStream, StreamingCallEmitter};
use crate::unary::{PendingUnaryResponse, UnaryCallCompleter};

/// Builder mounting RPC handlers as `POST` routes
///
/// Request bodies are decoded from JSON; an empty body decodes as `{}`.
///
/// ```ignore
/// let router = RpcRouter::new(bridge)
///     .unary("/v1/greeter/say", |req: HelloRequest| async move { Ok(HelloReply::from(req)) })
///     .server_streaming("/v1/greeter/repeat", |req: RepeatRequest| repeat(req))
///     .into_router();
/// ```
pub struct RpcRouter {
    bridge: Bridge,
    router: Router,
}

impl RpcRouter {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            router: Router::new(),
        }
    }

    /// Mount a request/response handler
    #[must_use]
    pub fn unary<Req, Resp, H, Fut>(mut self, path: &str, handler: H) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        H: Fn(Req) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, Failure>> + Send + 'static,
    {
        let bridge = self.bridge.clone();
        let method: Arc<str> = Arc::from(path);

        self.router = self.router.route(
            path,
            routing::post(move |body: Bytes| {
                let span = tracing::info_span!("rpc", method = %method, shape = "unary");
                serve_unary(bridge.clone(), handler.clone(), body).instrument(span)
            }),
        );

        self
    }

    /// Mount a handler producing a stream of items
    #[must_use]
    pub fn server_streaming<Req, Resp, H, S>(mut self, path: &str, handler: H) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        H: Fn(Req) -> S + Clone + Send + Sync + 'static,
        S: Stream<Item = Result<Resp, Failure>> + Send + 'static,
    {
        let bridge = self.bridge.clone();
        let method: Arc<str> = Arc::from(path);

        self.router = self.router.route(
            path,
            routing::post(move |headers: HeaderMap, body: Bytes| {
                let span = tracing::info_span!("rpc", method = %method, shape = "streaming");
                let framing = Framing::negotiate(&headers);
                serve_streaming(bridge.clone(), handler.clone(), framing, body).instrument(span)
            }),
        );

        self
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

fn decode<Req: DeserializeOwned>(body: &[u8]) -> Result<Req, Failure> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };

    serde_json::from_slice(body).map_err(|e| Failure::malformed(e.to_string()))
}

async fn serve_unary<Req, Resp, H, Fut>(bridge: Bridge, handler: H, body: Bytes) -> Response
where
    Req: DeserializeOwned,
    Resp: Serialize,
    H: Fn(Req) -> Fut,
    Fut: Future<Output = Result<Resp, Failure>>,
{
    let (pending, response) = PendingUnaryResponse::channel();
    let completer = UnaryCallCompleter::new(pending, Arc::clone(bridge.policy()), bridge.printer());

    let call = async move {
        match decode::<Req>(&body) {
            Ok(request) => handler(request).await,
            Err(failure) => Err(failure),
        }
    };

    completer.run(call).await;
    response.into_response().await
}

async fn serve_streaming<Req, Resp, H, S>(bridge: Bridge, handler: H, framing: Framing, body: Bytes) -> Response
where
    Req: DeserializeOwned,
    Resp: Serialize + Send + 'static,
    H: Fn(Req) -> S,
    S: Stream<Item = Result<Resp, Failure>> + Send + 'static,
{
    let request = match decode::<Req>(&body) {
        Ok(request) => request,
        Err(failure) => {
            // Nothing has been sent yet, so the status line can still carry the error
            let (pending, response) = PendingUnaryResponse::channel();
            UnaryCallCompleter::new(pending, Arc::clone(bridge.policy()), bridge.printer())
                .on_streaming_route()
                .on_failure(failure);
            return response.into_response().await;
        }
    };

    let (output, body) = OutputStream::channel(framing, bridge.stream_buffer());
    let emitter = StreamingCallEmitter::new(output, Arc::clone(bridge.policy()), bridge.printer());

    tokio::spawn(emitter.run(handler(request)).in_current_span());

    (
        [(CONTENT_TYPE, framing.content_type()), (CACHE_CONTROL, "no-cache")],
        body,
    )
        .into_response()
}
