use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use ferry_core::{Failure, JsonPrinter};
use ferry_telemetry::metrics;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::APPLICATION_JSON;
use crate::policy::ErrorPolicy;

/// Terminal state of a unary call
pub enum UnaryOutcome {
    Completed(Response),
    /// Aborted without a response body
    Cancelled,
}

/// Single-use handle for the not-yet-sent response of one unary call
///
/// Exactly one of [`complete`](Self::complete) and [`cancel`](Self::cancel)
/// takes effect. Later calls are logged and ignored.
pub struct PendingUnaryResponse {
    tx: Option<oneshot::Sender<UnaryOutcome>>,
}

/// Receiving half held by the HTTP layer
pub struct UnaryResponse {
    rx: oneshot::Receiver<UnaryOutcome>,
}

impl PendingUnaryResponse {
    pub fn channel() -> (Self, UnaryResponse) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, UnaryResponse { rx })
    }

    pub fn complete(&mut self, response: impl IntoResponse) {
        self.terminate(UnaryOutcome::Completed(response.into_response()));
    }

    pub fn cancel(&mut self) {
        self.terminate(UnaryOutcome::Cancelled);
    }

    pub const fn is_terminal(&self) -> bool {
        self.tx.is_none()
    }

    fn terminate(&mut self, outcome: UnaryOutcome) {
        let Some(tx) = self.tx.take() else {
            tracing::warn!("unary response already terminated; ignoring");
            return;
        };

        if tx.send(outcome).is_err() {
            tracing::debug!("client went away before the unary response was delivered");
        }
    }
}

impl UnaryResponse {
    /// Wait for the call to terminate
    ///
    /// A handle dropped without terminating counts as cancelled.
    pub async fn outcome(self) -> UnaryOutcome {
        self.rx.await.unwrap_or(UnaryOutcome::Cancelled)
    }

    /// Wait for the call to terminate and turn it into an HTTP response
    ///
    /// A cancelled call yields a body that fails after the headers, so the
    /// connection is torn down instead of delivering a well-formed reply.
    pub async fn into_response(self) -> Response {
        match self.outcome().await {
            UnaryOutcome::Completed(response) => response,
            UnaryOutcome::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, aborted_body()).into_response(),
        }
    }
}

fn aborted_body() -> Body {
    Body::from_stream(futures_util::stream::once(async {
        Err::<Bytes, _>(std::io::Error::other("call aborted"))
    }))
}

/// Drives one unary call to exactly one terminal state
pub struct UnaryCallCompleter {
    pending: PendingUnaryResponse,
    policy: Arc<dyn ErrorPolicy>,
    printer: JsonPrinter,
    shape: &'static str,
}

impl UnaryCallCompleter {
    pub fn new(pending: PendingUnaryResponse, policy: Arc<dyn ErrorPolicy>, printer: JsonPrinter) -> Self {
        Self {
            pending,
            policy,
            printer,
            shape: metrics::SHAPE_UNARY,
        }
    }

    /// Attribute failures to a streaming route that failed before its stream started
    #[must_use]
    pub const fn on_streaming_route(mut self) -> Self {
        self.shape = metrics::SHAPE_STREAMING;
        self
    }

    pub const fn is_terminal(&self) -> bool {
        self.pending.is_terminal()
    }

    /// Await the handler and complete the call with its outcome
    pub async fn run<T, F>(mut self, call: F)
    where
        T: Serialize,
        F: Future<Output = Result<T, Failure>>,
    {
        match call.await {
            Ok(payload) => self.on_success(&payload),
            Err(failure) => self.on_failure(failure),
        }
    }

    /// Complete with `200 OK` and the JSON payload
    ///
    /// A payload that cannot be printed is handed to the error policy as a
    /// serialization failure.
    pub fn on_success<T: Serialize + ?Sized>(&mut self, payload: &T) {
        if self.pending.is_terminal() {
            tracing::warn!("unary call already terminated; dropping success payload");
            return;
        }

        match self.printer.print(payload) {
            Ok(body) => self
                .pending
                .complete((StatusCode::OK, [(CONTENT_TYPE, APPLICATION_JSON)], body)),
            Err(e) => self.on_failure(Failure::from(e)),
        }
    }

    /// Hand a failure to the error policy
    pub fn on_failure(&mut self, failure: Failure) {
        let kind = failure.kind();

        if self.pending.is_terminal() {
            tracing::warn!(%kind, "unary call already terminated; ignoring failure");
            return;
        }

        tracing::debug!(%kind, "unary call failed");
        metrics::record_failure(kind.as_ref(), self.shape);

        self.policy.on_unary_failure(failure, &mut self.pending);

        if !self.pending.is_terminal() {
            tracing::error!(%kind, "error policy left the unary response pending; cancelling");
            self.pending.cancel();
        }
    }

    /// Transport-level cancellation; the error policy is not consulted
    pub fn cancel(&mut self) {
        if !self.pending.is_terminal() {
            self.pending.cancel();
        }
    }
}
