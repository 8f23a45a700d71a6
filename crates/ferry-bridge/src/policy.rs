use ferry_core::{Failure, JsonPrinter, SerializeError, StatusSerializer, http_status, map_failure};
use http::StatusCode;
use http::header::CONTENT_TYPE;

use crate::APPLICATION_JSON;
use crate::unary::PendingUnaryResponse;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Decides how a handler failure reaches the HTTP client
///
/// The two operations can be customised independently. Transport-level
/// cancellation never reaches a policy.
pub trait ErrorPolicy: Send + Sync {
    /// Terminate `pending` for a failed unary call
    ///
    /// Must complete or cancel `pending` exactly once. A policy that returns
    /// with the response still pending has it cancelled for it.
    fn on_unary_failure(&self, failure: Failure, pending: &mut PendingUnaryResponse);

    /// Produce the item appended to a stream that failed mid-flight
    ///
    /// `Ok(None)` closes the stream without a final item. The returned text
    /// is written as exactly one item; under newline-delimited framing its
    /// line breaks are replaced by spaces, so it should be single-line JSON.
    ///
    /// # Errors
    ///
    /// Returns an error only if no representation of the failure can be
    /// produced at all. The call is then aborted without a final item.
    fn on_stream_failure(&self, failure: Failure) -> Result<Option<String>, SerializeError>;
}

/// Reports failures as JSON `google.rpc.Status` bodies
///
/// Malformed input on a unary call short-circuits to `400 Bad Request` with
/// the decoder's message as a plain-text body. Streamed error items always
/// use the single-line form of the printer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorPolicy {
    unary: StatusSerializer,
    stream: StatusSerializer,
}

impl DefaultErrorPolicy {
    pub const fn new(printer: JsonPrinter) -> Self {
        Self {
            unary: StatusSerializer::new(printer),
            stream: StatusSerializer::new(printer.compact()),
        }
    }
}

impl ErrorPolicy for DefaultErrorPolicy {
    fn on_unary_failure(&self, failure: Failure, pending: &mut PendingUnaryResponse) {
        if let Failure::MalformedInput(message) = failure {
            pending.complete((StatusCode::BAD_REQUEST, [(CONTENT_TYPE, TEXT_PLAIN)], message));
            return;
        }

        let status = map_failure(failure);

        match self.unary.serialize(&status) {
            Ok(body) => {
                pending.complete((http_status(status.code()), [(CONTENT_TYPE, APPLICATION_JSON)], body));
            }
            Err(e) => {
                tracing::error!(error = %e, code = ?status.code(), "failed to serialize error status; aborting call");
                pending.cancel();
            }
        }
    }

    fn on_stream_failure(&self, failure: Failure) -> Result<Option<String>, SerializeError> {
        let status = map_failure(failure);
        self.stream.serialize(&status).map(Some)
    }
}
