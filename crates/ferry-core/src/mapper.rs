use tonic::Code;

use crate::failure::Failure;
use crate::status::StructuredStatus;

/// Message reported in place of the detail of unexpected failures
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Map a failure onto the status reported to the client
///
/// Total and deterministic. Handler statuses pass through untouched,
/// malformed input becomes `InvalidArgument` with the decoder's message, and
/// everything else becomes `Internal` with a generic message. The
/// suppressed detail is logged here.
pub fn map_failure(failure: Failure) -> StructuredStatus {
    match failure {
        Failure::MalformedInput(message) => StructuredStatus::new(Code::InvalidArgument, message),
        Failure::Status(status) => status,
        Failure::Serialization(e) => {
            tracing::error!(error = %e, "failed to serialize handler payload");
            StructuredStatus::new(Code::Internal, INTERNAL_MESSAGE)
        }
        Failure::Unexpected(e) => {
            tracing::error!(error = ?e, "handler failed unexpectedly");
            StructuredStatus::new(Code::Internal, INTERNAL_MESSAGE)
        }
    }
}
