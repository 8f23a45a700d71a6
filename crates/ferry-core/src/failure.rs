use thiserror::Error;
use tonic::Code;

use crate::json::SerializeError;
use crate::status::StructuredStatus;

/// Failure raised by a handler or while encoding/decoding its payloads
///
/// A failure is consumed exactly once, by the error policy of the call that
/// raised it.
#[derive(Debug, Error)]
pub enum Failure {
    /// Request body could not be decoded into the expected shape
    #[error("{0}")]
    MalformedInput(String),

    /// Handler raised a structured status of its own
    #[error("{0}")]
    Status(StructuredStatus),

    /// A payload could not be rendered as JSON
    #[error("serialization failed: {0}")]
    Serialization(#[from] SerializeError),

    /// Anything else the handler raised
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Discriminant of a [`Failure`], used as a log field and metric attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    MalformedInput,
    HandlerStatus,
    Serialization,
    Unexpected,
}

impl Failure {
    /// Malformed-input failure with the decoder's message
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    /// Handler status failure without details
    pub fn status(code: Code, message: impl Into<String>) -> Self {
        Self::Status(StructuredStatus::new(code, message))
    }

    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::MalformedInput(_) => FailureKind::MalformedInput,
            Self::Status(_) => FailureKind::HandlerStatus,
            Self::Serialization(_) => FailureKind::Serialization,
            Self::Unexpected(_) => FailureKind::Unexpected,
        }
    }
}

impl From<StructuredStatus> for Failure {
    fn from(status: StructuredStatus) -> Self {
        Self::Status(status)
    }
}

impl From<tonic::Status> for Failure {
    fn from(status: tonic::Status) -> Self {
        Self::Status(status.into())
    }
}
