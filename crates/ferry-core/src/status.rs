use std::fmt;

use prost::Message;
use tonic::Code;

/// Typed detail payload attached to a status
pub use prost_types::Any;

/// Canonical RPC error value: a code, a message and typed detail payloads
///
/// Values are immutable once built. The only supported transform is
/// [`StructuredStatus::without_details`], which returns a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredStatus {
    code: Code,
    message: String,
    details: Vec<Any>,
}

/// Wire shape of `google.rpc.Status`, carried in `grpc-status-details-bin`
#[derive(Clone, PartialEq, Message)]
struct RpcStatus {
    #[prost(int32, tag = "1")]
    code: i32,
    #[prost(string, tag = "2")]
    message: String,
    #[prost(message, repeated, tag = "3")]
    details: Vec<Any>,
}

impl StructuredStatus {
    /// Build a status without details
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Build a status carrying typed detail payloads
    pub fn with_details(code: Code, message: impl Into<String>, details: Vec<Any>) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    pub const fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[Any] {
        &self.details
    }

    /// Copy of this status with the detail list cleared
    #[must_use]
    pub fn without_details(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            details: Vec::new(),
        }
    }

    /// Binary `google.rpc.Status` encoding of this value
    pub fn encode_proto(&self) -> Vec<u8> {
        RpcStatus {
            code: self.code as i32,
            message: self.message.clone(),
            details: self.details.clone(),
        }
        .encode_to_vec()
    }

    /// Decode a binary `google.rpc.Status`
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoding
    pub fn decode_proto(bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        let raw = RpcStatus::decode(bytes)?;

        Ok(Self {
            code: Code::from_i32(raw.code),
            message: raw.message,
            details: raw.details,
        })
    }
}

impl From<&tonic::Status> for StructuredStatus {
    fn from(status: &tonic::Status) -> Self {
        let details = if status.details().is_empty() {
            Vec::new()
        } else {
            match RpcStatus::decode(status.details()) {
                Ok(raw) => raw.details,
                Err(e) => {
                    tracing::debug!(error = %e, "dropping undecodable status details");
                    Vec::new()
                }
            }
        };

        Self::with_details(status.code(), status.message(), details)
    }
}

impl From<tonic::Status> for StructuredStatus {
    fn from(status: tonic::Status) -> Self {
        Self::from(&status)
    }
}

impl fmt::Display for StructuredStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.code.description())
        } else {
            write!(f, "{}: {}", self.code.description(), self.message)
        }
    }
}
