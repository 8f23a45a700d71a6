//! HTTP adapter for RPC-style handlers
//!
//! Unary handlers report failures through the HTTP status line. Streaming
//! handlers have already committed their status line by the time they fail,
//! so failures travel in-band as the last item of the stream. Both paths go
//! through a pluggable [`ErrorPolicy`].

#![allow(clippy::must_use_candidate)]

mod framing;
mod policy;
mod router;
mod streaming;
mod unary;

use std::sync::Arc;

use ferry_config::{JsonConfig, StreamingConfig};
pub use ferry_core::{Code, Failure, FailureKind, JsonPrinter, SerializeError, StructuredStatus};
pub use framing::Framing;
pub use policy::{DefaultErrorPolicy, ErrorPolicy};
pub use router::RpcRouter;
pub use streaming::{OutputStream, StreamClosed, StreamingCallEmitter};
pub use unary::{PendingUnaryResponse, UnaryCallCompleter, UnaryOutcome, UnaryResponse};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Per-process call context shared by every route
///
/// Cheap to clone; all clones share the same policy and printer.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    policy: Arc<dyn ErrorPolicy>,
    printer: JsonPrinter,
    stream_buffer: usize,
}

impl Bridge {
    /// Bridge using the [`DefaultErrorPolicy`]
    pub fn new(printer: JsonPrinter, stream_buffer: usize) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                policy: Arc::new(DefaultErrorPolicy::new(printer)),
                printer,
                stream_buffer: stream_buffer.max(1),
            }),
        }
    }

    pub fn from_config(json: &JsonConfig, streaming: &StreamingConfig) -> Self {
        let printer = JsonPrinter::new()
            .pretty(json.pretty)
            .include_default_fields(json.include_default_fields);

        Self::new(printer, streaming.buffer)
    }

    /// Replace the error policy, keeping printer and buffer settings
    #[must_use]
    pub fn with_policy(self, policy: impl ErrorPolicy + 'static) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                policy: Arc::new(policy),
                printer: self.inner.printer,
                stream_buffer: self.inner.stream_buffer,
            }),
        }
    }

    pub fn policy(&self) -> &Arc<dyn ErrorPolicy> {
        &self.inner.policy
    }

    pub fn printer(&self) -> JsonPrinter {
        self.inner.printer
    }

    pub fn stream_buffer(&self) -> usize {
        self.inner.stream_buffer
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::from_config(&JsonConfig::default(), &StreamingConfig::default())
    }
}
