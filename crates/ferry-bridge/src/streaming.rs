use std::sync::Arc;

use axum::body::Body;
use bytes::Bytes;
use ferry_core::{Failure, JsonPrinter};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::framing::Framing;
use crate::policy::ErrorPolicy;

type Frame = Result<Bytes, std::io::Error>;

/// The client is gone or the stream was already closed
#[derive(Debug, Error)]
#[error("output stream is closed")]
pub struct StreamClosed;

/// Append-only sink for the items of one streaming response
///
/// Backed by a bounded channel: [`append`](Self::append) waits while the
/// client is slow to read.
pub struct OutputStream {
    tx: Option<mpsc::Sender<Frame>>,
    framing: Framing,
}

impl OutputStream {
    /// Create the sink and the response body it feeds
    pub fn channel(framing: Framing, buffer: usize) -> (Self, Body) {
        let (tx, rx) = mpsc::channel::<Frame>(buffer.max(1));

        let frames = futures_util::stream::unfold(rx, |mut rx| async move {
            let frame = rx.recv().await?;
            Some((frame, rx))
        });

        (
            Self {
                tx: Some(tx),
                framing,
            },
            Body::from_stream(frames),
        )
    }

    /// Frame and write one item
    ///
    /// # Errors
    ///
    /// Returns [`StreamClosed`] if the stream was closed or the client
    /// disconnected
    pub async fn append(&mut self, item: &str) -> Result<(), StreamClosed> {
        let tx = self.tx.as_ref().ok_or(StreamClosed)?;

        if tx.send(Ok(self.framing.frame(item))).await.is_err() {
            self.tx = None;
            return Err(StreamClosed);
        }

        Ok(())
    }

    /// End the response normally; later calls do nothing
    pub fn close(&mut self) {
        if self.tx.take().is_some() {
            tracing::trace!("output stream closed");
        }
    }

    /// End the response with a transport error so the client sees truncation
    pub async fn abort(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send(Err(std::io::Error::other("stream aborted"))).await.ok();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(mpsc::Sender::is_closed)
    }

    /// Resolves once the client has gone away or the stream is closed
    pub async fn disconnected(&self) {
        if let Some(ref tx) = self.tx {
            tx.closed().await;
        }
    }
}

/// Writes the items of a handler stream as they are produced
///
/// Items are pulled one at a time and never buffered beyond the output
/// channel. A failure is turned into a final item by the error policy. A
/// client disconnect drops the handler stream without consulting the policy.
pub struct StreamingCallEmitter {
    output: OutputStream,
    policy: Arc<dyn ErrorPolicy>,
    printer: JsonPrinter,
}

impl StreamingCallEmitter {
    pub fn new(output: OutputStream, policy: Arc<dyn ErrorPolicy>, printer: JsonPrinter) -> Self {
        Self {
            output,
            policy,
            printer: printer.compact(),
        }
    }

    /// Drain `items` into the output stream, then close it
    pub async fn run<T, S>(mut self, items: S)
    where
        T: Serialize,
        S: Stream<Item = Result<T, Failure>>,
    {
        let mut items = std::pin::pin!(items);
        let mut emitted = 0_usize;

        loop {
            let next = tokio::select! {
                biased;
                () = self.output.disconnected() => None,
                next = items.next() => Some(next),
            };

            let Some(next) = next else {
                tracing::debug!(emitted, "client disconnected; abandoning stream");
                break;
            };

            let printed = match next {
                None => {
                    tracing::debug!(emitted, "stream finished");
                    break;
                }
                Some(Err(failure)) => {
                    self.fail(failure).await;
                    break;
                }
                Some(Ok(item)) => self.printer.print(&item),
            };

            match printed {
                Ok(text) => {
                    if self.output.append(&text).await.is_err() {
                        tracing::debug!(emitted, "client disconnected; abandoning stream");
                        break;
                    }
                    emitted += 1;
                    ferry_telemetry::metrics::record_stream_item();
                }
                Err(e) => {
                    self.fail(Failure::from(e)).await;
                    break;
                }
            }
        }

        self.output.close();
    }

    async fn fail(&mut self, failure: Failure) {
        let kind = failure.kind();
        tracing::debug!(%kind, "stream failed");
        ferry_telemetry::metrics::record_failure(kind.as_ref(), ferry_telemetry::metrics::SHAPE_STREAMING);

        match self.policy.on_stream_failure(failure) {
            Ok(Some(item)) => {
                if self.output.append(&item).await.is_err() {
                    tracing::debug!("client disconnected before the error item was written");
                }
            }
            Ok(None) => tracing::debug!("error policy closed the stream silently"),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize stream error; aborting call");
                self.output.abort().await;
            }
        }
    }
}
