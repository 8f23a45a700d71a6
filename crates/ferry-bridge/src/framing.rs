use bytes::{BufMut, Bytes, BytesMut};
use http::HeaderMap;
use http::header::ACCEPT;

const EVENT_STREAM: &str = "text/event-stream";
const NDJSON: &str = "application/x-ndjson";

/// How items of a streaming response are delimited on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// One item per line
    #[default]
    NewlineDelimited,
    /// One server-sent event per item
    ServerSentEvents,
}

impl Framing {
    /// Pick server-sent events when the client accepts `text/event-stream`
    pub fn negotiate(headers: &HeaderMap) -> Self {
        let wants_events = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|range| range.split(';').next())
            .any(|media| media.trim().eq_ignore_ascii_case(EVENT_STREAM));

        if wants_events {
            Self::ServerSentEvents
        } else {
            Self::NewlineDelimited
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::NewlineDelimited => NDJSON,
            Self::ServerSentEvents => EVENT_STREAM,
        }
    }

    /// Encode one item
    ///
    /// An item always stays one item on the wire. Newline-delimited framing
    /// joins the lines of a multi-line item with spaces; for server-sent
    /// events every line becomes a `data:` field of the same event.
    pub fn frame(self, item: &str) -> Bytes {
        match self {
            Self::NewlineDelimited => {
                let mut buf = BytesMut::with_capacity(item.len() + 1);
                for (i, line) in item.split('\n').enumerate() {
                    if i > 0 {
                        buf.put_u8(b' ');
                    }
                    buf.put_slice(line.strip_suffix('\r').unwrap_or(line).as_bytes());
                }
                buf.put_u8(b'\n');
                buf.freeze()
            }
            Self::ServerSentEvents => {
                let mut buf = BytesMut::with_capacity(item.len() + 8);
                for line in item.split('\n') {
                    buf.put_slice(b"data: ");
                    buf.put_slice(line.strip_suffix('\r').unwrap_or(line).as_bytes());
                    buf.put_u8(b'\n');
                }
                buf.put_u8(b'\n');
                buf.freeze()
            }
        }
    }
}
