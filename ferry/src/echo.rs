//! Demo echo service

use std::time::Duration;

use axum::Router;
use ferry_bridge::{Bridge, Code, Failure, RpcRouter};
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

const MAX_REPEAT: u32 = 1000;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SayRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SayReply {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepeatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Fail with `UNAVAILABLE` once this many items were sent
    #[serde(default)]
    pub fail_after: Option<u32>,
    #[serde(default)]
    pub interval_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct RepeatReply {
    pub index: u32,
    pub message: String,
}

const fn default_count() -> u32 {
    3
}

pub fn router(bridge: Bridge) -> Router {
    RpcRouter::new(bridge)
        .unary("/v1/echo/say", say)
        .server_streaming("/v1/echo/repeat", repeat)
        .into_router()
}

async fn say(request: SayRequest) -> Result<SayReply, Failure> {
    if request.message.is_empty() {
        return Err(Failure::status(Code::InvalidArgument, "message must not be empty"));
    }

    Ok(SayReply {
        message: request.message,
    })
}

fn repeat(request: RepeatRequest) -> BoxStream<'static, Result<RepeatReply, Failure>> {
    if request.count > MAX_REPEAT {
        let failure = Failure::status(Code::OutOfRange, format!("count must be at most {MAX_REPEAT}"));
        return stream::once(async move { Err(failure) }).boxed();
    }

    let interval = Duration::from_millis(request.interval_ms);

    stream::unfold((0, request), move |(index, request)| async move {
        if request.fail_after == Some(index) {
            let failure = Failure::status(Code::Unavailable, format!("echo gave up after {index} items"));
            // Park the cursor past the end so the stream finishes after the failure
            return Some((Err(failure), (u32::MAX, request)));
        }

        if index >= request.count {
            return None;
        }

        if !interval.is_zero() && index > 0 {
            tokio::time::sleep(interval).await;
        }

        let reply = RepeatReply {
            index,
            message: request.message.clone(),
        };
        Some((Ok(reply), (index + 1, request)))
    })
    .boxed()
}
