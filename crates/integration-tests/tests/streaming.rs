mod harness;

use std::sync::Arc;
use std::time::Duration;

use ferry_bridge::{Bridge, ErrorPolicy, Failure, PendingUnaryResponse, SerializeError};
use futures_util::StreamExt;
use harness::config::ConfigBuilder;
use harness::server::TestServer;
use harness::service::{self, StreamWatch};

async fn start_with(bridge: Bridge, watch: Arc<StreamWatch>) -> TestServer {
    let config = ConfigBuilder::new().build();
    TestServer::start(&config, service::router(bridge, watch)).await.unwrap()
}

async fn start() -> TestServer {
    start_with(Bridge::default(), Arc::default()).await
}

async fn list(server: &TestServer, accept: Option<&str>, body: serde_json::Value) -> reqwest::Response {
    let mut request = server.client().post(server.url("/v1/items/list")).json(&body);
    if let Some(accept) = accept {
        request = request.header("accept", accept);
    }
    request.send().await.unwrap()
}

/// Parse SSE event lines from raw response text
fn parse_sse_data(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("data: "))
        .map(|line| line.trim_start_matches("data: ").to_owned())
        .collect()
}

fn content_type(resp: &reqwest::Response) -> &str {
    resp.headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn items_then_internal_error_item() {
    let server = start().await;

    let resp = list(
        &server,
        None,
        serde_json::json!({"names": ["A", "B"], "ending": "unexpected"}),
    )
    .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(content_type(&resp), "application/x-ndjson");

    let text = resp.text().await.unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            r#"{"name":"A"}"#,
            r#"{"name":"B"}"#,
            r#"{"code":13,"message":"internal error"}"#
        ]
    );
    assert!(!text.contains("worker crashed"));
}

#[tokio::test]
async fn immediate_failure_yields_single_error_item() {
    let server = start().await;

    let resp = list(&server, None, serde_json::json!({"ending": "not_found"})).await;

    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert_eq!(text, "{\"code\":5,\"message\":\"shelf missing\"}\n");
}

#[tokio::test]
async fn exhausted_stream_has_no_error_item() {
    let server = start().await;

    let resp = list(&server, None, serde_json::json!({"names": ["A"]})).await;

    assert_eq!(resp.text().await.unwrap(), "{\"name\":\"A\"}\n");
}

#[tokio::test]
async fn event_stream_framing_when_accepted() {
    let server = start().await;

    let resp = list(
        &server,
        Some("text/event-stream"),
        serde_json::json!({"names": ["A"], "ending": "not_found"}),
    )
    .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(content_type(&resp), "text/event-stream");

    let events = parse_sse_data(&resp.text().await.unwrap());
    assert_eq!(events, [r#"{"name":"A"}"#, r#"{"code":5,"message":"shelf missing"}"#]);
}

#[tokio::test]
async fn stream_items_stay_single_line_with_pretty_json() {
    let config = ConfigBuilder::new().pretty_json().build();
    let bridge = Bridge::from_config(&config.json, &config.streaming);
    let server = TestServer::start(&config, service::router(bridge, Arc::default()))
        .await
        .unwrap();

    let resp = list(
        &server,
        None,
        serde_json::json!({"names": ["A"], "ending": "unexpected"}),
    )
    .await;

    let text = resp.text().await.unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[tokio::test]
async fn malformed_streaming_request_is_400() {
    let server = start().await;

    let resp = server
        .client()
        .post(server.url("/v1/items/list"))
        .body(r#"{"names": 7}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

/// Counts stream failures and never answers with an item
#[derive(Default)]
struct RecordingPolicy {
    stream_failures: std::sync::atomic::AtomicUsize,
}

impl ErrorPolicy for RecordingPolicy {
    fn on_unary_failure(&self, _failure: Failure, pending: &mut PendingUnaryResponse) {
        pending.cancel();
    }

    fn on_stream_failure(&self, _failure: Failure) -> Result<Option<String>, SerializeError> {
        self.stream_failures.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(None)
    }
}

#[tokio::test]
async fn custom_policy_can_close_silently() {
    let server = start_with(Bridge::default().with_policy(RecordingPolicy::default()), Arc::default()).await;

    let resp = list(
        &server,
        None,
        serde_json::json!({"names": ["A"], "ending": "not_found"}),
    )
    .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "{\"name\":\"A\"}\n");
}

#[tokio::test]
async fn client_disconnect_drops_the_handler_stream() {
    let watch = Arc::new(StreamWatch::default());
    let config = ConfigBuilder::new().with_stream_buffer(1).build();
    let bridge = Bridge::from_config(&config.json, &config.streaming);
    let server = TestServer::start(&config, service::router(bridge, Arc::clone(&watch)))
        .await
        .unwrap();

    let resp = list(&server, None, serde_json::json!({"ending": "endless"})).await;
    assert_eq!(resp.status(), 200);

    let mut chunks = resp.bytes_stream();
    let first = tokio::time::timeout(Duration::from_secs(5), chunks.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!first.is_empty());
    drop(chunks);

    assert!(watch.wait_dropped().await, "handler stream was not dropped after disconnect");

    // Backpressure keeps the handler from running ahead after the drop
    let pulled = watch.pulled();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(watch.pulled(), pulled);
}
