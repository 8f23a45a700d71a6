mod harness;

use std::sync::Arc;

use ferry_bridge::Bridge;
use harness::config::ConfigBuilder;
use harness::server::TestServer;
use harness::service;

async fn start(config: &ferry_config::Config) -> TestServer {
    let bridge = Bridge::from_config(&config.json, &config.streaming);
    TestServer::start(config, service::router(bridge, Arc::default()))
        .await
        .unwrap()
}

async fn get_item(server: &TestServer, body: serde_json::Value) -> reqwest::Response {
    server
        .client()
        .post(server.url("/v1/items/get"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

fn content_type(resp: &reqwest::Response) -> String {
    resp.headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

#[tokio::test]
async fn success_returns_json_payload() {
    let server = start(&ConfigBuilder::new().build()).await;

    let resp = get_item(&server, serde_json::json!({"name": "anvil"})).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(content_type(&resp), "application/json");
    assert_eq!(resp.text().await.unwrap(), r#"{"name":"anvil"}"#);
}

#[tokio::test]
async fn not_found_status_becomes_404_with_status_body() {
    let server = start(&ConfigBuilder::new().build()).await;

    let resp = get_item(&server, serde_json::json!({"name": "missing"})).await;

    assert_eq!(resp.status(), 404);
    assert_eq!(content_type(&resp), "application/json");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 5);
    assert_eq!(body["message"], "missing");
}

#[tokio::test]
async fn malformed_input_is_plain_text_400() {
    let server = start(&ConfigBuilder::new().build()).await;

    let resp = get_item(&server, serde_json::json!({"name": ""})).await;

    assert_eq!(resp.status(), 400);
    assert!(content_type(&resp).starts_with("text/plain"));
    assert_eq!(resp.text().await.unwrap(), "bad field x");
}

#[tokio::test]
async fn undecodable_request_is_400() {
    let server = start(&ConfigBuilder::new().build()).await;

    let resp = server
        .client()
        .post(server.url("/v1/items/get"))
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert!(!resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn details_never_reach_the_client() {
    let server = start(&ConfigBuilder::new().build()).await;

    let resp = get_item(&server, serde_json::json!({"name": "secret"})).await;

    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "denied");
    assert!(body.get("details").is_none_or(|d| d.as_array().is_some_and(Vec::is_empty)));
}

#[tokio::test]
async fn unexpected_failure_is_opaque_500() {
    let server = start(&ConfigBuilder::new().build()).await;

    let resp = get_item(&server, serde_json::json!({"name": "crash"})).await;

    assert_eq!(resp.status(), 500);
    let text = resp.text().await.unwrap();
    assert!(!text.contains("database"), "internal detail leaked: {text}");
    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["code"], 13);
}

#[tokio::test]
async fn pretty_printing_applies_to_unary_errors() {
    let server = start(&ConfigBuilder::new().pretty_json().build()).await;

    let resp = get_item(&server, serde_json::json!({"name": "missing"})).await;

    assert_eq!(resp.status(), 404);
    assert!(resp.text().await.unwrap().contains('\n'));
}
