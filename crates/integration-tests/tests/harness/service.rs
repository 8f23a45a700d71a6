//! Inventory service exercising every failure path of the bridge

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use ferry_bridge::{Bridge, Code, Failure, RpcRouter, StructuredStatus};
use ferry_core::Any;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GetItem {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct Item {
    pub name: String,
}

/// How a listing ends
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    #[default]
    Exhausted,
    Unexpected,
    NotFound,
    /// Keep producing items until the client goes away
    Endless,
}

#[derive(Debug, Deserialize)]
pub struct ListItems {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub ending: Ending,
}

/// Observations shared between the service and the test
#[derive(Debug, Default)]
pub struct StreamWatch {
    pulled: AtomicUsize,
    dropped: AtomicBool,
}

impl StreamWatch {
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Wait up to five seconds for the handler stream to be dropped
    pub async fn wait_dropped(&self) -> bool {
        for _ in 0..100 {
            if self.dropped() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

/// Flags the watch when the handler stream is dropped
struct DropFlag(Arc<StreamWatch>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.dropped.store(true, Ordering::SeqCst);
    }
}

pub fn router(bridge: Bridge, watch: Arc<StreamWatch>) -> Router {
    RpcRouter::new(bridge)
        .unary("/v1/items/get", get_item)
        .server_streaming("/v1/items/list", move |request: ListItems| list_items(request, Arc::clone(&watch)))
        .into_router()
}

async fn get_item(request: GetItem) -> Result<Item, Failure> {
    match request.name.as_str() {
        "" => Err(Failure::malformed("bad field x")),
        "missing" => Err(Failure::status(Code::NotFound, "missing")),
        "secret" => Err(Failure::Status(StructuredStatus::with_details(
            Code::PermissionDenied,
            "denied",
            vec![Any {
                type_url: "type.googleapis.com/google.rpc.ErrorInfo".to_owned(),
                value: b"\x0a\x06REASON".to_vec(),
            }],
        ))),
        "crash" => Err(Failure::from(anyhow::anyhow!("database connection reset"))),
        name => Ok(Item { name: name.to_owned() }),
    }
}

fn list_items(request: ListItems, watch: Arc<StreamWatch>) -> BoxStream<'static, Result<Item, Failure>> {
    let flag = DropFlag(Arc::clone(&watch));
    let items = request.names.into_iter().map(|name| Ok(Item { name }));

    let ending: BoxStream<'static, Result<Item, Failure>> = match request.ending {
        Ending::Exhausted => stream::empty().boxed(),
        Ending::Unexpected => stream::once(async { Err(Failure::from(anyhow::anyhow!("worker crashed"))) }).boxed(),
        Ending::NotFound => stream::once(async { Err(Failure::status(Code::NotFound, "shelf missing")) }).boxed(),
        Ending::Endless => stream::repeat_with(|| Ok(Item { name: "filler".to_owned() })).boxed(),
    };

    stream::iter(items)
        .chain(ending)
        .map(move |item| {
            let _keep = &flag;
            watch.pulled.fetch_add(1, Ordering::SeqCst);
            item
        })
        .boxed()
}
