//! Metric names and recording helpers

use std::sync::OnceLock;

use opentelemetry::KeyValue;
use opentelemetry::metrics::Counter;

// RPC metric names
pub const RPC_FAILURE_COUNT: &str = "rpc.failure.count";
pub const RPC_STREAM_ITEM_COUNT: &str = "rpc.stream.item.count";

// Attribute keys
pub const ATTR_FAILURE_KIND: &str = "rpc.kind";
pub const ATTR_CALL_SHAPE: &str = "rpc.shape";

// Call shapes
pub const SHAPE_UNARY: &str = "unary";
pub const SHAPE_STREAMING: &str = "streaming";

fn meter() -> opentelemetry::metrics::Meter {
    opentelemetry::global::meter("ferry")
}

fn failure_counter() -> &'static Counter<u64> {
    static COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
    COUNTER.get_or_init(|| {
        meter()
            .u64_counter(RPC_FAILURE_COUNT)
            .with_description("Handler failures translated by an error policy")
            .build()
    })
}

fn stream_item_counter() -> &'static Counter<u64> {
    static COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
    COUNTER.get_or_init(|| {
        meter()
            .u64_counter(RPC_STREAM_ITEM_COUNT)
            .with_description("Data items written to streaming responses")
            .build()
    })
}

/// Count one failure of the given kind on a call of the given shape
pub fn record_failure(kind: &str, shape: &'static str) {
    failure_counter().add(
        1,
        &[
            KeyValue::new(ATTR_FAILURE_KIND, kind.to_owned()),
            KeyValue::new(ATTR_CALL_SHAPE, shape),
        ],
    );
}

/// Count one data item written to a streaming response
pub fn record_stream_item() {
    stream_item_counter().add(1, &[]);
}
