#![allow(clippy::must_use_candidate)]

mod env;
pub mod health;
pub mod json;
mod loader;
pub mod server;
pub mod streaming;
pub mod telemetry;

use serde::Deserialize;

pub use health::*;
pub use json::*;
pub use server::*;
pub use streaming::*;
pub use telemetry::TelemetryConfig;

/// Top-level ferry configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// JSON rendering of payloads and statuses
    #[serde(default)]
    pub json: JsonConfig,
    /// Server-streaming call configuration
    #[serde(default)]
    pub streaming: StreamingConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
