//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use ferry_config::{Config, HealthConfig, JsonConfig, ServerConfig, StreamingConfig};

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Loopback listener, health enabled, compact JSON
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig::default(),
                },
                json: JsonConfig::default(),
                streaming: StreamingConfig::default(),
                telemetry: None,
            },
        }
    }

    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    pub fn with_health_path(mut self, path: &str) -> Self {
        self.config.server.health.path = path.to_owned();
        self
    }

    pub fn pretty_json(mut self) -> Self {
        self.config.json.pretty = true;
        self
    }

    pub fn with_stream_buffer(mut self, buffer: usize) -> Self {
        self.config.streaming.buffer = buffer;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
