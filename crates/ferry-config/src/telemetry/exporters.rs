use serde::Deserialize;
use url::Url;

/// Where and how OTLP data is shipped
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub endpoint: Url,
    #[serde(default)]
    pub protocol: ExportProtocol,
    /// Seconds between periodic metric exports
    #[serde(default = "default_export_interval")]
    pub export_interval: u64,
    /// Seconds before a single export attempt is abandoned
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    #[default]
    Grpc,
    /// HTTP with protobuf bodies
    HttpProto,
}

#[allow(clippy::missing_const_for_fn)]
fn default_export_interval() -> u64 {
    30
}

#[allow(clippy::missing_const_for_fn)]
fn default_timeout() -> u64 {
    10
}
