use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use ferry_telemetry::LogFormat;

/// Ferry RPC-over-HTTP bridge
#[derive(Debug, Parser)]
#[command(name = "ferry", about = "Serve RPC handlers over plain HTTP with google.rpc error reporting")]
pub struct Args {
    /// Path to configuration file; built-in defaults apply when omitted
    #[arg(short, long, env = "FERRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long, env = "FERRY_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter directives, e.g. `info,ferry_bridge=debug`
    #[arg(long, default_value = "info", env = "FERRY_LOG")]
    pub log: String,

    /// Log line format: `text` or `json`
    #[arg(long, default_value_t = LogFormat::Text, env = "FERRY_LOG_FORMAT")]
    pub log_format: LogFormat,
}
