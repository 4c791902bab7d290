//! Configuration types for taproot-dns.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    #[serde(default)]
    pub dns: DnsConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for the UDP listener.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Path to the static records file (`domain=ip` per line).
    /// Names listed here are answered without touching the network.
    #[serde(default = "default_static_records")]
    pub static_records: PathBuf,

    /// TTL in seconds for answer records.
    #[serde(default = "default_answer_ttl")]
    pub answer_ttl: u32,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            static_records: default_static_records(),
            answer_ttl: default_answer_ttl(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "taproot_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:53".parse().expect("valid default listen address")
}

fn default_static_records() -> PathBuf {
    PathBuf::from("dns.cfg")
}

fn default_answer_ttl() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}
