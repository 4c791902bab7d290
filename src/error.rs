//! Error types for taproot-dns.

use hickory_proto::rr::RecordType;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Errors that can occur while resolving or serving queries.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The observed records do not lead to an address.
    #[error("resolution failed: {0}")]
    ResolveFailed(String),

    /// The per-query work budget was exhausted.
    #[error("work budget of {limit} upstream queries exhausted")]
    Overrun {
        /// Maximum number of upstream sends allowed per top-level resolve.
        limit: u32,
    },

    /// An upstream exchange exceeded its deadline.
    #[error("upstream {authority} timed out")]
    Timeout {
        /// The authoritative server that failed to answer in time.
        authority: Ipv4Addr,
    },

    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// DNS protocol error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// A client asked for a record type the server does not serve.
    #[error("unsupported question type: {0}")]
    Unsupported(RecordType),

    /// Invalid configuration or static records file
    #[error("invalid configuration: {0}")]
    Config(String),
}
