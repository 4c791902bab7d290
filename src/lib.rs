//! Taproot DNS - a recursive resolver that walks the hierarchy from the roots.
//!
//! This crate provides a DNS server that answers A-record queries without any
//! upstream recursive resolver. For every question it discovers the
//! authoritative server itself, starting from the root name servers and
//! following delegations label by label, chasing CNAMEs and falling back to
//! SOA master names when the referral carries no glue.
//!
//! ## Features
//!
//! - Iterative resolution from the 13 root servers, no forwarding
//! - Glue-aware delegation walk with CNAME and SOA handling
//! - Static overrides from a `domain=ip` records file
//! - Process-wide response cache for upstream exchanges
//! - Per-query work budget bounding upstream traffic
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         taproot-dns                            │
//! │                                                                │
//! │   UDP :53 ──▶ ┌──────────────────┐     ┌──────────────────┐    │
//! │               │   UDP front-end  │────▶│ Resolution engine│    │
//! │   response ◀──│  (per-datagram   │     │  (suffix walk,   │    │
//! │               │   handler task)  │     │   glue cache)    │    │
//! │               └──────────────────┘     └────────┬─────────┘    │
//! │                                                 │              │
//! │               ┌──────────────────┐              ▼              │
//! │               │ Static overrides │     ┌──────────────────┐    │      authoritative
//! │               │    (dns.cfg)     │     │ TCP transport +  │──────▶   servers :53
//! │               └──────────────────┘     │  response cache  │    │
//! │                                        └──────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Resolution
//!
//! ```text
//! a.b.example.com
//!   → NS com          @ random root server
//!   → NS example.com  @ authority learned for com
//!   → NS b.example.com, NS a.b.example.com ...
//!   → A  a.b.example.com @ final authority
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taproot_dns::{DnsConfig, DnsServer, Resolver, StaticOverrides, TcpExchanger};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DnsConfig::default();
//!     let overrides = Arc::new(StaticOverrides::load(&config.static_records).unwrap());
//!     let resolver = Arc::new(Resolver::new(overrides, Arc::new(TcpExchanger::new())));
//!
//!     let server = DnsServer::bind(config, resolver).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod overrides;
pub mod resolver;
pub mod server;
pub mod telemetry;
pub mod transport;

// Re-export main types
pub use config::{Config, DnsConfig, TelemetryConfig};
pub use error::ResolveError;
pub use overrides::StaticOverrides;
pub use resolver::{RandomSelector, Resolver, Selector};
pub use server::DnsServer;
pub use transport::{Exchanger, TcpExchanger};
