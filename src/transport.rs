//! Upstream transport: DNS over TCP with a process-wide response cache.

use async_trait::async_trait;
use hickory_proto::op::Message;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::error::ResolveError;
use crate::metrics;

/// Deadline covering connect, write, and read of one exchange.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Port authoritative servers answer on.
const DNS_PORT: u16 = 53;

/// One request/response exchange with an authoritative server.
///
/// The engine depends on this seam only; tests substitute a scripted
/// implementation.
#[async_trait]
pub trait Exchanger: Send + Sync {
    /// Send `query` to `authority` and return the parsed response.
    async fn exchange(&self, query: &Message, authority: Ipv4Addr)
        -> Result<Message, ResolveError>;
}

/// TCP transport with an unbounded response cache.
///
/// Responses are cached by (question text, authority address) for the
/// process lifetime; identical keys always return the identical response.
pub struct TcpExchanger {
    cache: Mutex<HashMap<(String, Ipv4Addr), Message>>,
    port: u16,
    timeout: Duration,
}

impl TcpExchanger {
    /// Create a transport talking to port 53.
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            port: DNS_PORT,
            timeout: EXCHANGE_TIMEOUT,
        }
    }

    /// Number of cached responses.
    pub fn cached_responses(&self) -> usize {
        self.cache.lock().len()
    }

    async fn exchange_tcp(
        &self,
        query: &Message,
        authority: Ipv4Addr,
    ) -> Result<Message, ResolveError> {
        let wire = query.to_vec()?;
        let mut stream = TcpStream::connect((authority, self.port)).await?;

        // 2-byte big-endian length prefix on both directions
        stream.write_all(&(wire.len() as u16).to_be_bytes()).await?;
        stream.write_all(&wire).await?;
        stream.flush().await?;

        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await?;
        let body_len = u16::from_be_bytes(len_buf) as usize;

        let mut body = vec![0u8; body_len];
        stream.read_exact(&mut body).await?;

        Ok(Message::from_vec(&body)?)
    }
}

impl Default for TcpExchanger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exchanger for TcpExchanger {
    async fn exchange(
        &self,
        query: &Message,
        authority: Ipv4Addr,
    ) -> Result<Message, ResolveError> {
        let key = (question_text(query), authority);

        if let Some(cached) = self.cache.lock().get(&key) {
            trace!(question = %key.0, %authority, "response cache hit");
            metrics::record_upstream_exchange(true);
            return Ok(cached.clone());
        }

        let response = tokio::time::timeout(self.timeout, self.exchange_tcp(query, authority))
            .await
            .map_err(|_| ResolveError::Timeout { authority })??;

        debug!(
            question = %key.0,
            %authority,
            answers = response.answers().len(),
            authorities = response.name_servers().len(),
            additionals = response.additionals().len(),
            "upstream exchange"
        );
        metrics::record_upstream_exchange(false);

        let mut cache = self.cache.lock();
        cache.insert(key, response.clone());
        metrics::record_response_cache_entries(cache.len());

        Ok(response)
    }
}

/// Canonical text of a message's question list, the cache key component.
fn question_text(query: &Message) -> String {
    query
        .queries()
        .iter()
        .map(|q| format!("{} {} {}", q.name(), q.query_class(), q.query_type()))
        .collect::<Vec<_>>()
        .join(" ")
}
