//! UDP front-end and lifecycle management.

use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, RData, Record, RecordType};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use crate::config::DnsConfig;
use crate::error::ResolveError;
use crate::metrics::{self, DropReason, QueryOutcome, Timer};
use crate::resolver::Resolver;

/// Largest datagram the receiver accepts.
const MAX_DATAGRAM: usize = 4096;

/// DNS server answering A questions over UDP.
pub struct DnsServer {
    config: DnsConfig,
    resolver: Arc<Resolver>,
    socket: Arc<UdpSocket>,
}

impl DnsServer {
    /// Bind the UDP listener for the configured address.
    pub async fn bind(config: DnsConfig, resolver: Arc<Resolver>) -> Result<Self, ResolveError> {
        let socket = UdpSocket::bind(config.listen_addr).await?;
        info!(addr = %config.listen_addr, "DNS UDP listening");

        Ok(Self {
            config,
            resolver,
            socket: Arc::new(socket),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ResolveError> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve datagrams forever.
    ///
    /// Each datagram is handled on its own task; handlers run in parallel
    /// and never share per-query state.
    pub async fn run(self) -> Result<(), ResolveError> {
        let answer_ttl = self.config.answer_ttl;

        loop {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            let (len, peer) = self.socket.recv_from(&mut buf).await?;
            buf.truncate(len);

            let socket = self.socket.clone();
            let resolver = self.resolver.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_datagram(&resolver, &socket, peer, &buf, answer_ttl).await {
                    error!(%peer, error = %e, "dropping datagram");
                    metrics::record_dropped_datagram(drop_reason(&e));
                }
            });
        }
    }
}

/// Handle one request datagram: resolve every question, write one response.
///
/// `ResolveFailed` refuses the response and moves on to the next question;
/// every other error aborts the whole datagram without a response.
async fn handle_datagram(
    resolver: &Resolver,
    socket: &UdpSocket,
    peer: SocketAddr,
    datagram: &[u8],
    answer_ttl: u32,
) -> Result<(), ResolveError> {
    let request = Message::from_vec(datagram)?;

    let mut response = Message::new();
    response.set_id(request.id());
    response.set_message_type(MessageType::Response);
    response.set_op_code(OpCode::Query);
    response.set_recursion_desired(request.recursion_desired());
    response.set_recursion_available(true);
    for query in request.queries() {
        response.add_query(query.clone());
    }

    for query in request.queries() {
        if query.query_type() != RecordType::A {
            return Err(ResolveError::Unsupported(query.query_type()));
        }

        let timer = Timer::start();
        let domain = query.name().to_string();
        debug!(%peer, %domain, "question received");

        match resolver.resolve(&domain).await {
            Ok(address) => {
                let mut record =
                    Record::from_rdata(query.name().clone(), answer_ttl, RData::A(A::from(address)));
                record.set_dns_class(DNSClass::IN);
                response.add_answer(record);
                metrics::record_query(QueryOutcome::Resolved, timer.elapsed());
            }
            Err(ResolveError::ResolveFailed(reason)) => {
                warn!(%domain, %reason, "refusing question");
                response.set_response_code(ResponseCode::Refused);
                metrics::record_query(QueryOutcome::Refused, timer.elapsed());
            }
            Err(e) => {
                metrics::record_query(QueryOutcome::Failed, timer.elapsed());
                return Err(e);
            }
        }
    }

    socket.send_to(&response.to_vec()?, peer).await?;
    Ok(())
}

fn drop_reason(error: &ResolveError) -> DropReason {
    match error {
        ResolveError::Proto(_) => DropReason::Malformed,
        ResolveError::Unsupported(_) => DropReason::Unsupported,
        _ => DropReason::HandlerError,
    }
}
