//! Real UDP loopback tests for the front-end.
//!
//! These bind the server on an ephemeral loopback port, back it with a
//! scripted exchanger, and send real datagrams. No privileges required.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RecordType;
use tokio::net::UdpSocket;

use common::*;
use taproot_dns::{DnsConfig, DnsServer, Resolver, StaticOverrides};

/// Start a server over the given resolver and return its address.
async fn start_server(resolver: Resolver) -> SocketAddr {
    let config = DnsConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        ..DnsConfig::default()
    };

    let server = DnsServer::bind(config, Arc::new(resolver))
        .await
        .expect("failed to bind UDP socket");
    let addr = server.local_addr().expect("failed to get local addr");

    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            eprintln!("server error: {}", e);
        }
    });

    addr
}

/// Send a query datagram and return the parsed response.
async fn query_server(server: SocketAddr, qname: &str, rtype: RecordType, id: u16) -> Message {
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sock.send_to(&build_query_bytes(qname, rtype, id), server)
        .await
        .expect("failed to send query");

    let mut buf = vec![0u8; 4096];
    let len = tokio::time::timeout(Duration::from_secs(5), sock.recv(&mut buf))
        .await
        .expect("query timed out")
        .expect("failed to recv response");

    Message::from_vec(&buf[..len]).expect("failed to parse DNS response")
}

#[tokio::test]
async fn loopback_override_answer() {
    let exchanger = Arc::new(ScriptedExchanger::new());
    let overrides = StaticOverrides::parse("host.test=10.9.8.7").unwrap();
    let server = start_server(test_resolver_with_overrides(exchanger, overrides)).await;

    let msg = query_server(server, "host.test", RecordType::A, 7).await;

    assert_eq!(msg.id(), 7);
    assert_response_code(&msg, ResponseCode::NoError);
    assert_eq!(extract_a_ips(&msg), vec![ip("10.9.8.7")]);
}

#[tokio::test]
async fn loopback_full_walk_answer() {
    let exchanger = Arc::new(ScriptedExchanger::new());
    exchanger.stage(
        "com",
        RecordType::NS,
        FIRST_ROOT,
        referral("com", &["a.gtld"], &[("a.gtld", ip("192.0.2.1"))]),
    );
    exchanger.stage(
        "example.com",
        RecordType::NS,
        ip("192.0.2.1"),
        referral("example.com", &["ns.example"], &[("ns.example", ip("192.0.2.2"))]),
    );
    exchanger.stage(
        "example.com",
        RecordType::A,
        ip("192.0.2.2"),
        answer_a("example.com", &[ip("93.184.216.34")]),
    );
    let server = start_server(test_resolver(exchanger)).await;

    let msg = query_server(server, "example.com", RecordType::A, 21).await;

    assert_response_code(&msg, ResponseCode::NoError);
    assert_eq!(extract_a_ips(&msg), vec![ip("93.184.216.34")]);
}

#[tokio::test]
async fn loopback_resolution_failure_refused() {
    let exchanger = Arc::new(ScriptedExchanger::new());
    exchanger.stage("test", RecordType::NS, FIRST_ROOT, empty());
    let server = start_server(test_resolver(exchanger)).await;

    let msg = query_server(server, "host.test", RecordType::A, 9).await;

    assert_response_code(&msg, ResponseCode::Refused);
    assert!(extract_a_ips(&msg).is_empty());
}

#[tokio::test]
async fn loopback_non_a_question_gets_no_response() {
    let exchanger = Arc::new(ScriptedExchanger::new());
    let server = start_server(test_resolver(exchanger)).await;

    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sock.send_to(&build_query_bytes("host.test", RecordType::AAAA, 11), server)
        .await
        .unwrap();

    // the whole datagram is dropped; nothing ever comes back
    let mut buf = vec![0u8; 4096];
    let outcome = tokio::time::timeout(Duration::from_millis(300), sock.recv(&mut buf)).await;
    assert!(outcome.is_err(), "expected no response for a non-A question");
}
