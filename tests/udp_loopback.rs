//! Real UDP loopback tests.
//!
//! A `ServerFuture` is started on `127.0.0.1` with an ephemeral port and
//! queried over real sockets. No privileges are needed.

mod common;

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RecordType;
use hickory_server::ServerFuture;
use synth_dns::{DnsServer, SynthHandler};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use common::*;

// =========================================================================
// Infrastructure
// =========================================================================

/// A test DNS server running on a random port.
struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl TestServer {
    async fn start(handler: SynthHandler) -> Self {
        let udp_socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("failed to bind UDP socket");
        let addr = udp_socket.local_addr().expect("failed to get local addr");

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            let mut server = ServerFuture::new(handler);
            server.register_socket(udp_socket);

            tokio::select! {
                result = server.block_until_done() => {
                    if let Err(e) = result {
                        eprintln!("server error: {}", e);
                    }
                }
                _ = token.cancelled() => {}
            }
        });

        // Give the server a moment to start accepting packets.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self { addr, shutdown }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Send a DNS query over UDP and return the parsed response.
async fn query(server: &TestServer, name: &str, record_type: RecordType, id: u16) -> Message {
    let sock = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("failed to bind client socket");
    let query_bytes = build_query_bytes(name, record_type, id);

    sock.send_to(&query_bytes, server.addr)
        .await
        .expect("failed to send query");

    let mut buf = vec![0u8; 4096];
    let len = tokio::time::timeout(Duration::from_secs(5), sock.recv(&mut buf))
        .await
        .expect("query timed out")
        .expect("failed to recv response");

    Message::from_vec(&buf[..len]).expect("failed to parse DNS response")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn loopback_forward_and_reverse() {
    let server = TestServer::start(build_handler(allowlist_config())).await;

    let msg = query(&server, "10-0-0-5.docker.", RecordType::A, 1).await;
    assert_eq!(msg.id(), 1);
    assert_ips(&msg, &["10.0.0.5".parse::<IpAddr>().unwrap()]);

    let msg = query(&server, "5.0.0.10.in-addr.arpa.", RecordType::PTR, 2).await;
    assert_ptr(&msg, "10-0-0-5.docker.");
}

#[tokio::test]
async fn loopback_source_outside_allowlist_refused() {
    let mut config = allowlist_config();
    config.allow.networks = vec!["203.0.113.0/24".to_string()];
    let server = TestServer::start(build_handler(config)).await;

    let msg = query(&server, "10-0-0-5.docker.", RecordType::A, 3).await;
    assert_empty(&msg, ResponseCode::Refused);
}

#[tokio::test]
async fn loopback_non_synthetic_name_gets_a_response() {
    let server = TestServer::start(build_handler(rdns_config())).await;

    let msg = query(&server, "www.example.com.", RecordType::A, 5).await;
    assert_eq!(msg.id(), 5);
    assert_empty(&msg, ResponseCode::Refused);
}

#[tokio::test]
async fn loopback_inventory_failure_is_servfail() {
    let handler = build_backend_handler(rdns_config(), std::sync::Arc::new(UnavailableInventory));
    let server = TestServer::start(handler).await;

    let msg = query(&server, "web1.docker.", RecordType::A, 6).await;
    assert_empty(&msg, ResponseCode::ServFail);
}

#[tokio::test]
async fn loopback_inventory_answers() {
    let server = TestServer::start(build_inventory_handler(rdns_config(), test_inventory())).await;

    let msg = query(&server, "web1.docker.", RecordType::AAAA, 4).await;
    assert_ips(&msg, &["fd00::2".parse::<IpAddr>().unwrap()]);
}

#[tokio::test]
async fn run_stops_on_cancel() {
    let mut config = rdns_config();
    config.listen_addr = "127.0.0.1:0".parse().unwrap();
    let server = DnsServer::new(config).unwrap();

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .expect("server task panicked");
    assert!(result.is_ok());
}
