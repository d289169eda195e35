//! Shared test infrastructure for handler and loopback integration tests.

#![allow(dead_code)]

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use synth_dns::config::DnsConfig;
use synth_dns::inventory::{Inventory, InventoryEntry, NetworkAttachment, StaticInventory};
use synth_dns::InventoryError;
use synth_dns::{DnsServer, SynthHandler};

// --- Constants ---

pub const SUFFIX: &str = ".docker";

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// The response is serialized via `MessageResponse::destructive_emit()` and
/// stored as raw wire-format bytes, parsed back with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Source addresses ---

pub fn private_src() -> SocketAddr {
    "192.168.1.10:12345".parse().unwrap()
}

pub fn public_src() -> SocketAddr {
    "8.8.8.8:12345".parse().unwrap()
}

// --- Config builders ---

/// rdns mode, `.docker` suffix, no allowlist.
pub fn rdns_config() -> DnsConfig {
    let mut config = DnsConfig::new("127.0.0.1:5353".parse().unwrap());
    config.suffix = Some(SUFFIX.to_string());
    config.ttl = 60;
    config
}

/// rdns mode with the default allowlist switched on.
pub fn allowlist_config() -> DnsConfig {
    let mut config = rdns_config();
    config.allow.enabled = true;
    config
}

// --- Inventory builders ---

pub fn container(name: &str, v4: &[Ipv4Addr], v6: &[Ipv6Addr]) -> InventoryEntry {
    let count = v4.len().max(v6.len());
    InventoryEntry {
        canonical_name: name.to_string(),
        attachments: (0..count)
            .map(|i| NetworkAttachment {
                ipv4: v4.get(i).copied(),
                ipv6: v6.get(i).copied(),
            })
            .collect(),
    }
}

/// Inventory with `web1` (two networks, one with IPv6) and `db` (IPv4 only).
pub fn test_inventory() -> StaticInventory {
    let inventory = StaticInventory::new();
    inventory.upsert(container(
        "web1",
        &[Ipv4Addr::new(172, 17, 0, 2), Ipv4Addr::new(172, 18, 0, 2)],
        &["fd00::2".parse().unwrap()],
    ));
    inventory.upsert(container("db", &[Ipv4Addr::new(172, 17, 0, 3)], &[]));
    inventory
}

/// Inventory whose backend is always down.
pub struct UnavailableInventory;

#[async_trait]
impl Inventory for UnavailableInventory {
    async fn list_entries(&self) -> Result<Vec<InventoryEntry>, InventoryError> {
        Err(InventoryError::Backend("engine down".to_string()))
    }

    async fn inspect(&self, _name: &str) -> Result<Option<InventoryEntry>, InventoryError> {
        Err(InventoryError::Backend("engine down".to_string()))
    }
}

// --- Handler builders ---

pub fn build_handler(config: DnsConfig) -> SynthHandler {
    DnsServer::new(config)
        .expect("failed to create DnsServer")
        .handler()
}

/// Docker mode against `inventory`.
pub fn build_inventory_handler(config: DnsConfig, inventory: StaticInventory) -> SynthHandler {
    let inventory: Arc<dyn Inventory> = Arc::new(inventory);
    build_backend_handler(config, inventory)
}

/// Docker mode against any inventory backend.
pub fn build_backend_handler(config: DnsConfig, inventory: Arc<dyn Inventory>) -> SynthHandler {
    DnsServer::with_inventory(config, Some(inventory))
        .expect("failed to create DnsServer")
        .handler()
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

/// Build a full `Request` with a crafted source address.
pub fn build_request(name: &str, record_type: RecordType, src: SocketAddr, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, id);
    let msg = parse_message_request(&bytes);
    Request::new(msg, src, Protocol::Udp)
}

// --- Response helpers ---

/// Execute a query through the handler and return the parsed response.
pub async fn execute_query(
    synth: &SynthHandler,
    name: &str,
    record_type: RecordType,
    src: SocketAddr,
    id: u16,
) -> Message {
    let request = build_request(name, record_type, src, id);
    let handler = TestResponseHandler::new();
    synth.handle_request(&request, handler.clone()).await;
    handler.into_message()
}

/// A and AAAA addresses in the answer section, in order.
pub fn extract_ips(msg: &Message) -> Vec<IpAddr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(IpAddr::V4(Ipv4Addr::from(*a))),
            RData::AAAA(aaaa) => Some(IpAddr::V6(Ipv6Addr::from(*aaaa))),
            _ => None,
        })
        .collect()
}

/// PTR targets in the answer section.
pub fn extract_ptr_names(msg: &Message) -> Vec<String> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::PTR(ptr) => Some(ptr.0.to_ascii()),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}

/// Assert an authoritative NOERROR answer with exactly `expected` addresses, in order.
pub fn assert_ips(msg: &Message, expected: &[IpAddr]) {
    assert_response_code(msg, ResponseCode::NoError);
    assert!(msg.authoritative(), "answer is not authoritative");
    let actual = extract_ips(msg);
    assert_eq!(
        actual, expected,
        "address records mismatch.\nactual:   {:?}\nexpected: {:?}",
        actual, expected
    );
}

/// Assert an authoritative NOERROR answer with a single PTR to `target`.
pub fn assert_ptr(msg: &Message, target: &str) {
    assert_response_code(msg, ResponseCode::NoError);
    assert!(msg.authoritative(), "answer is not authoritative");
    assert_eq!(extract_ptr_names(msg), vec![target.to_string()]);
}

/// Assert an empty response with `expected` as its code.
pub fn assert_empty(msg: &Message, expected: ResponseCode) {
    assert_response_code(msg, expected);
    assert!(msg.answers().is_empty(), "unexpected answers: {:?}", msg.answers());
}
