//! IKE socket integration tests
//!
//! End-to-end tests over loopback UDP: registry uniqueness, SPI
//! demultiplexing, drop policy and per-socket ordering.

#![cfg(feature = "ike")]

use ikemux_proto::ike::{
    IkeFlags, IkeHeader, SessionCallback, SocketConfig, SocketRegistry, TransportMode,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Callback that records (local SPI, message ID) pairs in arrival order.
struct RecordingCallback {
    received: Mutex<Vec<(u64, u32)>>,
}

impl RecordingCallback {
    fn new() -> Arc<Self> {
        Arc::new(RecordingCallback {
            received: Mutex::new(Vec::new()),
        })
    }

    fn received(&self) -> Vec<(u64, u32)> {
        self.received.lock().unwrap().clone()
    }
}

impl SessionCallback for RecordingCallback {
    fn on_ike_packet(&self, header: &IkeHeader, _packet: &[u8]) {
        self.received
            .lock()
            .unwrap()
            .push((header.local_spi(), header.message_id));
    }
}

/// Build a wire-format IKE message whose responder SPI is the receiver's
/// locally-generated SPI.
fn ike_packet(local_spi: u64, message_id: u32) -> Vec<u8> {
    let header = IkeHeader::new(
        0x0102030405060708u64.to_be_bytes(),
        local_spi.to_be_bytes(),
        33, // SA
        34, // IKE_SA_INIT
        IkeFlags::request(true),
        message_id,
        28,
    );
    header.to_bytes().to_vec()
}

fn loopback_config() -> SocketConfig {
    SocketConfig::new("127.0.0.1:0".parse().unwrap(), 0, TransportMode::Udp4).unwrap()
}

/// Route `tracing` output to the test harness when RUST_LOG asks for it.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `predicate` until it holds or a 2-second deadline passes.
async fn wait_until(predicate: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_demux_routes_to_registered_session() {
    init_tracing();
    let registry = SocketRegistry::new();
    let config = loopback_config();
    let session_a = RecordingCallback::new();
    let session_b = RecordingCallback::new();

    let socket = registry
        .get_or_create(config, session_a.clone())
        .await
        .unwrap();
    registry
        .get_or_create(config, session_b.clone())
        .await
        .unwrap();

    socket.register_session(0xAAAA, session_a.clone());
    socket.register_session(0xBBBB, session_b.clone());

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender
        .send_to(&ike_packet(0xAAAA, 1), socket.local_addr())
        .await
        .unwrap();
    sender
        .send_to(&ike_packet(0xBBBB, 2), socket.local_addr())
        .await
        .unwrap();

    assert!(wait_until(|| session_a.received().len() == 1).await);
    assert!(wait_until(|| session_b.received().len() == 1).await);

    // Each packet reached exactly its own session.
    assert_eq!(session_a.received(), vec![(0xAAAA, 1)]);
    assert_eq!(session_b.received(), vec![(0xBBBB, 2)]);

    let session_a: Arc<dyn SessionCallback> = session_a;
    let session_b: Arc<dyn SessionCallback> = session_b;
    registry.release(&socket, &session_a).await;
    registry.release(&socket, &session_b).await;
}

#[tokio::test]
async fn test_one_os_socket_per_config() {
    init_tracing();
    let registry = SocketRegistry::new();
    let config = loopback_config();
    let session = RecordingCallback::new();

    let first = registry
        .get_or_create(config, session.clone())
        .await
        .unwrap();
    let second = registry
        .get_or_create(config, session.clone())
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.local_addr(), second.local_addr());
    assert_eq!(registry.socket_count().await, 1);

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&first, &session).await;
    registry.release(&first, &session).await;
    assert_eq!(registry.socket_count().await, 0);
}

#[tokio::test]
async fn test_unknown_spi_is_dropped_without_dispatch() {
    init_tracing();
    let registry = SocketRegistry::new();
    let session = RecordingCallback::new();

    let socket = registry
        .get_or_create(loopback_config(), session.clone())
        .await
        .unwrap();
    socket.register_session(0xAAAA, session.clone());

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // Unknown SPI first, then a known one; in-order processing means the
    // unknown packet has been handled once the known one arrives.
    sender
        .send_to(&ike_packet(0xDEAD, 1), socket.local_addr())
        .await
        .unwrap();
    sender
        .send_to(&ike_packet(0xAAAA, 2), socket.local_addr())
        .await
        .unwrap();

    assert!(wait_until(|| session.received().len() == 1).await);
    assert_eq!(session.received(), vec![(0xAAAA, 2)]);
    assert_eq!(socket.metrics().snapshot().dropped_unknown_spi, 1);

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&socket, &session).await;
}

#[tokio::test]
async fn test_unregistered_session_stops_receiving() {
    init_tracing();
    let registry = SocketRegistry::new();
    let session = RecordingCallback::new();

    let socket = registry
        .get_or_create(loopback_config(), session.clone())
        .await
        .unwrap();
    socket.register_session(0xAAAA, session.clone());
    socket.unregister_session(0xAAAA);

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender
        .send_to(&ike_packet(0xAAAA, 1), socket.local_addr())
        .await
        .unwrap();

    assert!(
        wait_until(|| socket.metrics().snapshot().dropped_unknown_spi == 1).await,
        "packet for unregistered SPI should be counted as dropped"
    );
    assert!(session.received().is_empty());

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&socket, &session).await;
}

#[tokio::test]
async fn test_oversized_datagram_never_reaches_demux() {
    init_tracing();
    let registry = SocketRegistry::new();
    let session = RecordingCallback::new();

    let socket = registry
        .get_or_create(loopback_config(), session.clone())
        .await
        .unwrap();
    socket.register_session(0xAAAA, session.clone());

    // A 4096-byte datagram fills the receive buffer exactly; IKE traffic
    // is bounded below that, so it must be dropped unparsed.
    let mut oversized = ike_packet(0xAAAA, 1);
    oversized.resize(4096, 0);

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender
        .send_to(&oversized, socket.local_addr())
        .await
        .unwrap();
    sender
        .send_to(&ike_packet(0xAAAA, 2), socket.local_addr())
        .await
        .unwrap();

    assert!(wait_until(|| session.received().len() == 1).await);
    assert_eq!(session.received(), vec![(0xAAAA, 2)]);
    assert_eq!(socket.metrics().snapshot().dropped_oversized, 1);

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&socket, &session).await;
}

#[tokio::test]
async fn test_malformed_datagram_is_dropped() {
    init_tracing();
    let registry = SocketRegistry::new();
    let session = RecordingCallback::new();

    let socket = registry
        .get_or_create(loopback_config(), session.clone())
        .await
        .unwrap();
    socket.register_session(0xAAAA, session.clone());

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender
        .send_to(&[0xFF; 12], socket.local_addr())
        .await
        .unwrap();
    sender
        .send_to(&ike_packet(0xAAAA, 1), socket.local_addr())
        .await
        .unwrap();

    assert!(wait_until(|| session.received().len() == 1).await);
    assert_eq!(socket.metrics().snapshot().dropped_malformed, 1);

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&socket, &session).await;
}

#[tokio::test]
async fn test_packets_arrive_in_order() {
    init_tracing();
    let registry = SocketRegistry::new();
    let session = RecordingCallback::new();

    let socket = registry
        .get_or_create(loopback_config(), session.clone())
        .await
        .unwrap();
    socket.register_session(0xAAAA, session.clone());

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let count = 32u32;
    for message_id in 0..count {
        sender
            .send_to(&ike_packet(0xAAAA, message_id), socket.local_addr())
            .await
            .unwrap();
    }

    assert!(wait_until(|| session.received().len() == count as usize).await);

    let expected: Vec<(u64, u32)> = (0..count).map(|id| (0xAAAA, id)).collect();
    assert_eq!(session.received(), expected);

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&socket, &session).await;
}

#[tokio::test]
async fn test_release_then_recreate_gets_fresh_socket() {
    init_tracing();
    let registry = SocketRegistry::new();
    let config = loopback_config();
    let session = RecordingCallback::new();

    let first = registry
        .get_or_create(config, session.clone())
        .await
        .unwrap();
    let release_handle: Arc<dyn SessionCallback> = session.clone();
    registry.release(&first, &release_handle).await;
    assert!(first.is_closed());

    let second = registry
        .get_or_create(config, session.clone())
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    // The fresh socket serves traffic.
    second.register_session(0xAAAA, session.clone());
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender
        .send_to(&ike_packet(0xAAAA, 7), second.local_addr())
        .await
        .unwrap();
    assert!(wait_until(|| session.received().len() == 1).await);

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&second, &session).await;
}

#[tokio::test]
async fn test_encap_port_socket_strips_marker() {
    init_tracing();
    let registry = SocketRegistry::new();
    let config =
        SocketConfig::new("[::1]:0".parse().unwrap(), 0, TransportMode::Udp6EncapPort).unwrap();
    let session = RecordingCallback::new();

    let socket = match registry.get_or_create(config, session.clone()).await {
        Ok(socket) => socket,
        // Hosts without IPv6 loopback can't run this test.
        Err(_) => return,
    };
    socket.register_session(0xAAAA, session.clone());

    let sender = UdpSocket::bind("[::1]:0").await.unwrap();

    // IKE message: non-ESP marker, then the message.
    let mut framed = vec![0u8; 4];
    framed.extend_from_slice(&ike_packet(0xAAAA, 1));
    sender.send_to(&framed, socket.local_addr()).await.unwrap();

    // ESP packet: leading non-zero SPI, owned by the kernel datapath.
    let esp = [0x12, 0x34, 0x56, 0x78, 0xAA, 0xBB, 0xCC, 0xDD];
    sender.send_to(&esp, socket.local_addr()).await.unwrap();

    assert!(wait_until(|| session.received().len() == 1).await);
    assert_eq!(session.received(), vec![(0xAAAA, 1)]);
    assert!(wait_until(|| socket.metrics().snapshot().dropped_non_ike == 1).await);

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&socket, &session).await;
}

/// Test double: hands out plain bound sockets in place of the kernel
/// UDP-encapsulation facility.
struct PlainSocketProvider;

#[async_trait::async_trait]
impl ikemux_platform::UdpEncapProvider for PlainSocketProvider {
    async fn open_encap_socket(
        &self,
        local_addr: std::net::SocketAddr,
    ) -> ikemux_platform::PlatformResult<std::net::UdpSocket> {
        Ok(std::net::UdpSocket::bind(local_addr)?)
    }
}

#[tokio::test]
async fn test_udp_encap_socket_via_provider() {
    init_tracing();
    let registry = SocketRegistry::with_encap_provider(Arc::new(PlainSocketProvider));
    let config =
        SocketConfig::new("127.0.0.1:0".parse().unwrap(), 0, TransportMode::UdpEncap).unwrap();
    let session = RecordingCallback::new();

    let socket = registry
        .get_or_create(config, session.clone())
        .await
        .unwrap();
    assert_eq!(socket.server_port(), 4500);
    socket.register_session(0xAAAA, session.clone());

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut framed = vec![0u8; 4];
    framed.extend_from_slice(&ike_packet(0xAAAA, 9));
    sender.send_to(&framed, socket.local_addr()).await.unwrap();

    assert!(wait_until(|| session.received().len() == 1).await);
    assert_eq!(session.received(), vec![(0xAAAA, 9)]);

    let session: Arc<dyn SessionCallback> = session;
    registry.release(&socket, &session).await;
}
