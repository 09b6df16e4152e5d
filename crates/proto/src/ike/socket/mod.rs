//! Shared IKE sockets with SPI demultiplexing
//!
//! One [`IkeSocket`] owns one OS datagram socket and serves every IKE
//! session using that socket's configuration. Two tasks run per socket:
//!
//! - a **receive task** that does nothing but blocking reads, so inbound
//!   datagrams are never missed while sessions run, and
//! - a **dispatch task**, fed by a bounded channel, that parses the fixed
//!   header, selects the locally-generated SPI and invokes the registered
//!   session callback.
//!
//! All callback invocations for one socket happen serially on its dispatch
//! task, in packet-arrival order. Unrecognized SPIs, malformed headers and
//! oversized datagrams are logged, counted and dropped; none of them tear
//! the socket down.

pub mod config;
pub mod registry;
pub mod transport;

pub use config::SocketConfig;
pub use registry::SocketRegistry;
pub use transport::{
    Transport, TransportMode, NON_ESP_MARKER, SERVER_PORT_NON_UDP_ENCAPSULATED,
    SERVER_PORT_UDP_ENCAPSULATED,
};

use super::header::IkeHeader;
use super::logging;
use super::metrics::SocketMetrics;
use super::session::SessionCallback;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Receive buffer size in bytes.
///
/// IKE messages are bounded well below this by fragmentation; a datagram
/// that fills the buffer is definitely non-conformant and is dropped.
pub const RECV_BUFFER_LEN: usize = 4096;

/// Depth of the bounded channel between the receive and dispatch tasks.
const PACKET_QUEUE_DEPTH: usize = 64;

/// One shared IKE socket: a single datagram channel demultiplexed to many
/// sessions by locally-generated SPI.
///
/// Created through [`SocketRegistry::get_or_create`], which guarantees at
/// most one live instance per [`SocketConfig`]. The socket holds callbacks
/// only to route packets; it never owns the sessions behind them.
pub struct IkeSocket {
    /// Configuration this socket was created for
    config: SocketConfig,

    /// Exclusively-owned OS socket plus variant behavior
    transport: Arc<Transport>,

    /// SPI -> session callback table, read by the dispatch task
    spi_table: Arc<Mutex<HashMap<u64, Arc<dyn SessionCallback>>>>,

    /// Callbacks registered through the registry (reference count)
    registered: Mutex<Vec<Arc<dyn SessionCallback>>>,

    /// Traffic counters shared with both tasks
    metrics: SocketMetrics,

    recv_task: Mutex<Option<JoinHandle<()>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl IkeSocket {
    /// Take ownership of a bound transport and start the receive and
    /// dispatch tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: SocketConfig, transport: Transport) -> Arc<Self> {
        let transport = Arc::new(transport);
        let spi_table: Arc<Mutex<HashMap<u64, Arc<dyn SessionCallback>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let metrics = SocketMetrics::new();

        let (packet_tx, packet_rx) = mpsc::channel(PACKET_QUEUE_DEPTH);

        let recv_task = tokio::spawn(receive_loop(Arc::clone(&transport), packet_tx));
        let dispatch_task = tokio::spawn(dispatch_loop(
            Arc::clone(&transport),
            Arc::clone(&spi_table),
            metrics.clone(),
            packet_rx,
        ));

        logging::log_socket_opened(transport.local_addr(), transport.server_port(), config.dscp());

        Arc::new(IkeSocket {
            config,
            transport,
            spi_table,
            registered: Mutex::new(Vec::new()),
            metrics,
            recv_task: Mutex::new(Some(recv_task)),
            dispatch_task: Mutex::new(Some(dispatch_task)),
            closed: AtomicBool::new(false),
        })
    }

    /// Configuration this socket was created for
    pub fn config(&self) -> SocketConfig {
        self.config
    }

    /// Address the underlying socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Destination port peers are reached on (500 plain, 4500 encapsulated)
    pub fn server_port(&self) -> u16 {
        self.transport.server_port()
    }

    /// Traffic counters for this socket
    pub fn metrics(&self) -> &SocketMetrics {
        &self.metrics
    }

    /// Route packets bearing `spi` to `callback`.
    ///
    /// Registering an already-present SPI silently replaces the previous
    /// entry; unique SPI generation upstream is trusted, not re-validated
    /// here.
    pub fn register_session(&self, spi: u64, callback: Arc<dyn SessionCallback>) {
        self.spi_table.lock().insert(spi, callback);
        logging::log_spi_registered(spi);
    }

    /// Stop routing packets bearing `spi`.
    ///
    /// A later packet carrying that SPI is logged and dropped, not treated
    /// as fatal.
    pub fn unregister_session(&self, spi: u64) {
        if self.spi_table.lock().remove(&spi).is_some() {
            logging::log_spi_unregistered(spi);
        }
    }

    /// Number of SPIs currently registered
    pub fn registered_spi_count(&self) -> usize {
        self.spi_table.lock().len()
    }

    /// Send one IKE packet to `dest` on the server port.
    ///
    /// Fire-and-forget datagram semantics: a send failure is logged and
    /// counted but not surfaced, consistent with UDP.
    pub async fn send_packet(&self, packet: &[u8], dest: IpAddr) {
        match self.transport.send_to(packet, dest).await {
            Ok(len) => {
                logging::log_packet_sent(dest, self.server_port(), len);
                self.metrics.record_sent();
            }
            Err(e) => {
                logging::log_send_failed(dest, self.server_port(), &e.to_string());
                self.metrics.record_send_failure();
            }
        }
    }

    /// Close the socket.
    ///
    /// Idempotent. Stops both tasks; dropping their transport references
    /// closes the descriptor. Pending unprocessed datagrams are discarded.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.recv_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.dispatch_task.lock().take() {
            task.abort();
        }
        logging::log_socket_closed(self.transport.local_addr());
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Count `callback` as a user of this socket.
    pub(crate) fn register_callback(&self, callback: Arc<dyn SessionCallback>) {
        self.registered.lock().push(callback);
    }

    /// Remove `callback` from the user set and return how many remain.
    ///
    /// Matching is by callback identity (`Arc::ptr_eq`), mirroring
    /// registration.
    pub(crate) fn release_callback(&self, callback: &Arc<dyn SessionCallback>) -> usize {
        let mut registered = self.registered.lock();
        if let Some(pos) = registered.iter().position(|c| Arc::ptr_eq(c, callback)) {
            registered.remove(pos);
        }
        registered.len()
    }

    /// Number of callbacks currently registered against this socket
    pub fn registered_callbacks(&self) -> usize {
        self.registered.lock().len()
    }
}

impl Drop for IkeSocket {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for IkeSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IkeSocket")
            .field("config", &self.config)
            .field("local_addr", &self.transport.local_addr())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

/// Blocking-read loop: reads datagrams and forwards them, in arrival
/// order, over the bounded channel. Exits on read error or when the
/// dispatch side goes away.
async fn receive_loop(transport: Arc<Transport>, queue: mpsc::Sender<Vec<u8>>) {
    let mut buf = vec![0u8; RECV_BUFFER_LEN];
    loop {
        match transport.recv_from(&mut buf).await {
            Ok((0, _)) => continue,
            Ok((n, _)) => {
                // A datagram filling the buffer cannot be a conformant IKE
                // message; forward a zero-length marker instead of bytes.
                let packet = if n >= RECV_BUFFER_LEN {
                    Vec::new()
                } else {
                    buf[..n].to_vec()
                };
                if queue.send(packet).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "IKE socket read failed, stopping receive loop");
                break;
            }
        }
    }
}

/// Single-consumer dispatch loop: preserves one-packet-at-a-time handling
/// order for the socket.
async fn dispatch_loop(
    transport: Arc<Transport>,
    spi_table: Arc<Mutex<HashMap<u64, Arc<dyn SessionCallback>>>>,
    metrics: SocketMetrics,
    mut queue: mpsc::Receiver<Vec<u8>>,
) {
    while let Some(packet) = queue.recv().await {
        handle_packet(&transport, &spi_table, &metrics, &packet);
    }
}

/// Parse one inbound datagram and hand it to the owning session.
///
/// Every failure mode here is a per-datagram drop: unknown SPI, malformed
/// or truncated header, the oversized zero-length marker, and (on
/// encapsulated sockets) datagrams without the non-ESP marker.
fn handle_packet(
    transport: &Transport,
    spi_table: &Mutex<HashMap<u64, Arc<dyn SessionCallback>>>,
    metrics: &SocketMetrics,
    packet: &[u8],
) {
    metrics.record_received();

    if packet.is_empty() {
        logging::log_oversized_packet();
        metrics.record_oversized();
        return;
    }

    logging::log_packet_received(packet.len());

    let message = match transport.unframe_inbound(packet) {
        Some(message) => message,
        None => {
            logging::log_non_ike_packet(packet.len());
            metrics.record_non_ike();
            return;
        }
    };

    let header = match IkeHeader::from_bytes(message) {
        Ok(header) => header,
        Err(e) => {
            logging::log_malformed_packet(message.len(), &e.to_string());
            metrics.record_malformed();
            return;
        }
    };

    let spi = header.local_spi();
    let callback = spi_table.lock().get(&spi).cloned();

    match callback {
        Some(callback) => {
            metrics.record_dispatched();
            callback.on_ike_packet(&header, message);
        }
        None => {
            logging::log_unknown_spi(spi);
            metrics.record_unknown_spi();
        }
    }
}
