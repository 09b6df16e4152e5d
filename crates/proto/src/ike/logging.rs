//! Structured logging for the IKE socket layer
//!
//! Provides structured, contextual logging using the `tracing` framework.
//!
//! # Log Levels
//!
//! - **TRACE**: Per-packet send/receive events
//! - **DEBUG**: SPI registration, demultiplex decisions
//! - **INFO**: Socket lifecycle (open/close)
//! - **WARN**: Dropped datagrams, send failures
//! - **ERROR**: Socket construction failures

use std::net::{IpAddr, SocketAddr};
use tracing::{debug, error, info, trace, warn};

/// Log socket creation
pub fn log_socket_opened(local_addr: SocketAddr, server_port: u16, dscp: u8) {
    info!(
        local = %local_addr,
        server_port = server_port,
        dscp = dscp,
        "IKE socket opened"
    );
}

/// Log socket teardown
pub fn log_socket_closed(local_addr: SocketAddr) {
    info!(local = %local_addr, "IKE socket closed");
}

/// Log socket construction failure
pub fn log_socket_open_failed(error: &str) {
    error!(error = error, "Failed to open IKE socket");
}

/// Log SPI registration on a socket
pub fn log_spi_registered(spi: u64) {
    debug!(spi = %hex::encode(spi.to_be_bytes()), "IKE SPI registered");
}

/// Log SPI removal from a socket
pub fn log_spi_unregistered(spi: u64) {
    debug!(spi = %hex::encode(spi.to_be_bytes()), "IKE SPI unregistered");
}

/// Log an inbound datagram handed to the dispatcher
pub fn log_packet_received(len: usize) {
    trace!(len = len, "Received IKE datagram");
}

/// Log an outbound datagram
pub fn log_packet_sent(dest: IpAddr, port: u16, len: usize) {
    trace!(dest = %dest, port = port, len = len, "Sent IKE datagram");
}

/// Log a swallowed send failure
pub fn log_send_failed(dest: IpAddr, port: u16, error: &str) {
    warn!(dest = %dest, port = port, error = error, "IKE datagram send failed");
}

/// Log a datagram dropped because no session is registered for its SPI
pub fn log_unknown_spi(spi: u64) {
    warn!(
        spi = %hex::encode(spi.to_be_bytes()),
        "Dropping IKE packet for unrecognized SPI"
    );
}

/// Log a datagram dropped because the header failed to parse
pub fn log_malformed_packet(len: usize, error: &str) {
    warn!(len = len, error = error, "Dropping malformed IKE datagram");
}

/// Log a datagram dropped because it filled the receive buffer
pub fn log_oversized_packet() {
    warn!("Dropping oversized IKE datagram");
}

/// Log a datagram dropped at the encapsulation framing layer
pub fn log_non_ike_packet(len: usize) {
    trace!(len = len, "Dropping non-IKE datagram on encapsulated socket");
}
