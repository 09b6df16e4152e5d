//! Metrics for the IKE socket layer
//!
//! Provides counters for monitoring socket traffic and drop behavior. All
//! metrics use atomic operations for thread-safe updates from the receive
//! and dispatch tasks.
//!
//! # Example
//!
//! ```
//! use ikemux_proto::ike::metrics::SocketMetrics;
//!
//! let metrics = SocketMetrics::new();
//! metrics.record_received();
//! metrics.record_dispatched();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.packets_received, 1);
//! assert_eq!(snapshot.packets_dispatched, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-socket traffic counters
///
/// Cloning shares the underlying counters, so the socket's tasks and an
/// external monitor can observe the same values.
#[derive(Debug, Clone, Default)]
pub struct SocketMetrics {
    /// Datagrams handed to the dispatch task
    pub packets_received: Arc<AtomicU64>,

    /// Packets delivered to a registered session callback
    pub packets_dispatched: Arc<AtomicU64>,

    /// Packets dropped because no session was registered for the SPI
    pub dropped_unknown_spi: Arc<AtomicU64>,

    /// Packets dropped because the fixed header failed to parse
    pub dropped_malformed: Arc<AtomicU64>,

    /// Packets dropped because the datagram filled the receive buffer
    pub dropped_oversized: Arc<AtomicU64>,

    /// Datagrams dropped at the encapsulation framing layer (no non-ESP marker)
    pub dropped_non_ike: Arc<AtomicU64>,

    /// Datagrams written to the socket
    pub packets_sent: Arc<AtomicU64>,

    /// Send syscall failures (swallowed)
    pub send_failures: Arc<AtomicU64>,
}

/// Point-in-time copy of [`SocketMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Datagrams handed to the dispatch task
    pub packets_received: u64,
    /// Packets delivered to a registered session callback
    pub packets_dispatched: u64,
    /// Packets dropped because no session was registered for the SPI
    pub dropped_unknown_spi: u64,
    /// Packets dropped because the fixed header failed to parse
    pub dropped_malformed: u64,
    /// Packets dropped because the datagram filled the receive buffer
    pub dropped_oversized: u64,
    /// Datagrams dropped at the encapsulation framing layer
    pub dropped_non_ike: u64,
    /// Datagrams written to the socket
    pub packets_sent: u64,
    /// Send syscall failures
    pub send_failures: u64,
}

impl SocketMetrics {
    /// Create a new metrics instance with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a datagram handed to the dispatch task
    pub fn record_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a packet delivered to a session callback
    pub fn record_dispatched(&self) {
        self.packets_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unknown-SPI drop
    pub fn record_unknown_spi(&self) {
        self.dropped_unknown_spi.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed-header drop
    pub fn record_malformed(&self) {
        self.dropped_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an oversized-datagram drop
    pub fn record_oversized(&self) {
        self.dropped_oversized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a framing-layer drop on an encapsulated socket
    pub fn record_non_ike(&self) {
        self.dropped_non_ike.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sent datagram
    pub fn record_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a swallowed send failure
    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_dispatched: self.packets_dispatched.load(Ordering::Relaxed),
            dropped_unknown_spi: self.dropped_unknown_spi.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            dropped_oversized: self.dropped_oversized.load(Ordering::Relaxed),
            dropped_non_ike: self.dropped_non_ike.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}
