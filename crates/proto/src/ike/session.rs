//! Session callback handle
//!
//! Each IKE session registers one callback per locally-generated SPI. The
//! callback is a capability handle, not the session itself: the socket
//! layer holds a reference only to route packets, and must never be the
//! only thing keeping a session alive. Implementations typically forward
//! into the session's own channel or state machine.

use super::header::IkeHeader;

/// Callback invoked by the socket layer for each inbound IKE packet that
/// demultiplexes to a registered SPI.
///
/// Invocations for a given socket happen serially on that socket's
/// dispatch task, in packet-arrival order. Implementations must not block:
/// a slow callback stalls every session sharing the socket.
pub trait SessionCallback: Send + Sync {
    /// Handle one inbound IKE packet.
    ///
    /// # Arguments
    ///
    /// * `header` - Parsed fixed IKE header
    /// * `packet` - The complete datagram payload, header included, with
    ///   any UDP-encapsulation framing already stripped
    fn on_ike_packet(&self, header: &IkeHeader, packet: &[u8]);
}
