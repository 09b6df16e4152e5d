//! Transport variants for IKE sockets
//!
//! One [`Transport`] owns the OS datagram socket exclusively. The variant
//! decides three things: the fixed server port (500 plain, 4500
//! encapsulated, RFC 7296/3948), whether datagrams carry the 4-byte
//! non-ESP marker, and which address family the socket binds.
//!
//! ```text
//! UDP payload on port 4500:
//! +-------------------+
//! | Non-ESP Marker    | (4 bytes of zeros: 0x00000000) -> IKE, to userspace
//! +-------------------+
//! | IKE Message       |
//! +-------------------+
//!
//! | ESP Packet        | (starts with a non-zero SPI)   -> kernel datapath
//! ```

use super::config::SocketConfig;
use crate::ike::{Error, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;

/// IKE server port without UDP encapsulation (RFC 7296)
pub const SERVER_PORT_NON_UDP_ENCAPSULATED: u16 = 500;

/// IKE server port with UDP encapsulation (RFC 3948)
pub const SERVER_PORT_UDP_ENCAPSULATED: u16 = 4500;

/// Non-ESP marker prepended to IKE messages on encapsulated sockets.
///
/// Distinguishes IKE messages from ESP packets sharing port 4500; ESP
/// packets start with a non-zero SPI.
pub const NON_ESP_MARKER: [u8; 4] = [0, 0, 0, 0];

/// Transport variant for one IKE socket.
///
/// Replaces per-variant subclassing with a tagged variant selected at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    /// Plain IPv4 UDP, server port 500
    Udp4,
    /// Plain IPv6 UDP, server port 500
    Udp6,
    /// IPv6 UDP on the encapsulation port 4500, non-ESP marker framing
    Udp6EncapPort,
    /// Kernel UDP-encapsulation socket (IPv4), server port 4500; the
    /// descriptor comes pre-bound from a [`ikemux_platform::UdpEncapProvider`]
    UdpEncap,
}

impl TransportMode {
    /// Destination port IKE peers are reached on in this mode
    pub fn server_port(&self) -> u16 {
        match self {
            TransportMode::Udp4 | TransportMode::Udp6 => SERVER_PORT_NON_UDP_ENCAPSULATED,
            TransportMode::Udp6EncapPort | TransportMode::UdpEncap => {
                SERVER_PORT_UDP_ENCAPSULATED
            }
        }
    }

    /// Whether datagrams in this mode carry the non-ESP marker
    pub fn uses_encap_marker(&self) -> bool {
        matches!(self, TransportMode::Udp6EncapPort | TransportMode::UdpEncap)
    }

    /// Whether this mode binds an IPv4 socket
    pub fn is_ipv4(&self) -> bool {
        matches!(self, TransportMode::Udp4 | TransportMode::UdpEncap)
    }
}

/// One bound datagram socket plus its variant behavior.
#[derive(Debug)]
pub struct Transport {
    socket: UdpSocket,
    mode: TransportMode,
    local_addr: SocketAddr,
}

impl Transport {
    /// Create and bind a socket for `config`, applying the traffic-class
    /// socket option before binding.
    ///
    /// # Errors
    ///
    /// Socket creation, option setup or bind failure is construction-fatal
    /// and surfaced as [`Error::Io`]; there is no retry.
    pub async fn bind(config: &SocketConfig) -> Result<Self> {
        let mode = config.mode();
        let domain = if mode.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        if mode.is_ipv4() {
            socket.set_tos(config.traffic_class())?;
        } else {
            socket.set_tclass_v6(config.traffic_class())?;
        }
        socket.set_nonblocking(true)?;
        socket.bind(&config.local_addr().into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        let local_addr = socket.local_addr()?;

        Ok(Transport {
            socket,
            mode,
            local_addr,
        })
    }

    /// Wrap a pre-bound kernel UDP-encapsulation socket.
    ///
    /// The descriptor comes from the host's encapsulation facility and is
    /// already bound; this transport takes exclusive ownership of it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the descriptor cannot be registered with
    /// the async runtime.
    pub fn from_encap_socket(socket: std::net::UdpSocket) -> Result<Self> {
        socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(socket)?;
        let local_addr = socket.local_addr()?;

        Ok(Transport {
            socket,
            mode: TransportMode::UdpEncap,
            local_addr,
        })
    }

    /// Transport variant
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Destination port IKE peers are reached on
    pub fn server_port(&self) -> u16 {
        self.mode.server_port()
    }

    /// Receive one datagram into `buf`.
    pub async fn recv_from(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    /// Send one IKE packet to `dest` on the mode's server port, applying
    /// encapsulation framing where required.
    pub async fn send_to(&self, packet: &[u8], dest: IpAddr) -> std::io::Result<usize> {
        let target = SocketAddr::new(dest, self.server_port());
        if self.mode.uses_encap_marker() {
            let framed = frame_ike_packet(packet);
            self.socket.send_to(&framed, target).await
        } else {
            self.socket.send_to(packet, target).await
        }
    }

    /// Strip encapsulation framing from an inbound datagram.
    ///
    /// Returns the IKE message bytes, or `None` for datagrams this layer
    /// must not dispatch: on encapsulated sockets, anything without the
    /// non-ESP marker is ESP traffic owned by the kernel datapath.
    pub fn unframe_inbound<'a>(&self, datagram: &'a [u8]) -> Option<&'a [u8]> {
        if !self.mode.uses_encap_marker() {
            return Some(datagram);
        }
        strip_ike_framing(datagram)
    }
}

/// Prepend the non-ESP marker to an outbound IKE message.
pub fn frame_ike_packet(packet: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(NON_ESP_MARKER.len() + packet.len());
    framed.extend_from_slice(&NON_ESP_MARKER);
    framed.extend_from_slice(packet);
    framed
}

/// Strip the non-ESP marker from an inbound datagram, or `None` if absent.
pub fn strip_ike_framing(datagram: &[u8]) -> Option<&[u8]> {
    if datagram.len() < NON_ESP_MARKER.len() {
        return None;
    }
    if datagram[..NON_ESP_MARKER.len()] == NON_ESP_MARKER {
        Some(&datagram[NON_ESP_MARKER.len()..])
    } else {
        None
    }
}
