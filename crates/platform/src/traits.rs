//! Trait seams for the OS facilities ikemux depends on
//!
//! The protocol layer never opens kernel UDP-encapsulation sockets or
//! programs IPsec SAs itself. Both facilities are host-specific; they are
//! modeled here as opaque providers so the protocol crate can be tested
//! against mocks and deployed against whatever the host actually offers.

use crate::PlatformResult;
use std::net::{SocketAddr, UdpSocket};

/// Factory for kernel UDP-encapsulation sockets (RFC 3948).
///
/// A UDP-encapsulation socket is a descriptor the kernel has marked with
/// `UDP_ENCAP_ESPINUDP` (or the host's equivalent): ESP packets arriving on
/// it are consumed by the kernel IPsec datapath, while IKE packets carrying
/// the non-ESP marker are delivered to userspace. The provider returns a
/// pre-bound, otherwise ordinary datagram socket; the protocol layer treats
/// it as a plain file descriptor plus send/receive.
#[async_trait::async_trait]
pub trait UdpEncapProvider: Send + Sync {
    /// Open a UDP-encapsulation socket bound to `local_addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not support UDP encapsulation or
    /// socket creation/bind fails.
    async fn open_encap_socket(&self, local_addr: SocketAddr) -> PlatformResult<UdpSocket>;
}

/// Installer for kernel IPsec (ESP) Security Associations.
///
/// Consumes the offload descriptor built by the protocol layer: a kernel
/// algorithm name, the raw key material, and the truncated-tag length in
/// bits. Installation itself (netlink/XFRM, PF_KEY, a vendor HAL) is the
/// implementor's concern.
#[async_trait::async_trait]
pub trait SaInstaller: Send + Sync {
    /// Install one SA algorithm into the kernel datapath.
    ///
    /// # Arguments
    ///
    /// * `algorithm` - Kernel algorithm name (e.g. `rfc4106(gcm(aes))`)
    /// * `key` - Raw key material, salt included where the algorithm folds
    ///   one into the key
    /// * `truncation_bits` - Truncated ICV/tag length in bits, 0 for pure
    ///   encryption algorithms
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel rejects the algorithm or key.
    async fn install(
        &self,
        algorithm: &str,
        key: &[u8],
        truncation_bits: u32,
    ) -> PlatformResult<()>;
}
