//! Socket configuration
//!
//! A [`SocketConfig`] identifies one local network attachment point for IKE
//! traffic. It is the registry's map key: structurally equal configurations
//! always share one OS socket.

use super::transport::TransportMode;
use crate::ike::{Error, Result};
use std::net::SocketAddr;

/// Maximum DSCP value (6 bits)
const MAX_DSCP: u8 = 63;

/// Immutable key identifying one shared IKE socket.
///
/// Equality is structural: two configs with the same local address, DSCP
/// and transport mode refer to the same socket. The config outlives its
/// socket only in the sense that callers may retain copies; the registry
/// drops its entry when the last session releases the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketConfig {
    local_addr: SocketAddr,
    dscp: u8,
    mode: TransportMode,
}

impl SocketConfig {
    /// Create a new socket configuration.
    ///
    /// # Arguments
    ///
    /// * `local_addr` - Local address to bind (port 0 lets the OS choose)
    /// * `dscp` - Differentiated-services code point for outbound IKE
    ///   packets, 0..=63
    /// * `mode` - Transport variant for this socket
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `dscp` exceeds 6 bits or the
    /// address family does not match the transport mode.
    pub fn new(local_addr: SocketAddr, dscp: u8, mode: TransportMode) -> Result<Self> {
        if dscp > MAX_DSCP {
            return Err(Error::InvalidParameter(format!(
                "DSCP {} exceeds 6-bit range",
                dscp
            )));
        }

        if local_addr.is_ipv4() != mode.is_ipv4() {
            return Err(Error::InvalidParameter(format!(
                "address {} does not match transport mode {:?}",
                local_addr, mode
            )));
        }

        Ok(SocketConfig {
            local_addr,
            dscp,
            mode,
        })
    }

    /// Local address the socket binds to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Configured DSCP value
    pub fn dscp(&self) -> u8 {
        self.dscp
    }

    /// Transport variant
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// The IPv4 TOS / IPv6 traffic-class byte for this configuration.
    ///
    /// DSCP occupies the top 6 bits; the ECN bits are left zero.
    pub fn traffic_class(&self) -> u32 {
        (self.dscp as u32) << 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn v4_config(dscp: u8) -> Result<SocketConfig> {
        SocketConfig::new("127.0.0.1:0".parse().unwrap(), dscp, TransportMode::Udp4)
    }

    #[test]
    fn test_structural_equality() {
        let a = v4_config(46).unwrap();
        let b = v4_config(46).unwrap();
        let c = v4_config(0).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut map = HashMap::new();
        map.insert(v4_config(46).unwrap(), "socket");

        assert_eq!(map.get(&v4_config(46).unwrap()), Some(&"socket"));
        assert_eq!(map.get(&v4_config(10).unwrap()), None);
    }

    #[test]
    fn test_traffic_class_shifts_dscp() {
        // DSCP EF (46) -> TOS 0xb8
        assert_eq!(v4_config(46).unwrap().traffic_class(), 0xb8);
        assert_eq!(v4_config(0).unwrap().traffic_class(), 0);
        assert_eq!(v4_config(63).unwrap().traffic_class(), 0xfc);
    }

    #[test]
    fn test_dscp_out_of_range() {
        let result = v4_config(64);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_address_family_mismatch() {
        let result = SocketConfig::new("127.0.0.1:0".parse().unwrap(), 0, TransportMode::Udp6);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let result = SocketConfig::new("[::1]:0".parse().unwrap(), 0, TransportMode::Udp4);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_mode_distinguishes_configs() {
        let plain = SocketConfig::new("[::1]:0".parse().unwrap(), 0, TransportMode::Udp6).unwrap();
        let encap =
            SocketConfig::new("[::1]:0".parse().unwrap(), 0, TransportMode::Udp6EncapPort).unwrap();

        assert_ne!(plain, encap);
    }
}
