//! Process-wide socket registry
//!
//! Maps socket configurations to live shared sockets, enforcing the
//! one-OS-socket-per-configuration invariant. The registry is an explicit
//! object constructed once and handed (dependency-injected) to
//! session-creation code; there is no hidden global table.

use super::config::SocketConfig;
use super::transport::{Transport, TransportMode};
use super::IkeSocket;
use crate::ike::logging;
use crate::ike::session::SessionCallback;
use crate::ike::{Error, Result};
use ikemux_platform::UdpEncapProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry of shared IKE sockets, keyed by [`SocketConfig`].
///
/// Every lookup-or-create and release runs under one lock, so no two
/// sockets can ever exist concurrently for structurally-equal
/// configurations. Sockets are reference-counted by registered callback:
/// when the last session releases a socket it is closed and removed, and a
/// later [`get_or_create`](Self::get_or_create) builds a fresh one.
pub struct SocketRegistry {
    sockets: Mutex<HashMap<SocketConfig, Arc<IkeSocket>>>,
    encap_provider: Option<Arc<dyn UdpEncapProvider>>,
}

impl SocketRegistry {
    /// Create an empty registry without UDP-encapsulation support.
    ///
    /// [`TransportMode::UdpEncap`] configurations will be rejected; use
    /// [`with_encap_provider`](Self::with_encap_provider) when the host
    /// offers the kernel facility.
    pub fn new() -> Self {
        SocketRegistry {
            sockets: Mutex::new(HashMap::new()),
            encap_provider: None,
        }
    }

    /// Create a registry that obtains kernel UDP-encapsulation sockets
    /// from `provider`.
    pub fn with_encap_provider(provider: Arc<dyn UdpEncapProvider>) -> Self {
        SocketRegistry {
            sockets: Mutex::new(HashMap::new()),
            encap_provider: Some(provider),
        }
    }

    /// Return the shared socket for `config`, creating it on first use,
    /// and register `callback` as one of its users.
    ///
    /// # Errors
    ///
    /// Socket creation or bind failure is surfaced synchronously as
    /// [`Error::Io`] with nothing inserted; there is no retry. Session
    /// setup must fail over this.
    pub async fn get_or_create(
        &self,
        config: SocketConfig,
        callback: Arc<dyn SessionCallback>,
    ) -> Result<Arc<IkeSocket>> {
        let mut sockets = self.sockets.lock().await;

        if let Some(socket) = sockets.get(&config) {
            socket.register_callback(callback);
            return Ok(Arc::clone(socket));
        }

        let transport = match self.open_transport(&config).await {
            Ok(transport) => transport,
            Err(e) => {
                logging::log_socket_open_failed(&e.to_string());
                return Err(e);
            }
        };

        let socket = IkeSocket::open(config, transport);
        socket.register_callback(callback);
        sockets.insert(config, Arc::clone(&socket));

        Ok(socket)
    }

    /// Release `callback`'s reference on `socket`.
    ///
    /// When the last registered callback is released, the socket is closed
    /// and removed from the registry. SPI registrations still present die
    /// with the socket; sessions get no survival guarantee beyond the
    /// reference count they hold.
    pub async fn release(&self, socket: &Arc<IkeSocket>, callback: &Arc<dyn SessionCallback>) {
        let mut sockets = self.sockets.lock().await;

        if socket.release_callback(callback) == 0 {
            socket.close();
            sockets.remove(&socket.config());
        }
    }

    /// Number of live sockets in the registry
    pub async fn socket_count(&self) -> usize {
        self.sockets.lock().await.len()
    }

    async fn open_transport(&self, config: &SocketConfig) -> Result<Transport> {
        match config.mode() {
            TransportMode::UdpEncap => {
                let provider = self.encap_provider.as_ref().ok_or_else(|| {
                    Error::InvalidParameter(
                        "no UDP-encapsulation provider configured".to_string(),
                    )
                })?;
                let socket = provider
                    .open_encap_socket(config.local_addr())
                    .await
                    .map_err(|e| Error::Io(e.to_string()))?;
                Transport::from_encap_socket(socket)
            }
            _ => Transport::bind(config).await,
        }
    }
}

impl Default for SocketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SocketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketRegistry")
            .field("has_encap_provider", &self.encap_provider.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ike::header::IkeHeader;

    struct NullCallback;

    impl SessionCallback for NullCallback {
        fn on_ike_packet(&self, _header: &IkeHeader, _packet: &[u8]) {}
    }

    fn callback() -> Arc<dyn SessionCallback> {
        Arc::new(NullCallback)
    }

    fn loopback_config() -> SocketConfig {
        SocketConfig::new("127.0.0.1:0".parse().unwrap(), 0, TransportMode::Udp4).unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_socket() {
        let registry = SocketRegistry::new();
        let config = loopback_config();

        let a = registry.get_or_create(config, callback()).await.unwrap();
        let b = registry.get_or_create(config, callback()).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.socket_count().await, 1);
        assert_eq!(a.registered_callbacks(), 2);
    }

    #[tokio::test]
    async fn test_release_to_zero_closes_socket() {
        let registry = SocketRegistry::new();
        let config = loopback_config();
        let cb_a = callback();
        let cb_b = callback();

        let socket = registry.get_or_create(config, cb_a.clone()).await.unwrap();
        registry.get_or_create(config, cb_b.clone()).await.unwrap();

        registry.release(&socket, &cb_a).await;
        assert!(!socket.is_closed());
        assert_eq!(registry.socket_count().await, 1);

        registry.release(&socket, &cb_b).await;
        assert!(socket.is_closed());
        assert_eq!(registry.socket_count().await, 0);
    }

    #[tokio::test]
    async fn test_fresh_socket_after_release() {
        let registry = SocketRegistry::new();
        let config = loopback_config();
        let cb = callback();

        let first = registry.get_or_create(config, cb.clone()).await.unwrap();
        registry.release(&first, &cb).await;

        let second = registry.get_or_create(config, cb.clone()).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!second.is_closed());

        registry.release(&second, &cb).await;
    }

    #[tokio::test]
    async fn test_distinct_configs_get_distinct_sockets() {
        let registry = SocketRegistry::new();
        let low = SocketConfig::new("127.0.0.1:0".parse().unwrap(), 0, TransportMode::Udp4)
            .unwrap();
        let high = SocketConfig::new("127.0.0.1:0".parse().unwrap(), 46, TransportMode::Udp4)
            .unwrap();

        let a = registry.get_or_create(low, callback()).await.unwrap();
        let b = registry.get_or_create(high, callback()).await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.socket_count().await, 2);
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal_and_inserts_nothing() {
        let registry = SocketRegistry::new();
        // 203.0.113.1 (TEST-NET-3) is not a local address; bind must fail.
        let config = SocketConfig::new("203.0.113.1:0".parse().unwrap(), 0, TransportMode::Udp4)
            .unwrap();

        let result = registry.get_or_create(config, callback()).await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(registry.socket_count().await, 0);
    }

    #[tokio::test]
    async fn test_encap_mode_requires_provider() {
        let registry = SocketRegistry::new();
        let config = SocketConfig::new("127.0.0.1:0".parse().unwrap(), 0, TransportMode::UdpEncap)
            .unwrap();

        let result = registry.get_or_create(config, callback()).await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}
