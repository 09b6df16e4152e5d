//! IKE packet socket and transform layer
//!
//! This module implements the socket, demultiplexing and crypto-transform
//! substrate that IKEv2 (RFC 7296) sessions are built on:
//!
//! - **Shared sockets**: one UDP (or UDP-encapsulated, RFC 3948) socket per
//!   local network configuration, shared by every IKE session using that
//!   configuration and reference-counted through a [`SocketRegistry`].
//! - **SPI demultiplexing**: inbound datagrams are parsed just far enough
//!   to extract the locally-generated SPI from the fixed header, then
//!   dispatched to the owning session's [`SessionCallback`] in strict
//!   arrival order.
//! - **Crypto transforms**: negotiated cipher ([`IkeCipher`]) and
//!   integrity ([`IkeMacIntegrity`]) algorithms with wire-correct
//!   key/IV/salt/tag handling, plus translation into kernel IPsec offload
//!   descriptors ([`OffloadAlgorithm`]).
//!
//! # Architecture
//!
//! ```text
//! OS socket (UDP 500 / 4500)
//!   └── receive task (blocking reads, one per socket)
//!         └── bounded channel, arrival order preserved
//!               └── dispatch task (one per socket)
//!                     ├── parse fixed IKE header
//!                     ├── select locally-generated SPI
//!                     └── SPI table lookup -> SessionCallback
//! ```
//!
//! Sending is fire-and-forget datagram semantics: transient send failures
//! are logged and counted, never surfaced to the session.
//!
//! # Example
//!
//! ```no_run
//! use ikemux_proto::ike::{
//!     IkeHeader, SessionCallback, SocketConfig, SocketRegistry, TransportMode,
//! };
//! use std::sync::Arc;
//!
//! struct Session;
//!
//! impl SessionCallback for Session {
//!     fn on_ike_packet(&self, header: &IkeHeader, packet: &[u8]) {
//!         println!("received {} bytes, message id {}", packet.len(), header.message_id);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SocketRegistry::new();
//!     let config = SocketConfig::new(
//!         "0.0.0.0:0".parse()?,
//!         0, // DSCP
//!         TransportMode::Udp4,
//!     )?;
//!
//!     let callback: Arc<dyn SessionCallback> = Arc::new(Session);
//!     let socket = registry.get_or_create(config, callback.clone()).await?;
//!
//!     socket.register_session(0x1122334455667788, callback.clone());
//!     socket.send_packet(b"...", "203.0.113.9".parse()?).await;
//!
//!     registry.release(&socket, &callback).await;
//!     Ok(())
//! }
//! ```
//!
//! # References
//!
//! - [RFC 7296](https://datatracker.ietf.org/doc/html/rfc7296) - IKEv2 Protocol
//! - [RFC 3948](https://datatracker.ietf.org/doc/html/rfc3948) - UDP Encapsulation
//! - [RFC 5282](https://datatracker.ietf.org/doc/html/rfc5282) - AEAD in IKEv2

pub mod crypto;
pub mod error;
pub mod header;
pub mod logging;
pub mod metrics;
pub mod offload;
pub mod session;
pub mod socket;
pub mod spi;

// Re-export commonly used types
pub use crypto::{CipherId, IkeCipher, IkeMacIntegrity, IntegrityId};
pub use error::{Error, Result};
pub use header::{IkeFlags, IkeHeader};
pub use offload::OffloadAlgorithm;
pub use session::SessionCallback;
pub use socket::{IkeSocket, SocketConfig, SocketRegistry, TransportMode};
pub use spi::IkeSpiGenerator;
