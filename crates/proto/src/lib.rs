//! Protocol-layer building blocks for the ikemux security stack.
//!
//! This crate currently provides one module:
//!
//! - **IKE socket layer** (`ike`) - shared UDP/UDP-encapsulated sockets for
//!   IKEv2 traffic, demultiplexed to sessions by locally-generated SPI,
//!   plus the negotiated cipher/integrity transforms and their kernel
//!   offload descriptors.
//!
//! # Features
//!
//! - `ike` (default) - IKE socket, demultiplexing and transform support
//!
//! # Example
//!
//! ```
//! use ikemux_proto::ike::IkeHeader;
//!
//! // Parse the fixed IKE header from an inbound datagram
//! let mut datagram = vec![0u8; 28];
//! datagram[17] = 0x20; // IKEv2
//! datagram[24..28].copy_from_slice(&28u32.to_be_bytes());
//!
//! let header = IkeHeader::from_bytes(&datagram).unwrap();
//! assert_eq!(header.message_id, 0);
//! ```
//!
//! # Security
//!
//! - All cryptographic operations use vetted RustCrypto implementations
//! - Constant-time comparison for integrity checksums
//! - Key-bearing offload descriptors are zeroized on drop
//! - No unsafe code

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(feature = "ike")]
pub mod ike;
