//! Negotiated crypto transforms for IKE sessions
//!
//! Wraps each negotiated algorithm identifier into a transform object with
//! fixed key/IV/checksum geometry:
//!
//! - [`IkeCipher`] - encryption transforms (RFC 7296 transform type 1),
//!   AEAD and classic, with RFC 5282 salt/nonce handling
//! - [`IkeMacIntegrity`] - integrity transforms (transform type 3) with
//!   truncated checksums
//!
//! Both translate into kernel IPsec offload descriptors via their
//! `to_offload` methods. AES-XCBC, which general-purpose crypto libraries
//! rarely ship, is implemented locally in `xcbc`.

pub mod cipher;
pub mod integrity;
mod xcbc;

pub use cipher::{CipherId, IkeCipher};
pub use integrity::{IkeMacIntegrity, IntegrityId};
