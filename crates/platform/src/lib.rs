//! # ikemux Platform
//!
//! Core platform types and traits for the ikemux IKE socket layer.
//!
//! This crate provides:
//! - Unified error types (`PlatformError`, `PlatformResult`)
//! - Trait seams for OS collaborators (`UdpEncapProvider`, `SaInstaller`)
//!
//! The protocol crate (`ikemux-proto`) treats the kernel facilities it
//! depends on as opaque providers behind these traits: a UDP-encapsulation
//! socket factory that yields a pre-bound descriptor, and an IPsec SA
//! installer that consumes negotiated-algorithm descriptors.
//!
//! # Examples
//!
//! ```
//! use ikemux_platform::{PlatformError, PlatformResult};
//!
//! fn example_function() -> PlatformResult<String> {
//!     Ok("Hello, ikemux!".to_string())
//! }
//!
//! # fn main() -> PlatformResult<()> {
//! let result = example_function()?;
//! assert_eq!(result, "Hello, ikemux!");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;

pub use error::{PlatformError, PlatformResult};
pub use traits::{SaInstaller, UdpEncapProvider};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
