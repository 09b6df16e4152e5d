//! Locally-generated SPI allocation
//!
//! Each IKE SA is identified by an 8-byte SPI chosen by each peer. The
//! locally chosen one is the demultiplex key for the shared socket, so it
//! must be unique across every session registered on a socket. Uniqueness
//! is the caller's contract (the table does not re-validate); drawing SPIs
//! from one process-wide generator makes collisions a birthday problem on
//! 64 bits rather than something sessions have to coordinate.

use rand::RngCore;

/// Generator for locally-chosen 64-bit IKE SPIs.
///
/// Zero is never returned: a zero responder SPI on the wire means "not yet
/// assigned" in an IKE_SA_INIT request (RFC 7296 Section 3.1).
#[derive(Debug, Default, Clone, Copy)]
pub struct IkeSpiGenerator;

impl IkeSpiGenerator {
    /// Create a new SPI generator
    pub fn new() -> Self {
        IkeSpiGenerator
    }

    /// Allocate a random non-zero SPI.
    pub fn next_spi(&self) -> u64 {
        let mut rng = rand::thread_rng();
        loop {
            let spi = rng.next_u64();
            if spi != 0 {
                return spi;
            }
        }
    }
}
