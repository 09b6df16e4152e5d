//! Error types for the IKE socket and transform layer
//!
//! One unified error type covers socket construction, header parsing and
//! the crypto transforms. Authentication failure on decrypt is a distinct
//! variant: callers treat a bad tag as a protocol-level rejection of the
//! datagram, not a local fault.

use std::fmt;

/// Result type for IKE socket and transform operations
pub type Result<T> = std::result::Result<T, Error>;

/// IKE socket and transform errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer too short for operation
    BufferTooShort {
        /// Required length
        required: usize,
        /// Available length
        available: usize,
    },

    /// Unsupported protocol version
    UnsupportedVersion(u8),

    /// Invalid packet length
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Message too large
    MessageTooLarge(u32),

    /// Key length does not match the algorithm's required length
    InvalidKeyLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// IV length does not match the algorithm's required length
    InvalidIvLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Unsupported or unknown algorithm
    UnsupportedAlgorithm(String),

    /// AEAD authentication failed (bad tag)
    AuthenticationFailed,

    /// Cryptographic operation failed
    CryptoError(String),

    /// Invalid argument supplied by the caller
    InvalidParameter(String),

    /// I/O error
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooShort {
                required,
                available,
            } => {
                write!(
                    f,
                    "Buffer too short: need {} bytes, have {}",
                    required, available
                )
            }
            Error::UnsupportedVersion(v) => {
                write!(f, "Unsupported IKE version: 0x{:02x}", v)
            }
            Error::InvalidLength { expected, actual } => {
                write!(f, "Invalid length: expected {}, got {}", expected, actual)
            }
            Error::MessageTooLarge(size) => {
                write!(f, "IKE message too large: {} bytes", size)
            }
            Error::InvalidKeyLength { expected, actual } => {
                write!(
                    f,
                    "Invalid key length: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Error::InvalidIvLength { expected, actual } => {
                write!(
                    f,
                    "Invalid IV length: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Error::UnsupportedAlgorithm(msg) => {
                write!(f, "Unsupported algorithm: {}", msg)
            }
            Error::AuthenticationFailed => {
                write!(f, "Authentication failed: AEAD tag mismatch")
            }
            Error::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// Convert from std::io::Error
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedVersion(0x10);
        assert_eq!(err.to_string(), "Unsupported IKE version: 0x10");

        let err = Error::InvalidKeyLength {
            expected: 20,
            actual: 16,
        };
        assert_eq!(
            err.to_string(),
            "Invalid key length: expected 20 bytes, got 16"
        );

        let err = Error::AuthenticationFailed;
        assert!(err.to_string().contains("tag mismatch"));
    }

    #[test]
    fn test_error_clone_eq() {
        let err1 = Error::AuthenticationFailed;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }

    #[test]
    fn test_auth_failure_distinct_from_crypto_error() {
        // Sessions branch on this distinction, keep it stable.
        assert_ne!(
            Error::AuthenticationFailed,
            Error::CryptoError("AEAD".to_string())
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err: Error = io_err.into();
        match err {
            Error::Io(msg) => assert!(msg.contains("address in use")),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_buffer_too_short() {
        let err = Error::BufferTooShort {
            required: 28,
            available: 12,
        };
        assert!(err.to_string().contains("28"));
        assert!(err.to_string().contains("12"));
    }
}
