//! Error types for ikemux

use std::fmt;

/// Unified error type for all ikemux operations
#[derive(Debug)]
pub enum PlatformError {
    /// I/O error
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Protocol error
    Protocol(String),

    /// Security error (authentication, key handling, etc.)
    Security(String),

    /// The requested facility is not available on this host
    Unsupported(String),

    /// Other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Io(e) => write!(f, "IO error: {}", e),
            PlatformError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PlatformError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            PlatformError::Security(msg) => write!(f, "Security error: {}", msg),
            PlatformError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            PlatformError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlatformError::Io(e) => Some(e),
            PlatformError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        PlatformError::Io(err)
    }
}

/// Result type for ikemux operations
pub type PlatformResult<T> = Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlatformError::Config("Invalid configuration".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "socket not found");
        let platform_err: PlatformError = io_err.into();
        assert!(matches!(platform_err, PlatformError::Io(_)));
    }

    #[test]
    fn test_unsupported_display() {
        let err = PlatformError::Unsupported("UDP encapsulation".to_string());
        assert_eq!(err.to_string(), "Unsupported: UDP encapsulation");
    }

    #[test]
    fn test_result_type() {
        fn example() -> PlatformResult<i32> {
            Ok(42)
        }

        assert_eq!(example().unwrap(), 42);
    }
}
