//! Error types for sftpd

use std::fmt;

/// Unified error type for operations that end an SFTP session.
///
/// Recoverable per-request failures never surface as `SftpdError`; they are
/// answered with a status reply instead.
#[derive(Debug)]
pub enum SftpdError {
    /// I/O error on the channel
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Malformed or oversized input from the peer
    Protocol(String),

    /// The peer referenced a handle that was never issued or is closed
    InvalidHandle(String),

    /// Other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for SftpdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SftpdError::Io(e) => write!(f, "IO error: {}", e),
            SftpdError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SftpdError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            SftpdError::InvalidHandle(handle) => {
                write!(f, "Client supplied an invalid handle: {:?}", handle)
            }
            SftpdError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for SftpdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SftpdError::Io(e) => Some(e),
            SftpdError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SftpdError {
    fn from(err: std::io::Error) -> Self {
        SftpdError::Io(err)
    }
}

impl SftpdError {
    /// Returns true if the error came from the underlying channel rather
    /// than from what the peer sent.
    pub fn is_io(&self) -> bool {
        matches!(self, SftpdError::Io(_))
    }
}

/// Result type for sftpd operations
pub type SftpdResult<T> = Result<T, SftpdError>;
