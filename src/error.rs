//! Error types for Noticeboard
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using NoticeError
pub type Result<T> = std::result::Result<T, NoticeError>;

/// Unified error type for Noticeboard operations
#[derive(Debug, Error)]
pub enum NoticeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Truncated stream: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Invalid notice name: {0:?}")]
    InvalidName(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl NoticeError {
    /// True for errors that mean the peer went away rather than misbehaved
    pub fn is_disconnect(&self) -> bool {
        match self {
            NoticeError::Truncated { .. } => true,
            NoticeError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// True for read/write timeouts (Unix reports WouldBlock, Windows TimedOut)
    pub fn is_timeout(&self) -> bool {
        match self {
            NoticeError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
