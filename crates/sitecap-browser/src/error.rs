//! Error types for sitecap-browser

use thiserror::Error;

/// Browser adapter error type
#[derive(Debug, Error)]
pub enum Error {
    /// Navigation failed
    #[error("navigation error: {0}")]
    Navigation(String),

    /// Observation failed
    #[error("observe error: {0}")]
    Observe(String),

    /// Action failed
    #[error("action error: {0}")]
    Action(String),

    /// The underlying session is gone
    #[error("session closed: {0}")]
    SessionClosed(String),

    /// Wire/protocol failure from the backend
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation timed out
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
