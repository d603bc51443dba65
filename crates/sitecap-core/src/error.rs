//! Error types for sitecap-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Chat client error
    #[error("chat error: {0}")]
    Chat(#[from] sitecap_llm::Error),

    /// Browser adapter error
    #[error("browser error: {0}")]
    Browser(#[from] sitecap_browser::Error),

    /// A build attempt hit its wall-clock ceiling and no partial result
    /// could be recovered
    #[error("build timed out after {after_ms}ms with no recoverable result")]
    Timeout {
        /// Configured timeout ceiling in milliseconds
        after_ms: u64,
    },

    /// Build failed after exhausting retries
    #[error("build failed after {attempts} attempts: {message}")]
    BuildFailed {
        /// Attempts made
        attempts: u32,
        /// Last error seen
        message: String,
    },

    /// Invalid caller input
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
