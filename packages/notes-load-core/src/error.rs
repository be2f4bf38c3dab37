//! Driver error types.

use thiserror::Error;

/// Errors raised by the load driver.
///
/// Unexpected status codes are never errors; they become failed checks.
/// Only configuration problems and transport failures surface here.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Invalid run configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Connection, TLS or body read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// I/O error while writing reports
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LoadError::Timeout
        } else if e.is_builder() {
            LoadError::Config(e.to_string())
        } else {
            LoadError::Transport(e.to_string())
        }
    }
}
