//! Error types for edgeslice

use thiserror::Error;

use crate::config::ConfigError;

/// Error types for the edgeslice library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or encoding errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias using the crate error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::IoError(io) => Error::Io(io),
            other => Error::Config(other.to_string()),
        }
    }
}
