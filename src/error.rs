//! Error types for drowse
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the drowse service
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed start parameters (bad type, missing/non-positive duration,
    /// non-positive episode target)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Media server collaborator errors (session lookup, playstate commands)
    #[error("Media server error: {0}")]
    MediaServer(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::MediaServer(err.to_string())
    }
}

/// Convenience Result type using the drowse Error
pub type Result<T> = std::result::Result<T, Error>;
