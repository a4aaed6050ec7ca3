//! Error types for rollcall-display

use thiserror::Error;

/// Main error type for rollcall-display
#[derive(Error, Debug)]
pub enum DisplayError {
    /// Network failure talking to the read endpoint
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Read endpoint answered with a non-2xx status other than 404
    #[error("Read endpoint returned HTTP {0}")]
    Status(u16),

    /// Response body was not JSON
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// A driver is already running for this display
    #[error("Display poller is already armed")]
    AlreadyArmed,

    /// The driver task has exited
    #[error("Display driver has stopped")]
    Stopped,

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type using DisplayError
pub type Result<T> = std::result::Result<T, DisplayError>;
