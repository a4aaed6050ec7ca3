//! Common error types for rollcall

use thiserror::Error;

/// Common result type for rollcall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across rollcall services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage or upstream service cannot be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the failure means storage could not be reached at all,
    /// as opposed to a query that ran and failed.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Unavailable(_) | Error::Io(_) => true,
            #[cfg(feature = "sqlx")]
            Error::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}
