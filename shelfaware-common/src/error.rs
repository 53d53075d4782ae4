//! Common error types for Shelf Aware

use thiserror::Error;

/// Common result type for Shelf Aware operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Shelf Aware service
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vision backend reported an error status
    #[error("Vision backend error: {0}")]
    Backend(String),

    /// Row-store request failed
    #[error("Row-store error: {0}")]
    Store(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation conflicts with an active session
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
