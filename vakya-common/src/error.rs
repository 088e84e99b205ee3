//! Common error types for vakya

use thiserror::Error;

/// Common result type for vakya operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can surface to callers of the analysis core.
///
/// Per-engine failures and arbiter unavailability are deliberately absent:
/// those are recovered where they occur (the combiner treats a failed engine
/// as abstained, the pipeline falls through to human review). Only a total
/// engine failure is reportable to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every enabled engine failed or timed out for this request
    #[error("All analysis engines failed: {}", .0.join("; "))]
    AllEnginesFailed(Vec<String>),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
