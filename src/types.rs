//! Shared error types for Herald

use thiserror::Error;

/// Top-level error type for Herald operations
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Document store failure (connection, query, write)
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, HeraldError>;
