//! Common error types for cantolex

use thiserror::Error;

/// Common result type for cantolex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the pipeline crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Artifact missing, truncated, or structurally invalid
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// External service call failed
    #[error("Service error: {0}")]
    Service(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}
