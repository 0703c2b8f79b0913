//! Error types shared across the fathom workspace

use thiserror::Error;

/// Errors produced by fathom components.
///
/// The research core treats `Timeout`, `Service`, and `Schema` identically:
/// the call site that observed the failure substitutes an empty value and the
/// traversal continues. Only configuration and IO errors are surfaced to the
/// user, and only at the CLI boundary.
#[derive(Error, Debug)]
pub enum FathomError {
    /// An external call exceeded its deadline.
    #[error("Timeout: {operation} exceeded {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    /// Transport or service-side failure from an external collaborator.
    #[error("Service error: {0}")]
    Service(String),

    /// A structured LLM reply did not match the expected schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid or unusable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for fathom operations
pub type FathomResult<T> = Result<T, FathomError>;

impl FathomError {
    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms,
        }
    }

    /// Create a service error.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
