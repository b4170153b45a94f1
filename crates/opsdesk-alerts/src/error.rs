//! Error types for the opsdesk-alerts crate.

use thiserror::Error;

/// Errors that can occur while handling alert events.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
