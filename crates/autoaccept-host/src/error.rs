//! Host errors.

use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Supervisor errors.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A runtime setting was rejected.
    #[error("Invalid setting {name}: {message}")]
    InvalidSetting { name: String, message: String },
}
