//! Context store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Value for key {key} has an unexpected shape: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type ContextResult<T> = Result<T, ContextError>;
