//! Error types for the store layer.

use thiserror::Error;

/// Errors from event persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed record at line {line}: {detail}")]
    MalformedRecord { line: usize, detail: String },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, StoreError>;
