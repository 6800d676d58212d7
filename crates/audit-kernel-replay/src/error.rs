//! Error types for replay.

use thiserror::Error;

/// Errors from re-executing a log.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot replay an empty log")]
    EmptyLog,

    #[error(transparent)]
    Core(#[from] audit_kernel_core::CoreError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ReplayError>;
