//! Error types for the kernel facade.

use thiserror::Error;

/// Errors from appending through the kernel.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    Core(#[from] audit_kernel_core::CoreError),

    #[error(transparent)]
    Store(#[from] audit_kernel_store::StoreError),

    #[error("unknown cause {0}: causes must reference events already in this run")]
    UnknownCause(String),

    #[error("kernel halted by a fatal invariant violation")]
    Halted,
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, KernelError>;
