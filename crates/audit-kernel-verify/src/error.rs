//! Error types for verification.
//!
//! Every variant names the first check that failed; verification is
//! fail-fast, so a report carries exactly one of these.

use thiserror::Error;

/// Verification failures, in roughly the order the checks run.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unparseable record at line {line}: {detail}")]
    Parse { line: usize, detail: String },

    #[error("schema violation at seq {seq}: {detail}")]
    Schema { seq: u64, detail: String },

    #[error("unresolvable blob reference at seq {seq}: {digest}")]
    BlobMissing { seq: u64, digest: String },

    #[error("digest mismatch at seq {seq}: stored {stored}, recomputed {recomputed}")]
    DigestMismatch {
        seq: u64,
        stored: String,
        recomputed: String,
    },

    #[error("sequence gap: expected seq {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("causality violation at seq {seq}: cause {cause} {detail}")]
    CausalityViolation {
        seq: u64,
        cause: String,
        detail: String,
    },

    #[error("fs.diff at seq {seq} missing a transaction id")]
    MissingTxId { seq: u64 },

    #[error("write collision at seq {seq}: path {path} already written in tx {tx_id}")]
    FsCollision { seq: u64, tx_id: String, path: String },

    #[error("stale write at seq {seq}: path {path} claims before-digest {logged}, tracked state is {tracked}")]
    FsStaleWrite {
        seq: u64,
        path: String,
        logged: String,
        tracked: String,
    },

    #[error("snapshot mismatch at seq {seq}: path {path} disagrees with the tracked projection")]
    SnapshotMismatch { seq: u64, path: String },

    #[error("workspace hash mismatch at seq {seq}: logged {logged}, recomputed {recomputed}")]
    WorkspaceHashMismatch {
        seq: u64,
        logged: String,
        recomputed: String,
    },

    #[error("strict mode: log does not end in a committed terminal event")]
    MissingTerminal,
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, VerifyError>;
