//! # Audit Kernel Verify
//!
//! Trustless verification of a persisted run log.
//!
//! The verifier shares no state with the kernel that produced the log. It
//! reads raw JSONL, rehydrates offloaded payloads, and re-derives every
//! claim the log makes: payload shapes, content digests, sequence
//! contiguity, causal soundness, and the filesystem projection implied by
//! `fs.diff` and `fs.snapshot` events. The first violated check fails the
//! whole run.

pub mod error;
pub mod fsstate;
pub mod verifier;

pub use error::VerifyError;
pub use fsstate::FsProjection;
pub use verifier::{verify_events, verify_run, VerifyOptions, VerifyReport};
