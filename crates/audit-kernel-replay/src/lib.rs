//! # Audit Kernel Replay
//!
//! Deterministic re-execution of a recorded run.
//!
//! The [`ReplayHarness`] walks a persisted log in sequence order and
//! rebuilds every event. Registered mocks substitute the outputs of tool
//! and model responses; everything else replays byte-for-byte. Because
//! events are content-addressed, a single substituted output changes that
//! event's id and cascades through every downstream cause, so
//! [`diff`](diff::diff) pinpoints the exact first divergence between the
//! original log and the replayed one.

pub mod diff;
pub mod error;
pub mod harness;
pub mod mocks;

pub use diff::{diff, LogDiff};
pub use error::ReplayError;
pub use harness::{InvariantReport, ReplayHarness, ReplayReport};
pub use mocks::{ModelMock, ToolMock};
