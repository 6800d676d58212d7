//! # Audit Kernel Core
//!
//! Pure primitives for the audit kernel: events, canonical JSON, content
//! digests, and invariants.
//!
//! This crate contains no I/O, no storage, no clock. It is pure computation
//! over content-addressed data structures.
//!
//! ## Key Types
//!
//! - [`Event`] - The atomic, immutable unit of an audit log
//! - [`EventId`] - Content-addressed identifier (SHA-256 hex)
//! - [`EventPayload`] - Closed sum type of payload shapes, one per [`EventType`]
//! - [`Invariant`] - A named predicate evaluated against full event history
//!
//! ## Canonicalization
//!
//! All digests are computed over deterministic canonical JSON. See the
//! [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod invariant;
pub mod payload;
pub mod validation;

pub use canonical::canonical_json;
pub use crypto::{content_digest, EventId, RunId, Sha256Digest};
pub use error::{CoreError, ValidationError};
pub use event::{Event, EventBuilder, EventMeta, EventType, EVENT_VERSION};
pub use invariant::{Invariant, InvariantResult, PlanBeforeAction, Severity};
pub use payload::{
    as_blob_ref, blob_ref, BudgetExhausted, DecisionMade, ErrorRaised, EventPayload, FsDiff,
    FsFileEntry, FsPatch, FsSnapshot, InvariantFailed, ModelRequest, ModelResponse, RunCommit,
    RunFinished, RunStarted, RunStatus, ToolCaps, ToolError, ToolRequest, ToolResponse,
    ABSENT_DIGEST, BLOB_REF_KEY,
};
pub use validation::validate_event;
