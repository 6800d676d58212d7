//! EventStore trait: the abstract interface for event persistence.
//!
//! This trait keeps the kernel storage-agnostic. Implementations include
//! JSONL files (primary) and in-memory (for tests).

use async_trait::async_trait;
use audit_kernel_core::{Event, RunId};
use serde::Serialize;

use crate::error::Result;

/// Run-level metadata, derivable without full-payload rehydration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunIndex {
    #[serde(rename = "runId")]
    pub run_id: RunId,
    #[serde(rename = "eventCount")]
    pub event_count: usize,
    /// Timestamp of the first event, if any.
    pub started: Option<i64>,
    /// Timestamp of the last event, if any.
    pub finished: Option<i64>,
}

/// The EventStore trait: async interface for append-only event persistence.
///
/// # Design Notes
///
/// - **Synchronous durability**: `append` must complete (or fail) before
///   returning; the kernel relies on this to guarantee that every event it
///   hands out has already been persisted.
/// - **Append-only**: stores never mutate or delete a persisted record.
/// - **Lenient reads**: a payload offloaded to a blob that has since been
///   pruned rehydrates as its unresolved reference, not as an error.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Durably append one event to the run's log.
    async fn append(&self, event: &Event) -> Result<()>;

    /// Read every record in append order, rehydrating offloaded payloads
    /// where the blob is still present.
    async fn read_log(&self) -> Result<Vec<Event>>;

    /// Run-level metadata without rehydrating payloads.
    async fn index(&self) -> Result<RunIndex>;
}
