//! # Audit Kernel
//!
//! A deterministic audit substrate for agent runs: every decision, tool
//! call, model call, and file mutation becomes a content-addressed,
//! causally-linked event in an append-only log.
//!
//! This facade re-exports the full stack:
//!
//! - [`Kernel`]: the single writer that assigns sequence numbers, links
//!   causes, persists, and enforces invariants.
//! - Event model and canonical hashing from `audit-kernel-core`.
//! - Stores from `audit-kernel-store` (JSONL with blob offload, memory).
//! - [`verify_run`]: trustless re-derivation of every claim in a log.
//! - [`ReplayHarness`]: deterministic re-execution with mock substitution.
//!
//! ```no_run
//! use audit_kernel::{
//!     EventPayload, JsonlConfig, JsonlStore, Kernel, RunId, RunStarted,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let run_id = RunId::generate();
//! let store = JsonlStore::create(run_id.clone(), &JsonlConfig::under(".audit"))?;
//! let mut kernel = Kernel::with_store(run_id, store);
//!
//! let opened = kernel
//!     .log(
//!         &EventPayload::RunStarted(RunStarted {
//!             name: "demo-agent".into(),
//!             version: "0.1.0".into(),
//!         }),
//!         None,
//!         vec![],
//!     )
//!     .await?;
//! # let _ = opened;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod kernel;

pub use audit_kernel_core::{
    canonical_json, content_digest, validate_event, BudgetExhausted, CoreError, DecisionMade,
    ErrorRaised, Event, EventBuilder, EventId, EventMeta, EventPayload, EventType, FsDiff,
    FsFileEntry, FsPatch, FsSnapshot, Invariant, InvariantFailed, InvariantResult, ModelRequest,
    ModelResponse, PlanBeforeAction, RunCommit, RunFinished, RunId, RunStarted, RunStatus,
    Severity, Sha256Digest, ToolCaps, ToolError, ToolRequest, ToolResponse, ValidationError,
    ABSENT_DIGEST, EVENT_VERSION,
};
pub use audit_kernel_replay::{
    diff, InvariantReport, LogDiff, ModelMock, ReplayHarness, ReplayReport, ToolMock,
};
pub use audit_kernel_store::{
    EventStore, JsonlConfig, JsonlStore, MemoryStore, RunIndex, StoreError,
    DEFAULT_MAX_PAYLOAD_BYTES,
};
pub use audit_kernel_verify::{
    verify_events, verify_run, FsProjection, VerifyError, VerifyOptions, VerifyReport,
};

pub use error::KernelError;
pub use kernel::{now_millis, Kernel, KernelConfig};
