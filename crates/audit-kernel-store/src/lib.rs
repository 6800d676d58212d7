//! # Audit Kernel Store
//!
//! Persistence for the audit kernel.
//!
//! The primary backend is [`JsonlStore`]: one JSON record per line, line
//! order equal to `seq` order, with oversized payloads offloaded to
//! content-addressed blob side files. [`MemoryStore`] mirrors the same
//! semantics in memory for tests and detached kernels.

pub mod error;
pub mod jsonl;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use jsonl::{JsonlConfig, JsonlStore, DEFAULT_MAX_PAYLOAD_BYTES};
pub use memory::MemoryStore;
pub use traits::{EventStore, RunIndex};
