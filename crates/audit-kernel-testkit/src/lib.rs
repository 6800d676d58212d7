//! # Audit Kernel Testkit
//!
//! Deterministic fixtures and property-test generators shared by the
//! workspace's test suites. Everything here is reproducible: fixed run
//! ids, a stepping clock, and seedable generators.

pub mod fixtures;
pub mod generators;

pub use fixtures::{write_jsonl, RunFixture, FIXTURE_EPOCH_MS};
pub use generators::arb_json;

/// Install a test-friendly tracing subscriber. Safe to call from every
/// test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
