//! Record a small agent run to disk, then verify it from scratch.
//!
//! ```text
//! cargo run --example dogfood
//! ```

use anyhow::Result;
use audit_kernel::{
    verify_run, DecisionMade, EventPayload, JsonlConfig, JsonlStore, Kernel, PlanBeforeAction,
    RunCommit, RunId, RunStarted, ToolRequest, ToolResponse, VerifyOptions,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let root = std::env::temp_dir().join("audit-kernel-dogfood");
    let config = JsonlConfig::under(&root);

    let run_id = RunId::generate();
    let store = JsonlStore::create(run_id.clone(), &config)?;
    let mut kernel = Kernel::with_store(run_id, store);
    kernel.register_invariant(PlanBeforeAction);

    let opened = kernel
        .log(
            &EventPayload::RunStarted(RunStarted {
                name: "dogfood-agent".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            }),
            None,
            vec![],
        )
        .await?;

    let decided = kernel
        .log(
            &EventPayload::DecisionMade(DecisionMade {
                rationale: "see what is in the workspace".into(),
                plan: vec!["run ls".into()],
            }),
            None,
            vec![opened.id],
        )
        .await?;

    let requested = kernel
        .log(
            &EventPayload::ToolRequested(ToolRequest {
                call_id: "call-1".into(),
                tx_id: "tx-1".into(),
                tool: "ls".into(),
                args: serde_json::Map::new(),
                caps: None,
            }),
            None,
            vec![decided.id],
        )
        .await?;

    let responded = kernel
        .log(
            &EventPayload::ToolResponded(ToolResponse {
                call_id: "call-1".into(),
                tx_id: "tx-1".into(),
                output: json!({ "files": [] }),
                error: None,
                exit_code: Some(0),
            }),
            None,
            vec![requested.id],
        )
        .await?;

    kernel
        .log(
            &EventPayload::RunCommit(RunCommit {
                status: "done".into(),
            }),
            None,
            vec![responded.id],
        )
        .await?;

    let store = kernel.into_store().expect("kernel was built with a store");
    println!("recorded {} events to {}", 5, store.log_path().display());

    let report = verify_run(
        store.log_path(),
        &VerifyOptions::strict_with_blobs(config.blobs_dir),
    )?;
    println!(
        "verified run {}: {} events, all checks passed",
        report.run_id, report.event_count
    );
    Ok(())
}
