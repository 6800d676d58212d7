//! Canned runs with fully deterministic content.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use audit_kernel_core::{
    DecisionMade, Event, EventBuilder, EventId, EventPayload, RunCommit, RunId, RunStarted,
    ToolRequest, ToolResponse,
};
use serde_json::json;

/// 2025-01-14T16:00:00Z, the fixture epoch.
pub const FIXTURE_EPOCH_MS: i64 = 1_736_870_400_000;

/// A deterministic run under construction: fixed run id, a clock that
/// steps one second per event, causes defaulting to the previous event.
pub struct RunFixture {
    run_id: RunId,
    clock: AtomicI64,
    events: Vec<Event>,
}

impl RunFixture {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(run_id),
            clock: AtomicI64::new(FIXTURE_EPOCH_MS),
            events: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1_000, Ordering::SeqCst)
    }

    /// Append an event caused by the previous one (if any).
    pub fn push(&mut self, payload: &EventPayload) -> &Event {
        let causes = self.events.last().map(|e| vec![e.id]).unwrap_or_default();
        self.push_with_causes(payload, causes)
    }

    /// Append an event with explicit causes.
    pub fn push_with_causes(&mut self, payload: &EventPayload, causes: Vec<EventId>) -> &Event {
        let event = EventBuilder::new(self.run_id.clone(), self.events.len() as u64)
            .timestamp(self.tick())
            .causes(causes)
            .build(payload)
            .unwrap_or_else(|e| panic!("fixture event failed to build: {e}"));
        self.events.push(event);
        self.events.last().unwrap_or_else(|| unreachable!())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// The canonical five-event run: start, decide, request a tool,
    /// receive its response, commit. A straight causal chain.
    pub fn golden() -> Self {
        let mut fixture = Self::new("run-golden");
        fixture.push(&EventPayload::RunStarted(RunStarted {
            name: "golden-agent".into(),
            version: "0.1.0".into(),
        }));
        fixture.push(&EventPayload::DecisionMade(DecisionMade {
            rationale: "inspect the empty workspace".into(),
            plan: vec!["list files".into()],
        }));
        fixture.push(&EventPayload::ToolRequested(ToolRequest {
            call_id: "call-1".into(),
            tx_id: "tx-1".into(),
            tool: "ls".into(),
            args: serde_json::Map::new(),
            caps: None,
        }));
        fixture.push(&EventPayload::ToolResponded(ToolResponse {
            call_id: "call-1".into(),
            tx_id: "tx-1".into(),
            output: json!({ "files": [] }),
            error: None,
            exit_code: Some(0),
        }));
        fixture.push(&EventPayload::RunCommit(RunCommit {
            status: "golden".into(),
        }));
        fixture
    }
}

/// Write events as one JSON record per line.
pub fn write_jsonl(path: impl AsRef<Path>, events: &[Event]) -> io::Result<()> {
    let mut out = String::new();
    for event in events {
        let line = serde_json::to_string(event)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        out.push_str(&line);
        out.push('\n');
    }
    fs::write(path, out)
}
