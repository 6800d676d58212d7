//! The replay harness: rebuild a log with substituted effects.

use std::collections::HashMap;

use audit_kernel_core::{Event, EventBuilder, EventId, EventPayload, Invariant, Severity};
use tracing::debug;

use crate::error::{ReplayError, Result};
use crate::mocks::{ModelMock, ToolMock};

/// One invariant violation found in the rebuilt history.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantReport {
    pub invariant: String,
    pub message: String,
    pub severity: Severity,
}

/// Result of one replay pass.
#[derive(Debug)]
pub struct ReplayReport {
    /// The rebuilt log, ids recomputed and causes remapped.
    pub events: Vec<Event>,
    /// Sequence numbers whose payloads were substituted by a mock.
    pub substituted: Vec<u64>,
    /// Violations from evaluating each registered invariant once against
    /// the full rebuilt history.
    pub violations: Vec<InvariantReport>,
}

impl ReplayReport {
    /// True when no invariant was violated.
    pub fn success(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Replays a recorded log, substituting tool and model outputs.
///
/// Every event is rebuilt through [`EventBuilder`]: substituted events get
/// new content and therefore new ids, and cause lists are remapped through
/// an old-id to new-id table so the rebuilt log stays causally sound. A
/// replay with no registered mocks reproduces the input log exactly.
pub struct ReplayHarness {
    events: Vec<Event>,
    tools: HashMap<String, Box<dyn ToolMock>>,
    models: HashMap<String, Box<dyn ModelMock>>,
    invariants: Vec<Box<dyn Invariant>>,
}

impl ReplayHarness {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            tools: HashMap::new(),
            models: HashMap::new(),
            invariants: Vec::new(),
        }
    }

    /// Register a mock for every call to the named tool.
    pub fn with_tool(mut self, tool: impl Into<String>, mock: impl ToolMock + 'static) -> Self {
        self.tools.insert(tool.into(), Box::new(mock));
        self
    }

    /// Register a mock for every call to the named model.
    pub fn with_model(mut self, model: impl Into<String>, mock: impl ModelMock + 'static) -> Self {
        self.models.insert(model.into(), Box::new(mock));
        self
    }

    /// Evaluate an invariant against the rebuilt history after the walk.
    pub fn with_invariant(mut self, invariant: impl Invariant + 'static) -> Self {
        self.invariants.push(Box::new(invariant));
        self
    }

    /// Re-execute the log.
    pub async fn replay(self) -> Result<ReplayReport> {
        let run_id = self
            .events
            .first()
            .map(|e| e.run_id.clone())
            .ok_or(ReplayError::EmptyLog)?;

        // callId -> recorded request inputs
        let mut tool_calls: HashMap<String, (String, serde_json::Map<String, serde_json::Value>)> =
            HashMap::new();
        let mut model_calls: HashMap<String, (String, String)> = HashMap::new();

        let mut id_map: HashMap<EventId, EventId> = HashMap::new();
        let mut replayed: Vec<Event> = Vec::with_capacity(self.events.len());
        let mut substituted = Vec::new();

        for source in &self.events {
            let payload = match source.typed_payload() {
                Ok(EventPayload::ToolRequested(req)) => {
                    tool_calls.insert(req.call_id.clone(), (req.tool.clone(), req.args.clone()));
                    source.payload.clone()
                }
                Ok(EventPayload::ToolResponded(mut resp)) => {
                    let mock = tool_calls
                        .get(&resp.call_id)
                        .and_then(|(tool, _)| self.tools.get(tool).map(|m| (tool, m)));
                    if let Some((tool, mock)) = mock {
                        let (_, args) = &tool_calls[&resp.call_id];
                        debug!(seq = source.seq, %tool, "substituting tool output");
                        resp.output = mock.respond(args);
                        substituted.push(source.seq);
                        serde_json::to_value(&resp).map_err(audit_kernel_core::CoreError::from)?
                    } else {
                        source.payload.clone()
                    }
                }
                Ok(EventPayload::ModelRequested(req)) => {
                    model_calls.insert(req.call_id.clone(), (req.model.clone(), req.prompt.clone()));
                    source.payload.clone()
                }
                Ok(EventPayload::ModelResponded(mut resp)) => {
                    let mock = model_calls
                        .get(&resp.call_id)
                        .and_then(|(model, _)| self.models.get(model).map(|m| (model, m)));
                    if let Some((model, mock)) = mock {
                        let (_, prompt) = &model_calls[&resp.call_id];
                        debug!(seq = source.seq, %model, "substituting model output");
                        resp.output = mock.respond(prompt);
                        substituted.push(source.seq);
                        serde_json::to_value(&resp).map_err(audit_kernel_core::CoreError::from)?
                    } else {
                        source.payload.clone()
                    }
                }
                // Unparseable payloads (blob references a store could not
                // rehydrate) replay verbatim.
                _ => source.payload.clone(),
            };

            let causes = source
                .causes
                .iter()
                .map(|c| id_map.get(c).copied().unwrap_or(*c))
                .collect();

            let mut builder = EventBuilder::new(source.run_id.clone(), source.seq)
                .v(source.v)
                .timestamp(source.timestamp)
                .causes(causes);
            if let Some(meta) = &source.meta {
                builder = builder.meta(meta.clone());
            }
            let rebuilt = builder.build_raw(source.event_type, payload)?;

            id_map.insert(source.id, rebuilt.id);
            replayed.push(rebuilt);
        }

        // One post-walk pass: invariants judge the resulting history, not
        // every intermediate prefix.
        let mut violations = Vec::new();
        for invariant in &self.invariants {
            let result = invariant.check(&replayed, &run_id).await;
            if !result.valid {
                violations.push(InvariantReport {
                    invariant: invariant.name().to_string(),
                    message: result.message.unwrap_or_default(),
                    severity: result.severity,
                });
            }
        }

        Ok(ReplayReport {
            events: replayed,
            substituted,
            violations,
        })
    }
}
