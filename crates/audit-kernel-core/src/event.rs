//! Event: the atomic, immutable unit of the audit log.
//!
//! An event is content-addressed. Once appended, it cannot be edited;
//! mutating any field other than `id` invalidates its identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{content_digest, EventId, RunId};
use crate::error::CoreError;
use crate::payload::EventPayload;

/// The current event schema version.
pub const EVENT_VERSION: f64 = 1.1;

/// The closed event vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "run.started")]
    RunStarted,
    #[serde(rename = "run.finished")]
    RunFinished,
    #[serde(rename = "run.commit")]
    RunCommit,
    #[serde(rename = "decision.made")]
    DecisionMade,
    #[serde(rename = "tool.requested")]
    ToolRequested,
    #[serde(rename = "tool.responded")]
    ToolResponded,
    #[serde(rename = "model.requested")]
    ModelRequested,
    #[serde(rename = "model.responded")]
    ModelResponded,
    #[serde(rename = "fs.diff")]
    FsDiff,
    #[serde(rename = "fs.snapshot")]
    FsSnapshot,
    #[serde(rename = "invariant.failed")]
    InvariantFailed,
    #[serde(rename = "budget.exhausted")]
    BudgetExhausted,
    #[serde(rename = "error.raised")]
    ErrorRaised,
}

impl EventType {
    /// The wire tag for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunStarted => "run.started",
            Self::RunFinished => "run.finished",
            Self::RunCommit => "run.commit",
            Self::DecisionMade => "decision.made",
            Self::ToolRequested => "tool.requested",
            Self::ToolResponded => "tool.responded",
            Self::ModelRequested => "model.requested",
            Self::ModelResponded => "model.responded",
            Self::FsDiff => "fs.diff",
            Self::FsSnapshot => "fs.snapshot",
            Self::InvariantFailed => "invariant.failed",
            Self::BudgetExhausted => "budget.exhausted",
            Self::ErrorRaised => "error.raised",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional agent/tool/model attribution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventMeta {
    #[serde(rename = "agentId", skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl EventMeta {
    /// Attribution for a given agent.
    pub fn agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.agent_id.is_none() && self.tool.is_none() && self.model.is_none()
    }

    fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        if let Some(agent_id) = &self.agent_id {
            map.insert("agentId".into(), Value::String(agent_id.clone()));
        }
        if let Some(tool) = &self.tool {
            map.insert("tool".into(), Value::String(tool.clone()));
        }
        if let Some(model) = &self.model {
            map.insert("model".into(), Value::String(model.clone()));
        }
        Value::Object(map)
    }
}

/// A complete event record.
///
/// Wire shape (one JSON object per log line):
/// `{ v, id, runId, seq, type, timestamp, causes, payload, meta? }`.
///
/// Unknown fields are rejected at parse. The digest preimage is rebuilt
/// from the parsed fields, so silently dropping extra fields would let a
/// record carry unhashed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    /// Schema version (currently 1.1).
    pub v: f64,

    /// Content-derived identifier (SHA-256 hex, id field excluded from
    /// its own preimage).
    pub id: EventId,

    /// The run this event belongs to.
    #[serde(rename = "runId")]
    pub run_id: RunId,

    /// Sequence number within the run (0-based, gapless).
    pub seq: u64,

    /// The event type, determining the payload shape.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Logical creation time (Unix milliseconds).
    pub timestamp: i64,

    /// Ids of events this one causally depends on. Every cause must have a
    /// strictly smaller `seq`, so the causal graph is acyclic by construction.
    pub causes: Vec<EventId>,

    /// Type-dependent payload. Kept as a raw value so persisted records
    /// (including blob references) survive a read/verify round trip intact;
    /// shape checks go through [`EventPayload::from_parts`].
    pub payload: Value,

    /// Optional attribution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<EventMeta>,
}

impl Event {
    /// The digest preimage: every field except `id`.
    ///
    /// Built explicitly from fields so identity never depends on struct
    /// declaration order or serde configuration drift.
    pub fn preimage_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("v".into(), float_value(self.v));
        map.insert("runId".into(), Value::String(self.run_id.as_str().to_string()));
        map.insert("seq".into(), Value::from(self.seq));
        map.insert(
            "type".into(),
            Value::String(self.event_type.as_str().to_string()),
        );
        map.insert("timestamp".into(), Value::from(self.timestamp));
        map.insert(
            "causes".into(),
            Value::Array(
                self.causes
                    .iter()
                    .map(|c| Value::String(c.to_hex()))
                    .collect(),
            ),
        );
        map.insert("payload".into(), self.payload.clone());
        if let Some(meta) = &self.meta {
            if !meta.is_empty() {
                map.insert("meta".into(), meta.to_value());
            }
        }
        Value::Object(map)
    }

    /// Recompute the event id from the preimage.
    pub fn compute_id(&self) -> EventId {
        EventId(content_digest(&self.preimage_value()))
    }

    /// Parse the payload against the shape declared by this event's type.
    pub fn typed_payload(&self) -> Result<EventPayload, crate::error::ValidationError> {
        EventPayload::from_parts(self.event_type, &self.payload)
    }
}

fn float_value(v: f64) -> Value {
    // Event versions are small finite literals; fall back to null rather
    // than panic if a caller ever smuggles a NaN through config.
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

/// Builder for creating events.
pub struct EventBuilder {
    run_id: RunId,
    seq: u64,
    v: f64,
    timestamp: i64,
    causes: Vec<EventId>,
    meta: Option<EventMeta>,
}

impl EventBuilder {
    /// Start building an event at the given position in a run.
    pub fn new(run_id: RunId, seq: u64) -> Self {
        Self {
            run_id,
            seq,
            v: EVENT_VERSION,
            timestamp: 0,
            causes: Vec::new(),
            meta: None,
        }
    }

    /// Override the schema version.
    pub fn v(mut self, v: f64) -> Self {
        self.v = v;
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    /// Set the causal dependencies.
    pub fn causes(mut self, causes: Vec<EventId>) -> Self {
        self.causes = causes;
        self
    }

    /// Add a single causal dependency.
    pub fn cause(mut self, cause: EventId) -> Self {
        self.causes.push(cause);
        self
    }

    /// Set attribution. Empty metadata is normalized to absent so the
    /// digest preimage never carries an empty object.
    pub fn meta(mut self, meta: EventMeta) -> Self {
        self.meta = if meta.is_empty() { None } else { Some(meta) };
        self
    }

    /// Build the event from a typed payload, computing its id.
    pub fn build(self, payload: &EventPayload) -> Result<Event, CoreError> {
        let event_type = payload.event_type();
        let payload = payload.to_value()?;
        self.build_raw(event_type, payload)
    }

    /// Build from a raw payload value (used when replaying persisted
    /// records whose payload is already a value, e.g. blob references).
    pub fn build_raw(self, event_type: EventType, payload: Value) -> Result<Event, CoreError> {
        let mut event = Event {
            v: self.v,
            id: EventId::ZERO,
            run_id: self.run_id,
            seq: self.seq,
            event_type,
            timestamp: self.timestamp,
            causes: self.causes,
            payload,
            meta: self.meta,
        };
        event.id = event.compute_id();
        Ok(event)
    }
}
