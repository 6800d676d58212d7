//! Event payload shapes: a closed sum type keyed by event type.
//!
//! Each [`EventType`](crate::event::EventType) has exactly one payload
//! variant. The kernel appends well-typed payloads; the verifier re-parses
//! persisted records through [`EventPayload::from_parts`], dispatching
//! exhaustively over the declared type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, ValidationError};
use crate::event::EventType;
use crate::invariant::Severity;

/// Sentinel digest meaning "file absent" (never created, or deleted).
pub const ABSENT_DIGEST: &str = "null";

/// Key marking an offloaded payload in the persisted log record.
pub const BLOB_REF_KEY: &str = "_blobRef";

/// Build a blob-reference payload carrying the owning event's digest.
pub fn blob_ref(digest: &str) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(BLOB_REF_KEY.to_string(), Value::String(digest.to_string()));
    Value::Object(map)
}

/// If `payload` is a blob reference, return the referenced digest.
pub fn as_blob_ref(payload: &Value) -> Option<&str> {
    let map = payload.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get(BLOB_REF_KEY)?.as_str()
}

/// Payload of `run.started`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStarted {
    pub name: String,
    pub version: String,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Killed,
}

/// Payload of `run.finished`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFinished {
    pub status: RunStatus,
    #[serde(rename = "commitHash", skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
}

/// Payload of `run.commit`, the terminal commitment event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCommit {
    pub status: String,
}

/// Payload of `decision.made`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMade {
    pub rationale: String,
    pub plan: Vec<String>,
}

/// Capability claims attached to a tool request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolCaps {
    #[serde(rename = "fsRead", skip_serializing_if = "Option::is_none")]
    pub fs_read: Option<bool>,
    #[serde(rename = "fsWrite", skip_serializing_if = "Option::is_none")]
    pub fs_write: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net: Option<bool>,
}

/// Payload of `tool.requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    #[serde(rename = "callId")]
    pub call_id: String,
    #[serde(rename = "txId")]
    pub tx_id: String,
    pub tool: String,
    pub args: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caps: Option<ToolCaps>,
}

/// Structured error reported by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
}

/// Payload of `tool.responded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    #[serde(rename = "callId")]
    pub call_id: String,
    #[serde(rename = "txId")]
    pub tx_id: String,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(rename = "exitCode", skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Payload of `model.requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    #[serde(rename = "callId")]
    pub call_id: String,
    pub model: String,
    pub prompt: String,
}

/// Payload of `model.responded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(rename = "callId")]
    pub call_id: String,
    pub output: String,
}

/// Patch description carried by an `fs.diff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FsPatch {
    Unified { text: String },
    Blob { digest: String },
}

/// Payload of `fs.diff`: one changed path within a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsDiff {
    #[serde(rename = "txId")]
    pub tx_id: String,
    pub path: String,
    #[serde(rename = "beforeDigest")]
    pub before_digest: String,
    #[serde(rename = "afterDigest")]
    pub after_digest: String,
    pub patch: FsPatch,
}

/// One tracked file inside an `fs.snapshot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsFileEntry {
    pub path: String,
    pub digest: String,
    pub size: u64,
}

/// Payload of `fs.snapshot`: touched files plus the workspace commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsSnapshot {
    #[serde(rename = "workspaceHash")]
    pub workspace_hash: String,
    #[serde(rename = "txId", skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    pub files: Vec<FsFileEntry>,
}

/// Payload of `invariant.failed`, appended by the kernel itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantFailed {
    pub invariant: String,
    pub message: String,
    pub severity: Severity,
}

/// Payload of `budget.exhausted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetExhausted {
    pub budget: String,
    pub limit: u64,
    pub used: u64,
}

/// Payload of `error.raised`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRaised {
    pub code: String,
    pub message: String,
}

/// The closed payload union: one variant per event type.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    RunStarted(RunStarted),
    RunFinished(RunFinished),
    RunCommit(RunCommit),
    DecisionMade(DecisionMade),
    ToolRequested(ToolRequest),
    ToolResponded(ToolResponse),
    ModelRequested(ModelRequest),
    ModelResponded(ModelResponse),
    FsDiff(FsDiff),
    FsSnapshot(FsSnapshot),
    InvariantFailed(InvariantFailed),
    BudgetExhausted(BudgetExhausted),
    ErrorRaised(ErrorRaised),
}

impl EventPayload {
    /// The event type this payload belongs to.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::RunStarted(_) => EventType::RunStarted,
            Self::RunFinished(_) => EventType::RunFinished,
            Self::RunCommit(_) => EventType::RunCommit,
            Self::DecisionMade(_) => EventType::DecisionMade,
            Self::ToolRequested(_) => EventType::ToolRequested,
            Self::ToolResponded(_) => EventType::ToolResponded,
            Self::ModelRequested(_) => EventType::ModelRequested,
            Self::ModelResponded(_) => EventType::ModelResponded,
            Self::FsDiff(_) => EventType::FsDiff,
            Self::FsSnapshot(_) => EventType::FsSnapshot,
            Self::InvariantFailed(_) => EventType::InvariantFailed,
            Self::BudgetExhausted(_) => EventType::BudgetExhausted,
            Self::ErrorRaised(_) => EventType::ErrorRaised,
        }
    }

    /// Serialize the payload to its JSON value.
    pub fn to_value(&self) -> Result<Value, CoreError> {
        let value = match self {
            Self::RunStarted(p) => serde_json::to_value(p)?,
            Self::RunFinished(p) => serde_json::to_value(p)?,
            Self::RunCommit(p) => serde_json::to_value(p)?,
            Self::DecisionMade(p) => serde_json::to_value(p)?,
            Self::ToolRequested(p) => serde_json::to_value(p)?,
            Self::ToolResponded(p) => serde_json::to_value(p)?,
            Self::ModelRequested(p) => serde_json::to_value(p)?,
            Self::ModelResponded(p) => serde_json::to_value(p)?,
            Self::FsDiff(p) => serde_json::to_value(p)?,
            Self::FsSnapshot(p) => serde_json::to_value(p)?,
            Self::InvariantFailed(p) => serde_json::to_value(p)?,
            Self::BudgetExhausted(p) => serde_json::to_value(p)?,
            Self::ErrorRaised(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }

    /// Parse a raw payload value against the shape declared by `event_type`.
    ///
    /// This is the tagged-union dispatch used by verifier schema checks.
    pub fn from_parts(event_type: EventType, payload: &Value) -> Result<Self, ValidationError> {
        fn parse<T: serde::de::DeserializeOwned>(
            event_type: EventType,
            payload: &Value,
        ) -> Result<T, ValidationError> {
            serde_json::from_value(payload.clone()).map_err(|e| ValidationError::PayloadShape {
                event_type: event_type.as_str().to_string(),
                detail: e.to_string(),
            })
        }

        Ok(match event_type {
            EventType::RunStarted => Self::RunStarted(parse(event_type, payload)?),
            EventType::RunFinished => Self::RunFinished(parse(event_type, payload)?),
            EventType::RunCommit => Self::RunCommit(parse(event_type, payload)?),
            EventType::DecisionMade => Self::DecisionMade(parse(event_type, payload)?),
            EventType::ToolRequested => Self::ToolRequested(parse(event_type, payload)?),
            EventType::ToolResponded => Self::ToolResponded(parse(event_type, payload)?),
            EventType::ModelRequested => Self::ModelRequested(parse(event_type, payload)?),
            EventType::ModelResponded => Self::ModelResponded(parse(event_type, payload)?),
            EventType::FsDiff => Self::FsDiff(parse(event_type, payload)?),
            EventType::FsSnapshot => Self::FsSnapshot(parse(event_type, payload)?),
            EventType::InvariantFailed => Self::InvariantFailed(parse(event_type, payload)?),
            EventType::BudgetExhausted => Self::BudgetExhausted(parse(event_type, payload)?),
            EventType::ErrorRaised => Self::ErrorRaised(parse(event_type, payload)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_request_wire_names() {
        let payload = EventPayload::ToolRequested(ToolRequest {
            call_id: "c1".into(),
            tx_id: "t1".into(),
            tool: "ls".into(),
            args: serde_json::Map::new(),
            caps: None,
        });

        let value = payload.to_value().unwrap();
        assert_eq!(value["callId"], json!("c1"));
        assert_eq!(value["txId"], json!("t1"));
        assert!(value.get("caps").is_none());
    }

    #[test]
    fn test_fs_diff_patch_kinds() {
        let unified: FsPatch = serde_json::from_value(json!({
            "kind": "unified", "text": "+hello"
        }))
        .unwrap();
        assert_eq!(
            unified,
            FsPatch::Unified {
                text: "+hello".into()
            }
        );

        let blob: FsPatch = serde_json::from_value(json!({
            "kind": "blob", "digest": "abc"
        }))
        .unwrap();
        assert_eq!(blob, FsPatch::Blob { digest: "abc".into() });
    }

    #[test]
    fn test_from_parts_rejects_wrong_shape() {
        // decision.made payload offered under tool.requested's type tag
        let value = json!({"rationale": "because", "plan": []});
        let result = EventPayload::from_parts(EventType::ToolRequested, &value);
        assert!(matches!(
            result,
            Err(ValidationError::PayloadShape { .. })
        ));
    }

    #[test]
    fn test_from_parts_dispatches_by_type() {
        let value = json!({"rationale": "because", "plan": ["step"]});
        let parsed = EventPayload::from_parts(EventType::DecisionMade, &value).unwrap();
        match parsed {
            EventPayload::DecisionMade(d) => {
                assert_eq!(d.rationale, "because");
                assert_eq!(d.plan, vec!["step".to_string()]);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_blob_ref_detection() {
        let reference = blob_ref("deadbeef");
        assert_eq!(as_blob_ref(&reference), Some("deadbeef"));

        // Payloads that merely contain the key are not references
        let impostor = json!({"_blobRef": "x", "other": 1});
        assert_eq!(as_blob_ref(&impostor), None);
        assert_eq!(as_blob_ref(&json!({"a": 1})), None);
    }

    #[test]
    fn test_run_status_lowercase() {
        assert_eq!(serde_json::to_value(RunStatus::Success).unwrap(), json!("success"));
        assert_eq!(serde_json::to_value(RunStatus::Killed).unwrap(), json!("killed"));
    }
}
