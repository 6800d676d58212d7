//! Schema conformance: structural validation of persisted records.
//!
//! The kernel rejects nothing on the hot append path; this module is the
//! verifier's first gate over an untrusted log record.

use crate::error::ValidationError;
use crate::event::{Event, EVENT_VERSION};
use crate::payload::{as_blob_ref, EventPayload};

/// Validate an event's structure against the shape declared by its type.
///
/// Returns the typed payload on success so downstream checks (filesystem
/// replay, terminal detection) can dispatch without re-parsing.
///
/// A blob-referenced payload cannot be shape-checked; callers must
/// rehydrate first or treat the reference as unresolved.
pub fn validate_event(event: &Event) -> Result<EventPayload, ValidationError> {
    if event.v != EVENT_VERSION {
        return Err(ValidationError::UnsupportedVersion(event.v));
    }

    if let Some(digest) = as_blob_ref(&event.payload) {
        return Err(ValidationError::UnresolvedBlobRef(digest.to_string()));
    }

    event.typed_payload()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::RunId;
    use crate::event::{EventBuilder, EventType};
    use crate::payload::{blob_ref, DecisionMade, RunCommit};

    #[test]
    fn test_valid_event_yields_typed_payload() {
        let event = EventBuilder::new(RunId::new("run-1"), 0)
            .timestamp(1)
            .build(&EventPayload::RunCommit(RunCommit {
                status: "golden".into(),
            }))
            .unwrap();

        let payload = validate_event(&event).unwrap();
        assert!(matches!(payload, EventPayload::RunCommit(_)));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let event = EventBuilder::new(RunId::new("run-1"), 0)
            .v(2.0)
            .timestamp(1)
            .build(&EventPayload::DecisionMade(DecisionMade {
                rationale: "r".into(),
                plan: vec![],
            }))
            .unwrap();

        assert!(matches!(
            validate_event(&event),
            Err(ValidationError::UnsupportedVersion(v)) if v == 2.0
        ));
    }

    #[test]
    fn test_blob_reference_reported_unresolved() {
        let event = EventBuilder::new(RunId::new("run-1"), 0)
            .timestamp(1)
            .build_raw(EventType::ToolResponded, blob_ref("cafe"))
            .unwrap();

        assert!(matches!(
            validate_event(&event),
            Err(ValidationError::UnresolvedBlobRef(d)) if d == "cafe"
        ));
    }

    #[test]
    fn test_payload_shape_mismatch_rejected() {
        let event = EventBuilder::new(RunId::new("run-1"), 0)
            .timestamp(1)
            .build_raw(EventType::DecisionMade, serde_json::json!({"bogus": true}))
            .unwrap();

        assert!(matches!(
            validate_event(&event),
            Err(ValidationError::PayloadShape { .. })
        ));
    }
}
