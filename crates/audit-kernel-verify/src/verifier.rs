//! The verifier: a single fail-fast pass over a persisted log.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use audit_kernel_core::{
    as_blob_ref, validate_event, Event, EventPayload, EventType, RunId,
};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, VerifyError};
use crate::fsstate::FsProjection;

/// Knobs for a verification pass.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Require the log to end in a committed terminal event.
    pub strict: bool,
    /// Where to resolve offloaded payloads. Without it, any blob reference
    /// in the log fails verification.
    pub blobs_dir: Option<PathBuf>,
}

impl VerifyOptions {
    /// Strict verification with blob resolution.
    pub fn strict_with_blobs(blobs_dir: impl Into<PathBuf>) -> Self {
        Self {
            strict: true,
            blobs_dir: Some(blobs_dir.into()),
        }
    }
}

/// Summary of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub run_id: RunId,
    pub event_count: usize,
}

/// Verify a JSONL log file on disk.
///
/// Lines are parsed and offloaded payloads rehydrated before the checks in
/// [`verify_events`] run. The verifier trusts nothing but the file
/// contents; in particular it never consults the kernel that wrote it.
pub fn verify_run(log_path: impl AsRef<Path>, options: &VerifyOptions) -> Result<VerifyReport> {
    let content = fs::read_to_string(log_path.as_ref())?;

    let mut events = Vec::new();
    for (line_no, line) in content.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        let mut record: Value =
            serde_json::from_str(line).map_err(|e| VerifyError::Parse {
                line: line_no,
                detail: e.to_string(),
            })?;
        rehydrate(&mut record, line_no, options)?;
        let event: Event =
            serde_json::from_value(record).map_err(|e| VerifyError::Parse {
                line: line_no,
                detail: e.to_string(),
            })?;
        events.push(event);
    }

    verify_events(&events, options)
}

/// Verify an in-memory event sequence.
///
/// Checks run per event, in order: schema conformance, digest integrity,
/// sequence contiguity, causal soundness, then filesystem replay. The
/// strict terminal check runs last, over the whole log.
pub fn verify_events(events: &[Event], options: &VerifyOptions) -> Result<VerifyReport> {
    let run_id = events.first().map(|e| e.run_id.clone());

    let mut seen: HashMap<String, u64> = HashMap::new();
    let mut fs_state = FsProjection::new();

    for (index, event) in events.iter().enumerate() {
        // Schema: version, payload shape against the declared type
        let payload = validate_event(event).map_err(|e| VerifyError::Schema {
            seq: event.seq,
            detail: e.to_string(),
        })?;
        if Some(&event.run_id) != run_id.as_ref() {
            return Err(VerifyError::Schema {
                seq: event.seq,
                detail: format!("event belongs to run {}, log is for another run", event.run_id),
            });
        }

        // Digest: the id must re-derive from the content
        let recomputed = event.compute_id();
        if recomputed != event.id {
            return Err(VerifyError::DigestMismatch {
                seq: event.seq,
                stored: event.id.to_hex(),
                recomputed: recomputed.to_hex(),
            });
        }

        // Sequence: 0-based and gapless
        let expected = index as u64;
        if event.seq != expected {
            return Err(VerifyError::SequenceGap {
                expected,
                got: event.seq,
            });
        }

        // Causality: every cause resolves to an earlier event
        for cause in &event.causes {
            let hex = cause.to_hex();
            match seen.get(&hex) {
                Some(cause_seq) if *cause_seq < event.seq => {}
                Some(_) => {
                    return Err(VerifyError::CausalityViolation {
                        seq: event.seq,
                        cause: hex,
                        detail: "does not precede this event".to_string(),
                    })
                }
                None => {
                    return Err(VerifyError::CausalityViolation {
                        seq: event.seq,
                        cause: hex,
                        detail: "is not present earlier in this run".to_string(),
                    })
                }
            }
        }
        seen.insert(event.id.to_hex(), event.seq);

        // Filesystem replay
        match payload {
            EventPayload::FsDiff(diff) => fs_state.apply_diff(event.seq, &diff)?,
            EventPayload::FsSnapshot(snapshot) => fs_state.check_snapshot(event.seq, &snapshot)?,
            _ => {}
        }
    }

    if options.strict && !has_committed_terminal(events) {
        return Err(VerifyError::MissingTerminal);
    }

    let event_count = events.len();
    debug!(event_count, "log verified");
    Ok(VerifyReport {
        run_id: run_id.unwrap_or_else(|| RunId::new("")),
        event_count,
    })
}

/// True when the log's last event commits the run: either a `run.commit`,
/// or a `run.finished` carrying a commit hash.
fn has_committed_terminal(events: &[Event]) -> bool {
    let Some(last) = events.last() else {
        return false;
    };
    match last.event_type {
        EventType::RunCommit => true,
        EventType::RunFinished => matches!(
            last.typed_payload(),
            Ok(EventPayload::RunFinished(p)) if p.commit_hash.is_some()
        ),
        _ => false,
    }
}

fn rehydrate(record: &mut Value, line_no: usize, options: &VerifyOptions) -> Result<()> {
    let Some(digest) = record.get("payload").and_then(as_blob_ref) else {
        return Ok(());
    };
    let digest = digest.to_string();
    let seq = record
        .get("seq")
        .and_then(Value::as_u64)
        .unwrap_or(line_no as u64);

    let blob_missing = || VerifyError::BlobMissing {
        seq,
        digest: digest.clone(),
    };

    let blobs_dir = options.blobs_dir.as_ref().ok_or_else(blob_missing)?;
    let run_id = record
        .get("runId")
        .and_then(Value::as_str)
        .ok_or_else(blob_missing)?;

    let blob_path = blobs_dir.join(run_id).join(format!("{digest}.json"));
    if !blob_path.exists() {
        return Err(blob_missing());
    }

    let blob: Value =
        serde_json::from_str(&fs::read_to_string(blob_path)?).map_err(|e| VerifyError::Parse {
            line: line_no,
            detail: e.to_string(),
        })?;
    if let Some(obj) = record.as_object_mut() {
        obj.insert("payload".to_string(), blob);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_kernel_core::{
        blob_ref, DecisionMade, EventBuilder, EventId, FsDiff, FsFileEntry, FsPatch, FsSnapshot,
        RunCommit, RunFinished, RunStarted, RunStatus, ToolResponse, ABSENT_DIGEST,
    };
    use serde_json::json;
    use std::io::Write;

    fn append(events: &mut Vec<Event>, payload: EventPayload) {
        append_with_causes(events, payload, None);
    }

    fn append_with_causes(events: &mut Vec<Event>, payload: EventPayload, causes: Option<Vec<EventId>>) {
        let seq = events.len() as u64;
        let causes =
            causes.unwrap_or_else(|| events.last().map(|e| vec![e.id]).unwrap_or_default());
        let event = EventBuilder::new(RunId::new("run-v"), seq)
            .timestamp(1000 + seq as i64)
            .causes(causes)
            .build(&payload)
            .unwrap();
        events.push(event);
    }

    fn started() -> EventPayload {
        EventPayload::RunStarted(RunStarted {
            name: "demo".into(),
            version: "0.1.0".into(),
        })
    }

    fn decision() -> EventPayload {
        EventPayload::DecisionMade(DecisionMade {
            rationale: "proceed".into(),
            plan: vec![],
        })
    }

    fn commit() -> EventPayload {
        EventPayload::RunCommit(RunCommit {
            status: "done".into(),
        })
    }

    fn write_log(events: &[Event]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for event in events {
            writeln!(file, "{}", serde_json::to_string(event).unwrap()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_valid_chain_passes_strict() {
        let mut events = Vec::new();
        append(&mut events, started());
        append(&mut events, decision());
        append(&mut events, commit());

        let file = write_log(&events);
        let report = verify_run(
            file.path(),
            &VerifyOptions {
                strict: true,
                blobs_dir: None,
            },
        )
        .unwrap();
        assert_eq!(report.event_count, 3);
        assert_eq!(report.run_id, RunId::new("run-v"));
    }

    #[test]
    fn test_tampered_payload_fails_digest_check() {
        let mut events = Vec::new();
        append(&mut events, started());
        append(&mut events, decision());

        // Edit the payload after the id was sealed
        events[1].payload["rationale"] = json!("rewritten history");

        let file = write_log(&events);
        let err = verify_run(file.path(), &VerifyOptions::default()).unwrap_err();
        assert!(matches!(err, VerifyError::DigestMismatch { seq: 1, .. }));
    }

    #[test]
    fn test_sequence_gap_detected() {
        let mut events = Vec::new();
        append(&mut events, started());
        let skipped = EventBuilder::new(RunId::new("run-v"), 2)
            .timestamp(1002)
            .cause(events[0].id)
            .build(&decision())
            .unwrap();
        events.push(skipped);

        let file = write_log(&events);
        let err = verify_run(file.path(), &VerifyOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            VerifyError::SequenceGap {
                expected: 1,
                got: 2
            }
        ));
    }

    #[test]
    fn test_unknown_cause_detected() {
        let mut events = Vec::new();
        append(&mut events, started());
        append_with_causes(
            &mut events,
            decision(),
            Some(vec![EventId::from_bytes([0xee; 32])]),
        );

        let file = write_log(&events);
        let err = verify_run(file.path(), &VerifyOptions::default()).unwrap_err();
        assert!(matches!(err, VerifyError::CausalityViolation { seq: 1, .. }));
    }

    #[test]
    fn test_wrong_version_fails_schema() {
        let mut events = Vec::new();
        append(&mut events, started());
        let stale = EventBuilder::new(RunId::new("run-v"), 1)
            .v(1.0)
            .timestamp(1001)
            .cause(events[0].id)
            .build(&decision())
            .unwrap();
        events.push(stale);

        let file = write_log(&events);
        let err = verify_run(file.path(), &VerifyOptions::default()).unwrap_err();
        assert!(matches!(err, VerifyError::Schema { seq: 1, .. }));
    }

    #[test]
    fn test_malformed_payload_fails_schema() {
        let mut events = Vec::new();
        append(&mut events, started());
        // decision.made shape under a tool.responded tag
        let confused = EventBuilder::new(RunId::new("run-v"), 1)
            .timestamp(1001)
            .cause(events[0].id)
            .build_raw(
                EventType::ToolResponded,
                json!({"rationale": "nope", "plan": []}),
            )
            .unwrap();
        events.push(confused);

        let file = write_log(&events);
        let err = verify_run(file.path(), &VerifyOptions::default()).unwrap_err();
        assert!(matches!(err, VerifyError::Schema { seq: 1, .. }));
    }

    #[test]
    fn test_record_with_extra_field_rejected() {
        let mut events = Vec::new();
        append(&mut events, started());

        let mut record = serde_json::to_value(&events[0]).unwrap();
        record["smuggled"] = json!("unhashed content");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
        file.flush().unwrap();

        let err = verify_run(file.path(), &VerifyOptions::default()).unwrap_err();
        assert!(matches!(err, VerifyError::Parse { line: 0, .. }));
    }

    #[test]
    fn test_fs_replay_accepts_consistent_history() {
        let mut fs_check = FsProjection::new();
        let diff = FsDiff {
            tx_id: "t1".into(),
            path: "src/main.rs".into(),
            before_digest: ABSENT_DIGEST.into(),
            after_digest: "d1".into(),
            patch: FsPatch::Unified { text: "+fn main() {}".into() },
        };
        fs_check.apply_diff(0, &diff).unwrap();

        let mut events = Vec::new();
        append(&mut events, started());
        append(&mut events, EventPayload::FsDiff(diff));
        append(
            &mut events,
            EventPayload::FsSnapshot(FsSnapshot {
                workspace_hash: fs_check.workspace_hash(),
                tx_id: Some("t1".into()),
                files: vec![FsFileEntry {
                    path: "src/main.rs".into(),
                    digest: "d1".into(),
                    size: 13,
                }],
            }),
        );
        append(&mut events, commit());

        let file = write_log(&events);
        verify_run(
            file.path(),
            &VerifyOptions {
                strict: true,
                blobs_dir: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_fs_replay_rejects_stale_write() {
        let mut events = Vec::new();
        append(&mut events, started());
        append(
            &mut events,
            EventPayload::FsDiff(FsDiff {
                tx_id: "t1".into(),
                path: "a.txt".into(),
                before_digest: "phantom".into(),
                after_digest: "d1".into(),
                patch: FsPatch::Unified { text: "+x".into() },
            }),
        );

        let file = write_log(&events);
        let err = verify_run(file.path(), &VerifyOptions::default()).unwrap_err();
        assert!(matches!(err, VerifyError::FsStaleWrite { seq: 1, .. }));
    }

    #[test]
    fn test_strict_requires_committed_terminal() {
        let mut events = Vec::new();
        append(&mut events, started());
        append(&mut events, decision());

        let file = write_log(&events);
        let strict = VerifyOptions {
            strict: true,
            blobs_dir: None,
        };
        assert!(matches!(
            verify_run(file.path(), &strict).unwrap_err(),
            VerifyError::MissingTerminal
        ));
        // Lenient mode tolerates an uncommitted run
        verify_run(file.path(), &VerifyOptions::default()).unwrap();
    }

    #[test]
    fn test_finished_with_commit_hash_is_terminal() {
        let mut events = Vec::new();
        append(&mut events, started());
        append(
            &mut events,
            EventPayload::RunFinished(RunFinished {
                status: RunStatus::Success,
                commit_hash: Some("abc123".into()),
            }),
        );
        let file = write_log(&events);
        verify_run(
            file.path(),
            &VerifyOptions {
                strict: true,
                blobs_dir: None,
            },
        )
        .unwrap();

        // Without the hash the run never committed
        let mut open_ended = Vec::new();
        append(&mut open_ended, started());
        append(
            &mut open_ended,
            EventPayload::RunFinished(RunFinished {
                status: RunStatus::Failed,
                commit_hash: None,
            }),
        );
        let file = write_log(&open_ended);
        assert!(matches!(
            verify_run(
                file.path(),
                &VerifyOptions {
                    strict: true,
                    blobs_dir: None
                }
            )
            .unwrap_err(),
            VerifyError::MissingTerminal
        ));
    }

    #[test]
    fn test_blob_reference_rehydrated_from_blobs_dir() {
        let mut events = Vec::new();
        append(&mut events, started());
        append(
            &mut events,
            EventPayload::ToolResponded(ToolResponse {
                call_id: "c1".into(),
                tx_id: "t1".into(),
                output: json!("y".repeat(2048)),
                error: None,
                exit_code: Some(0),
            }),
        );
        append(&mut events, commit());

        // Persist the oversized payload as a side blob, reference inline
        let root = tempfile::tempdir().unwrap();
        let blob_dir = root.path().join("blobs").join("run-v");
        fs::create_dir_all(&blob_dir).unwrap();
        let digest = events[1].id.to_hex();
        fs::write(
            blob_dir.join(format!("{digest}.json")),
            serde_json::to_string_pretty(&events[1].payload).unwrap(),
        )
        .unwrap();

        let log_path = root.path().join("run-v.jsonl");
        let mut lines = Vec::new();
        for (i, event) in events.iter().enumerate() {
            let mut record = serde_json::to_value(event).unwrap();
            if i == 1 {
                record["payload"] = blob_ref(&digest);
            }
            lines.push(serde_json::to_string(&record).unwrap());
        }
        fs::write(&log_path, lines.join("\n")).unwrap();

        let report = verify_run(
            &log_path,
            &VerifyOptions::strict_with_blobs(root.path().join("blobs")),
        )
        .unwrap();
        assert_eq!(report.event_count, 3);

        // Same log without a blobs dir cannot be verified
        assert!(matches!(
            verify_run(&log_path, &VerifyOptions::default()).unwrap_err(),
            VerifyError::BlobMissing { seq: 1, .. }
        ));
    }
}
