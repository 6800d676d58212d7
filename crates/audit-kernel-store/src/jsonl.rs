//! JSONL store: newline-delimited JSON with blob offload.
//!
//! Each run gets one log file `<runsDir>/<runId>.jsonl` and one blob
//! directory `<blobsDir>/<runId>/`. Payloads larger than the configured
//! threshold are written to `<blobDir>/<eventId>.json` and replaced in the
//! log record by a `_blobRef` sentinel carrying the event's digest, keeping
//! the primary log small.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use audit_kernel_core::{as_blob_ref, blob_ref, Event, RunId};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Result, StoreError};
use crate::traits::{EventStore, RunIndex};

/// Default offload threshold for serialized payload size.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Configuration for a [`JsonlStore`].
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Directory holding one `<runId>.jsonl` per run.
    pub runs_dir: PathBuf,
    /// Directory holding one blob subdirectory per run.
    pub blobs_dir: PathBuf,
    /// Serialized payloads larger than this go to blob storage.
    pub max_payload_bytes: usize,
}

impl JsonlConfig {
    /// Config with both directories under a common root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            runs_dir: root.join("runs"),
            blobs_dir: root.join("blobs"),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn max_payload_bytes(mut self, bytes: usize) -> Self {
        self.max_payload_bytes = bytes;
        self
    }
}

/// Append-only JSONL store for a single run.
pub struct JsonlStore {
    run_id: RunId,
    log_path: PathBuf,
    blob_dir: PathBuf,
    max_payload_bytes: usize,
}

impl JsonlStore {
    /// Create the store, making the run and blob directories.
    pub fn create(run_id: RunId, config: &JsonlConfig) -> Result<Self> {
        let log_path = config.runs_dir.join(format!("{run_id}.jsonl"));
        let blob_dir = config.blobs_dir.join(run_id.as_str());

        fs::create_dir_all(&config.runs_dir)?;
        fs::create_dir_all(&blob_dir)?;

        Ok(Self {
            run_id,
            log_path,
            blob_dir,
            max_payload_bytes: config.max_payload_bytes,
        })
    }

    /// Path of the run's log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Path of the run's blob directory.
    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    fn blob_path(&self, digest: &str) -> PathBuf {
        self.blob_dir.join(format!("{digest}.json"))
    }

    /// Rehydrate a record's payload if it is a resolvable blob reference.
    /// Unresolvable references are left in place.
    fn rehydrate(&self, record: &mut Value) -> Result<()> {
        let Some(payload) = record.get("payload") else {
            return Ok(());
        };
        let Some(digest) = as_blob_ref(payload) else {
            return Ok(());
        };

        let path = self.blob_path(digest);
        if !path.exists() {
            trace!(digest, "blob pruned, leaving reference unresolved");
            return Ok(());
        }

        let blob: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        if let Some(obj) = record.as_object_mut() {
            obj.insert("payload".to_string(), blob);
        }
        Ok(())
    }

    fn read_lines(&self) -> Result<Vec<String>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.log_path)?;
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl EventStore for JsonlStore {
    async fn append(&self, event: &Event) -> Result<()> {
        let payload_size = serde_json::to_string(&event.payload)?.len();

        let line = if payload_size > self.max_payload_bytes {
            let digest = event.id.to_hex();
            let blob_path = self.blob_path(&digest);
            fs::write(&blob_path, serde_json::to_string_pretty(&event.payload)?)?;
            debug!(seq = event.seq, %digest, payload_size, "payload offloaded to blob");

            let mut record = serde_json::to_value(event)?;
            if let Some(obj) = record.as_object_mut() {
                obj.insert("payload".to_string(), blob_ref(&digest));
            }
            serde_json::to_string(&record)?
        } else {
            serde_json::to_string(event)?
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;

        trace!(seq = event.seq, type_ = %event.event_type, "event appended");
        Ok(())
    }

    async fn read_log(&self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for (line_no, line) in self.read_lines()?.iter().enumerate() {
            let mut record: Value =
                serde_json::from_str(line).map_err(|e| StoreError::MalformedRecord {
                    line: line_no,
                    detail: e.to_string(),
                })?;
            self.rehydrate(&mut record)?;
            let event: Event =
                serde_json::from_value(record).map_err(|e| StoreError::MalformedRecord {
                    line: line_no,
                    detail: e.to_string(),
                })?;
            events.push(event);
        }
        Ok(events)
    }

    async fn index(&self) -> Result<RunIndex> {
        let lines = self.read_lines()?;

        let timestamp_of = |line: &String| -> Result<Option<i64>> {
            let record: Value = serde_json::from_str(line)?;
            Ok(record.get("timestamp").and_then(Value::as_i64))
        };

        let started = lines.first().map(timestamp_of).transpose()?.flatten();
        let finished = lines.last().map(timestamp_of).transpose()?.flatten();

        Ok(RunIndex {
            run_id: self.run_id.clone(),
            event_count: lines.len(),
            started,
            finished,
        })
    }
}
