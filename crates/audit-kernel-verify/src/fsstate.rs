//! Filesystem projection: the workspace state implied by the log.
//!
//! `fs.diff` events advance the projection one write at a time; an
//! `fs.snapshot` is a claim about the resulting state that the verifier
//! checks against it. The projection never touches a real filesystem.

use std::collections::{BTreeMap, HashMap, HashSet};

use audit_kernel_core::{FsDiff, FsSnapshot, Sha256Digest, ABSENT_DIGEST};

use crate::error::{Result, VerifyError};

/// Workspace state derived purely from the log.
#[derive(Debug, Default)]
pub struct FsProjection {
    /// path -> content digest, sorted for stable hashing.
    files: BTreeMap<String, String>,
    /// txId -> paths already written in that transaction.
    tx_touched: HashMap<String, HashSet<String>>,
}

impl FsProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest currently tracked for a path, or the absent sentinel.
    pub fn digest_of(&self, path: &str) -> &str {
        self.files.get(path).map_or(ABSENT_DIGEST, String::as_str)
    }

    /// Number of files currently present.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Apply one `fs.diff`, checking transaction and freshness rules first.
    ///
    /// A path may be written at most once per transaction, and the diff's
    /// before-digest must equal the tracked state (the absent sentinel for
    /// paths never seen). An absent after-digest deletes the path.
    pub fn apply_diff(&mut self, seq: u64, diff: &FsDiff) -> Result<()> {
        if diff.tx_id.is_empty() {
            return Err(VerifyError::MissingTxId { seq });
        }

        let touched = self.tx_touched.entry(diff.tx_id.clone()).or_default();
        if !touched.insert(diff.path.clone()) {
            return Err(VerifyError::FsCollision {
                seq,
                tx_id: diff.tx_id.clone(),
                path: diff.path.clone(),
            });
        }

        let tracked = self.digest_of(&diff.path);
        if diff.before_digest != tracked {
            return Err(VerifyError::FsStaleWrite {
                seq,
                path: diff.path.clone(),
                logged: diff.before_digest.clone(),
                tracked: tracked.to_string(),
            });
        }

        if diff.after_digest == ABSENT_DIGEST {
            self.files.remove(&diff.path);
        } else {
            self.files
                .insert(diff.path.clone(), diff.after_digest.clone());
        }
        Ok(())
    }

    /// Check an `fs.snapshot` claim against the tracked state.
    ///
    /// Snapshots may be partial: a transaction lists only the files it
    /// touched. Each listed file is checked individually; the workspace
    /// hash commits the full tracked state either way.
    pub fn check_snapshot(&self, seq: u64, snapshot: &FsSnapshot) -> Result<()> {
        for entry in &snapshot.files {
            if self.digest_of(&entry.path) != entry.digest {
                return Err(VerifyError::SnapshotMismatch {
                    seq,
                    path: entry.path.clone(),
                });
            }
        }

        let recomputed = self.workspace_hash();
        if snapshot.workspace_hash != recomputed {
            return Err(VerifyError::WorkspaceHashMismatch {
                seq,
                logged: snapshot.workspace_hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }

    /// Commitment over the whole workspace: SHA-256 of every `path:digest`
    /// pair in path order, joined by `;`.
    pub fn workspace_hash(&self) -> String {
        let joined = self
            .files
            .iter()
            .map(|(path, digest)| format!("{path}:{digest}"))
            .collect::<Vec<_>>()
            .join(";");
        Sha256Digest::hash(joined.as_bytes()).to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_kernel_core::{FsFileEntry, FsPatch};

    fn diff(tx_id: &str, path: &str, before: &str, after: &str) -> FsDiff {
        FsDiff {
            tx_id: tx_id.into(),
            path: path.into(),
            before_digest: before.into(),
            after_digest: after.into(),
            patch: FsPatch::Unified {
                text: "+x".into(),
            },
        }
    }

    #[test]
    fn test_create_then_modify() {
        let mut fs = FsProjection::new();
        fs.apply_diff(0, &diff("t1", "a.txt", ABSENT_DIGEST, "d1")).unwrap();
        fs.apply_diff(1, &diff("t2", "a.txt", "d1", "d2")).unwrap();
        assert_eq!(fs.digest_of("a.txt"), "d2");
    }

    #[test]
    fn test_delete_removes_path() {
        let mut fs = FsProjection::new();
        fs.apply_diff(0, &diff("t1", "a.txt", ABSENT_DIGEST, "d1")).unwrap();
        fs.apply_diff(1, &diff("t2", "a.txt", "d1", ABSENT_DIGEST)).unwrap();
        assert_eq!(fs.digest_of("a.txt"), ABSENT_DIGEST);
        assert_eq!(fs.file_count(), 0);
    }

    #[test]
    fn test_same_path_twice_in_tx_collides() {
        let mut fs = FsProjection::new();
        fs.apply_diff(0, &diff("t1", "a.txt", ABSENT_DIGEST, "d1")).unwrap();
        let err = fs.apply_diff(1, &diff("t1", "a.txt", "d1", "d2")).unwrap_err();
        assert!(matches!(err, VerifyError::FsCollision { .. }));
    }

    #[test]
    fn test_stale_before_digest_rejected() {
        let mut fs = FsProjection::new();
        fs.apply_diff(0, &diff("t1", "a.txt", ABSENT_DIGEST, "d1")).unwrap();
        let err = fs
            .apply_diff(1, &diff("t2", "a.txt", "stale", "d2"))
            .unwrap_err();
        assert!(matches!(err, VerifyError::FsStaleWrite { .. }));
    }

    #[test]
    fn test_before_digest_for_new_path_must_be_absent() {
        let mut fs = FsProjection::new();
        let err = fs.apply_diff(0, &diff("t1", "a.txt", "d0", "d1")).unwrap_err();
        assert!(matches!(err, VerifyError::FsStaleWrite { .. }));
    }

    #[test]
    fn test_empty_tx_id_rejected() {
        let mut fs = FsProjection::new();
        let err = fs
            .apply_diff(0, &diff("", "a.txt", ABSENT_DIGEST, "d1"))
            .unwrap_err();
        assert!(matches!(err, VerifyError::MissingTxId { seq: 0 }));
    }

    #[test]
    fn test_workspace_hash_is_order_independent() {
        let mut fwd = FsProjection::new();
        fwd.apply_diff(0, &diff("t1", "a.txt", ABSENT_DIGEST, "d1")).unwrap();
        fwd.apply_diff(1, &diff("t2", "b.txt", ABSENT_DIGEST, "d2")).unwrap();

        let mut rev = FsProjection::new();
        rev.apply_diff(0, &diff("t1", "b.txt", ABSENT_DIGEST, "d2")).unwrap();
        rev.apply_diff(1, &diff("t2", "a.txt", ABSENT_DIGEST, "d1")).unwrap();

        assert_eq!(fwd.workspace_hash(), rev.workspace_hash());
    }

    #[test]
    fn test_snapshot_check() {
        let mut fs = FsProjection::new();
        fs.apply_diff(0, &diff("t1", "a.txt", ABSENT_DIGEST, "d1")).unwrap();

        let good = FsSnapshot {
            workspace_hash: fs.workspace_hash(),
            tx_id: Some("t1".into()),
            files: vec![FsFileEntry {
                path: "a.txt".into(),
                digest: "d1".into(),
                size: 2,
            }],
        };
        fs.check_snapshot(1, &good).unwrap();

        let wrong_digest = FsSnapshot {
            files: vec![FsFileEntry {
                path: "a.txt".into(),
                digest: "dX".into(),
                size: 2,
            }],
            ..good.clone()
        };
        assert!(matches!(
            fs.check_snapshot(1, &wrong_digest).unwrap_err(),
            VerifyError::SnapshotMismatch { .. }
        ));

        let wrong_hash = FsSnapshot {
            workspace_hash: "0".repeat(64),
            ..good
        };
        assert!(matches!(
            fs.check_snapshot(1, &wrong_hash).unwrap_err(),
            VerifyError::WorkspaceHashMismatch { .. }
        ));
    }

    #[test]
    fn test_partial_snapshot_of_touched_files_accepted() {
        // Two transactions; the second snapshot lists only its own file
        // while the hash still commits both.
        let mut fs = FsProjection::new();
        fs.apply_diff(0, &diff("t1", "a.txt", ABSENT_DIGEST, "d1")).unwrap();
        fs.apply_diff(1, &diff("t2", "b.txt", ABSENT_DIGEST, "d2")).unwrap();

        let partial = FsSnapshot {
            workspace_hash: fs.workspace_hash(),
            tx_id: Some("t2".into()),
            files: vec![FsFileEntry {
                path: "b.txt".into(),
                digest: "d2".into(),
                size: 2,
            }],
        };
        fs.check_snapshot(2, &partial).unwrap();
    }
}
