//! Human-readable snapshot export/import.
//!
//! Snapshots mirror the registry into three JSON files under the state
//! directory. They are a secondary surface: the checkpoint store remains
//! authoritative for resume, while snapshots seed fresh runs and give
//! humans something to read and diff.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::errors::{HuntError, HuntResult};
use crate::domain::models::run_state::RunState;

const ITEMS_FILE: &str = "items.json";
const FIXES_FILE: &str = "fixes.json";
const ENTRYPOINTS_FILE: &str = "entrypoints.json";

/// Reads and writes registry snapshots in a directory.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the registry out as pretty-printed JSON, replacing any prior
    /// snapshot.
    pub async fn export(&self, state: &RunState) -> HuntResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        self.write_json(ITEMS_FILE, &state.items).await?;
        self.write_json(FIXES_FILE, &state.fixes).await?;
        self.write_json(ENTRYPOINTS_FILE, &state.entrypoints).await?;
        Ok(())
    }

    /// Export without failing the caller. A snapshot that cannot be written
    /// costs readability, not correctness; the checkpoint already persisted.
    pub async fn export_best_effort(&self, state: &RunState) {
        if let Err(err) = self.export(state).await {
            warn!(%err, dir = %self.dir.display(), "snapshot export failed");
        }
    }

    /// Rebuild a registry seed from a prior snapshot. Returns `None` when no
    /// snapshot exists. The narrative log and round counter start fresh; only
    /// the tracked entities carry over.
    pub async fn import(&self) -> HuntResult<Option<RunState>> {
        if !self.dir.join(ITEMS_FILE).exists() {
            return Ok(None);
        }
        let mut state = RunState {
            items: self.read_json(ITEMS_FILE).await?,
            ..RunState::default()
        };
        if self.dir.join(FIXES_FILE).exists() {
            state.fixes = self.read_json(FIXES_FILE).await?;
        }
        if self.dir.join(ENTRYPOINTS_FILE).exists() {
            state.entrypoints = self.read_json(ENTRYPOINTS_FILE).await?;
        }
        state.validate().map_err(HuntError::Invariant)?;
        Ok(Some(state))
    }

    /// Delete all snapshot files. Missing files are not an error.
    pub async fn remove(&self) -> HuntResult<()> {
        for file in [ITEMS_FILE, FIXES_FILE, ENTRYPOINTS_FILE] {
            let path = self.dir.join(file);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    async fn write_json<T: serde::Serialize>(&self, file: &str, value: &T) -> HuntResult<()> {
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(self.dir.join(file), json).await?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> HuntResult<T> {
        let json = tokio::fs::read_to_string(self.dir.join(file)).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::fix_record::FixRecord;
    use crate::domain::models::work_item::{Severity, WorkItem};

    fn sample_state() -> RunState {
        let item = WorkItem::candidate("BH-001", "Null deref", Severity::High, vec![]);
        let fix = FixRecord::in_review("BH-001", "Guard the empty case");
        let mut state = RunState::with_entrypoints(vec!["src/parser.rs".into()]);
        state.items.insert(item.id.clone(), item);
        state.fixes.insert(fix.item_id.clone(), fix);
        state.log.push("not part of the snapshot".into());
        state.discovery_rounds = 2;
        state
    }

    #[tokio::test]
    async fn test_export_then_import_round_trips_entities() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let state = sample_state();

        store.export(&state).await.unwrap();
        let imported = store.import().await.unwrap().unwrap();

        assert_eq!(imported.items, state.items);
        assert_eq!(imported.fixes, state.fixes);
        assert_eq!(imported.entrypoints, state.entrypoints);
        // Transient fields start over
        assert!(imported.log.is_empty());
        assert_eq!(imported.discovery_rounds, 0);
    }

    #[tokio::test]
    async fn test_import_without_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.import().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_import_rejects_inconsistent_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        // A fix referencing a missing item must not seed a run
        let orphan: std::collections::BTreeMap<String, FixRecord> =
            [("BH-404".to_string(), FixRecord::in_review("BH-404", "fix"))]
                .into_iter()
                .collect();
        tokio::fs::write(
            dir.path().join(ITEMS_FILE),
            serde_json::to_string_pretty(&std::collections::BTreeMap::<String, WorkItem>::new())
                .unwrap(),
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join(FIXES_FILE),
            serde_json::to_string_pretty(&orphan).unwrap(),
        )
        .await
        .unwrap();

        let err = store.import().await.unwrap_err();
        assert!(matches!(err, HuntError::Invariant(_)));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.export(&sample_state()).await.unwrap();

        store.remove().await.unwrap();
        store.remove().await.unwrap();
        assert!(store.import().await.unwrap().is_none());
    }
}
