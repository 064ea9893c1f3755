//! Implementation of the `bughound clear` command.
//!
//! Clears exploration state while preserving completed work: the entrypoint
//! queue is dropped, and every item resolution never touched (still
//! CANDIDATE or CLASSIFIED) is removed together with its detail notes.
//! Terminal items and their fixes stay. Run history is dropped because the
//! checkpoints no longer match the pruned registry.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::adapters::fs::FsDetailNotes;
use crate::adapters::sqlite::{initialize_database, SqliteCheckpointStore};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::work_item::ItemStatus;
use crate::domain::ports::checkpoint::CheckpointStore;
use crate::domain::ports::notes::DetailNotes;
use crate::services::SnapshotStore;

#[derive(Debug, serde::Serialize)]
pub struct ClearOutput {
    pub items_removed: usize,
    pub items_kept: usize,
    pub entrypoints_dropped: usize,
}

impl CommandOutput for ClearOutput {
    fn to_human(&self) -> String {
        format!(
            "Cleared {} unstarted item(s) and {} queued entrypoint(s); kept {} item(s).",
            self.items_removed, self.entrypoints_dropped, self.items_kept
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(yes: bool, config: Config, json_mode: bool) -> Result<()> {
    if !yes {
        bail!("clear discards queued work; pass --yes to confirm");
    }

    let db_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&db_url)
        .await
        .context("Failed to open checkpoint database")?;
    let store = SqliteCheckpointStore::new(pool);

    let state_dir = Path::new(&config.state_dir);
    let snapshot = SnapshotStore::new(state_dir);
    let notes = FsDetailNotes::new(state_dir.join("items"));

    // The freshest registry wins: an incomplete run's checkpoint if one
    // exists, the snapshot otherwise
    let mut state = match store.incomplete_run().await? {
        Some(record) => store
            .load_latest(&record.run_id)
            .await?
            .map(|cp| cp.state)
            .unwrap_or_default(),
        None => snapshot.import().await?.unwrap_or_default(),
    };

    let unstarted: Vec<String> = state
        .items
        .values()
        .filter(|i| matches!(i.status, ItemStatus::Candidate | ItemStatus::Classified))
        .map(|i| i.id.clone())
        .collect();

    for id in &unstarted {
        state.items.remove(id);
        notes.remove(id).await?;
    }
    let entrypoints_dropped = state.entrypoints.len();
    state.entrypoints.clear();
    state.log.clear();
    state.discovery_rounds = 0;

    store.clear().await?;
    snapshot.export(&state).await?;

    let output_data = ClearOutput {
        items_removed: unstarted.len(),
        items_kept: state.items.len(),
        entrypoints_dropped,
    };
    output(&output_data, json_mode);
    Ok(())
}
