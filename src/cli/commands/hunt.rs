//! Implementation of the `bughound hunt` command.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::adapters::agent::ClaudeCodeCapability;
use crate::adapters::fs::{FsDetailNotes, GitWorktreeProvider};
use crate::adapters::sqlite::{initialize_database, SqliteCheckpointStore};
use crate::cli::output::{output, CommandOutput};
use crate::cli::HuntArgs;
use crate::domain::errors::HuntError;
use crate::domain::models::config::Config;
use crate::domain::models::resolution::ResolutionState;
use crate::domain::models::run_state::RunState;
use crate::domain::ports::checkpoint::CheckpointStore;
use crate::services::{Dispatcher, HuntLimits, SnapshotStore};

#[derive(Debug, serde::Serialize)]
pub struct HuntOutput {
    pub run_id: String,
    pub resumed: bool,
    pub steps: i64,
    pub solved: usize,
    pub discarded: usize,
    pub needs_manual_review: usize,
}

impl CommandOutput for HuntOutput {
    fn to_human(&self) -> String {
        format!(
            "Run {} {} after {} steps.\n  solved: {}\n  discarded: {}\n  needs manual review: {}",
            self.run_id,
            if self.resumed { "resumed and finished" } else { "finished" },
            self.steps,
            console::style(self.solved).green(),
            console::style(self.discarded).dim(),
            console::style(self.needs_manual_review).yellow(),
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: HuntArgs, config: Config, json_mode: bool) -> Result<()> {
    let db_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&db_url)
        .await
        .context("Failed to open checkpoint database")?;
    let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::new(pool));

    let repo_dir = std::env::current_dir().context("Failed to get current directory")?;
    let state_dir = Path::new(&config.state_dir);
    let notes = Arc::new(FsDetailNotes::new(state_dir.join("items")));
    let workspace = Arc::new(GitWorktreeProvider::new(&repo_dir, &config.workspace));
    let capability = Arc::new(ClaudeCodeCapability::new(config.agent.clone(), &repo_dir));
    let snapshot = SnapshotStore::new(state_dir);

    let (run_id, state, resolution, seq, resumed) =
        prepare_run(&args, store.as_ref(), &snapshot).await?;

    let limits = HuntLimits {
        id_prefix: config.id_prefix.clone(),
        max_review_attempts: config.max_review_attempts,
        max_discovery_rounds: config.max_discovery_rounds,
        max_findings_per_entrypoint: config.max_findings_per_entrypoint,
    };
    let dispatcher = Dispatcher::new(capability, store.clone(), notes, workspace, limits);

    match dispatcher
        .run_with_state(&run_id, state, resolution, seq)
        .await
    {
        Ok((summary, final_state)) => {
            snapshot.export_best_effort(&final_state).await;
            output(
                &HuntOutput {
                    run_id: summary.run_id,
                    resumed,
                    steps: summary.steps,
                    solved: summary.solved,
                    discarded: summary.discarded,
                    needs_manual_review: summary.needs_manual_review,
                },
                json_mode,
            );
            Ok(())
        }
        Err(err) => {
            // The last checkpoint survives the failure; mirror it so the
            // snapshot on disk is not staler than the database
            if let Ok(Some(checkpoint)) = store.load_latest(&run_id).await {
                snapshot.export_best_effort(&checkpoint.state).await;
            }
            Err(err).context("Hunt aborted; rerun with --resume to continue")
        }
    }
}

/// Decide between resuming the incomplete run and starting a fresh one.
///
/// An incomplete run with neither `--resume` nor `--fresh` is an error: the
/// choice is destructive in one direction and must be explicit.
async fn prepare_run(
    args: &HuntArgs,
    store: &dyn CheckpointStore,
    snapshot: &SnapshotStore,
) -> Result<(String, RunState, Option<ResolutionState>, i64, bool)> {
    if let Some(record) = store.incomplete_run().await? {
        if args.resume {
            let checkpoint = store.load_latest(&record.run_id).await?;
            let (state, resolution, seq) = match checkpoint {
                Some(cp) => (cp.state, cp.resolution, cp.seq),
                None => (RunState::default(), None, 0),
            };
            info!(run_id = %record.run_id, seq, "resuming incomplete run");
            return Ok((record.run_id, state, resolution, seq, true));
        }
        if !args.fresh {
            return Err(HuntError::AmbiguousResume {
                run_id: record.run_id,
            }
            .into());
        }
        info!(run_id = %record.run_id, "abandoning incomplete run");
        store.complete_run(&record.run_id).await?;
    }

    // Fresh runs carry the registry forward from the snapshot so item ids
    // stay unique across runs and known items suppress duplicate findings
    let mut state = snapshot.import().await?.unwrap_or_default();
    if !args.entrypoint.is_empty() {
        state.entrypoints = args.entrypoint.clone();
    }

    let run_id = Uuid::new_v4().to_string();
    store.begin_run(&run_id).await?;
    store.save(&run_id, 0, &state, None).await?;
    info!(run_id = %run_id, items = state.items.len(), "starting fresh run");
    Ok((run_id, state, None, 0, false))
}
