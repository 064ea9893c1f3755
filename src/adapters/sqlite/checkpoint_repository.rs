//! SQLite-backed checkpoint store.
//!
//! State is persisted as JSON blobs: a checkpoint is a point-in-time copy
//! of the whole registry plus any in-flight resolution loop, and restore
//! always reads exactly one row. Relational decomposition would buy nothing
//! here and would make partially-written state representable.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{HuntError, HuntResult};
use crate::domain::models::resolution::ResolutionState;
use crate::domain::models::run_state::RunState;
use crate::domain::ports::checkpoint::{Checkpoint, CheckpointStore, RunRecord};

use super::parse_datetime;

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RunRow {
    run_id: String,
    started_at: String,
    completed: i64,
}

impl RunRow {
    fn try_into_record(self) -> HuntResult<RunRecord> {
        Ok(RunRecord {
            run_id: self.run_id,
            started_at: parse_datetime(&self.started_at)?,
            completed: self.completed != 0,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CheckpointRow {
    run_id: String,
    seq: i64,
    state_json: String,
    resolution_json: Option<String>,
}

impl CheckpointRow {
    fn try_into_checkpoint(self) -> HuntResult<Checkpoint> {
        let state: RunState = serde_json::from_str(&self.state_json)?;
        let resolution: Option<ResolutionState> = self
            .resolution_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Checkpoint {
            run_id: self.run_id,
            seq: self.seq,
            state,
            resolution,
        })
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn begin_run(&self, run_id: &str) -> HuntResult<()> {
        sqlx::query("INSERT INTO runs (run_id, started_at, completed) VALUES (?1, ?2, 0)")
            .bind(run_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn incomplete_run(&self) -> HuntResult<Option<RunRecord>> {
        let row: Option<RunRow> = sqlx::query_as(
            "SELECT run_id, started_at, completed FROM runs
             WHERE completed = 0
             ORDER BY started_at DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(RunRow::try_into_record).transpose()
    }

    async fn save(
        &self,
        run_id: &str,
        seq: i64,
        state: &RunState,
        resolution: Option<&ResolutionState>,
    ) -> HuntResult<()> {
        let state_json = serde_json::to_string(state)?;
        let resolution_json = resolution.map(serde_json::to_string).transpose()?;
        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints
             (run_id, seq, state_json, resolution_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(run_id)
        .bind(seq)
        .bind(state_json)
        .bind(resolution_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_latest(&self, run_id: &str) -> HuntResult<Option<Checkpoint>> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            "SELECT run_id, seq, state_json, resolution_json FROM checkpoints
             WHERE run_id = ?1
             ORDER BY seq DESC
             LIMIT 1",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CheckpointRow::try_into_checkpoint).transpose()
    }

    async fn complete_run(&self, run_id: &str) -> HuntResult<()> {
        let result = sqlx::query("UPDATE runs SET completed = 1 WHERE run_id = ?1")
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(HuntError::Persistence(format!("Unknown run {run_id}")));
        }
        Ok(())
    }

    async fn clear(&self) -> HuntResult<()> {
        sqlx::query("DELETE FROM checkpoints")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM runs").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::resolution::{ResolutionPhase, TaskProfile};
    use crate::domain::models::work_item::{Severity, WorkItem};

    async fn store() -> SqliteCheckpointStore {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteCheckpointStore::new(pool)
    }

    fn sample_state() -> RunState {
        let item = WorkItem::candidate("BH-001", "Null deref", Severity::High, vec![]);
        let mut state = RunState::with_entrypoints(vec!["src/parser.rs".into()]);
        state.items.insert(item.id.clone(), item);
        state
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = store().await;
        store.begin_run("run-1").await.unwrap();

        let state = sample_state();
        let mut resolution = ResolutionState::new("BH-001", TaskProfile::BugFix);
        resolution.phase = ResolutionPhase::Review;
        resolution.review_attempts = 1;
        resolution.rejection_history.push("missed edge case".into());

        store
            .save("run-1", 1, &state, Some(&resolution))
            .await
            .unwrap();

        let restored = store.load_latest("run-1").await.unwrap().unwrap();
        assert_eq!(restored.seq, 1);
        assert_eq!(restored.state, state);
        assert_eq!(restored.resolution, Some(resolution));
    }

    #[tokio::test]
    async fn test_latest_checkpoint_wins() {
        let store = store().await;
        store.begin_run("run-1").await.unwrap();

        let mut state = sample_state();
        store.save("run-1", 1, &state, None).await.unwrap();
        state.log.push("second step".into());
        store.save("run-1", 2, &state, None).await.unwrap();

        let restored = store.load_latest("run-1").await.unwrap().unwrap();
        assert_eq!(restored.seq, 2);
        assert_eq!(restored.state.log, vec!["second step"]);
    }

    #[tokio::test]
    async fn test_incomplete_run_lifecycle() {
        let store = store().await;
        assert!(store.incomplete_run().await.unwrap().is_none());

        store.begin_run("run-1").await.unwrap();
        let record = store.incomplete_run().await.unwrap().unwrap();
        assert_eq!(record.run_id, "run-1");
        assert!(!record.completed);

        store.complete_run("run-1").await.unwrap();
        assert!(store.incomplete_run().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_unknown_run_is_error() {
        let store = store().await;
        let err = store.complete_run("missing").await.unwrap_err();
        assert!(matches!(err, HuntError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let store = store().await;
        store.begin_run("run-1").await.unwrap();
        store.save("run-1", 1, &sample_state(), None).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.incomplete_run().await.unwrap().is_none());
        assert!(store.load_latest("run-1").await.unwrap().is_none());
    }
}
