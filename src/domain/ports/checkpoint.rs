//! Port trait for the durable checkpoint store.
//!
//! The store is the source of truth for resume. One checkpoint is written
//! after every completed dispatcher step; startup reads at most one. The
//! store is single-writer: only one process may hold a given run id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::HuntResult;
use crate::domain::models::resolution::ResolutionState;
use crate::domain::models::run_state::RunState;

/// Identifier for one end-to-end run.
pub type RunId = String;

/// A restored checkpoint: the registry plus any in-flight sub-workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub run_id: RunId,
    /// Monotonic step counter within the run
    pub seq: i64,
    pub state: RunState,
    /// Present when a resolution loop was mid-flight
    pub resolution: Option<ResolutionState>,
}

/// Summary of a recorded run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub completed: bool,
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Register a fresh run.
    async fn begin_run(&self, run_id: &str) -> HuntResult<()>;

    /// The most recent run that never completed, if any.
    async fn incomplete_run(&self) -> HuntResult<Option<RunRecord>>;

    /// Persist a checkpoint for the run. `seq` must increase per run.
    async fn save(
        &self,
        run_id: &str,
        seq: i64,
        state: &RunState,
        resolution: Option<&ResolutionState>,
    ) -> HuntResult<()>;

    /// Restore the latest checkpoint for a run.
    async fn load_latest(&self, run_id: &str) -> HuntResult<Option<Checkpoint>>;

    /// Mark a run finished; it will no longer be offered for resume.
    async fn complete_run(&self, run_id: &str) -> HuntResult<()>;

    /// Drop all runs and checkpoints for this store's namespace.
    async fn clear(&self) -> HuntResult<()>;
}
