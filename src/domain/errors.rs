//! Error taxonomy for the bughound pipeline.
//!
//! Three classes matter to the dispatcher:
//! - `Capability`: the external agent call failed or returned garbage. The
//!   current step aborts without merging a delta; the run stays resumable
//!   from the last checkpoint. Never retried inside a phase.
//! - `Invariant`: registry state is inconsistent (orphan fix, duplicate
//!   id, illegal transition). Fatal; no partial merge is applied.
//! - `Persistence`: a checkpoint or snapshot write failed. Fatal for the
//!   step; the process still attempts a best-effort snapshot on exit.

use thiserror::Error;

/// Errors surfaced by the pipeline core.
#[derive(Debug, Error)]
pub enum HuntError {
    /// The external capability failed or its result could not be parsed
    #[error("Capability call failed during {phase}: {message}")]
    Capability { phase: String, message: String },

    /// Registry state violated an invariant; the run must stop
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Checkpoint or snapshot storage failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Workspace provisioning (worktree setup) failed
    #[error("Workspace error for {item_id}: {message}")]
    Workspace { item_id: String, message: String },

    /// Startup found an incomplete run but no explicit resume choice
    #[error("Incomplete run {run_id} found; pass --resume or --fresh")]
    AmbiguousResume { run_id: String },
}

impl HuntError {
    pub fn capability(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capability {
            phase: phase.into(),
            message: message.into(),
        }
    }

    /// Whether the run remains resumable after this error.
    ///
    /// Capability failures abort only the in-flight step; everything else
    /// indicates corrupted or unreachable state.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Capability { .. })
    }
}

pub type HuntResult<T> = Result<T, HuntError>;

impl From<sqlx::Error> for HuntError {
    fn from(err: sqlx::Error) -> Self {
        HuntError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for HuntError {
    fn from(err: serde_json::Error) -> Self {
        HuntError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for HuntError {
    fn from(err: std::io::Error) -> Self {
        HuntError::Persistence(err.to_string())
    }
}
