//! Port trait for isolated per-item workspaces.
//!
//! Each item under resolution gets its own disposable working copy so a
//! half-finished fix cannot leak into another item's worktree. Provisioning
//! is idempotent: asking for an existing workspace returns it untouched,
//! which keeps resolution phases safe to re-execute after a crash.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::errors::HuntResult;
use crate::domain::models::work_item::ItemId;

#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    /// Ensure a workspace exists for the item and return the directory the
    /// agent should operate in.
    async fn provision(&self, item_id: &ItemId) -> HuntResult<PathBuf>;
}
