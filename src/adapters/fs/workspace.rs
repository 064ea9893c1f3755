//! Git worktree workspace provider.
//!
//! Each item gets its own worktree on a dedicated branch so fixes never
//! contaminate each other or the primary working copy. Provisioning is
//! idempotent: an existing worktree directory is returned as-is, which is
//! what makes resolution phases safe to replay after a crash.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::info;

use crate::domain::errors::{HuntError, HuntResult};
use crate::domain::models::config::WorkspaceConfig;
use crate::domain::models::work_item::ItemId;
use crate::domain::ports::workspace::WorkspaceProvider;

pub struct GitWorktreeProvider {
    /// Repository the worktrees branch from
    repo_dir: PathBuf,
    base_dir: PathBuf,
    /// Subdirectory agents operate in, for monorepo setups
    subdir: String,
}

impl GitWorktreeProvider {
    pub fn new(repo_dir: impl Into<PathBuf>, config: &WorkspaceConfig) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            base_dir: PathBuf::from(&config.base_dir),
            subdir: config.subdir.clone(),
        }
    }

    fn working_dir(&self, worktree: PathBuf) -> PathBuf {
        if self.subdir.is_empty() {
            worktree
        } else {
            worktree.join(&self.subdir)
        }
    }
}

#[async_trait]
impl WorkspaceProvider for GitWorktreeProvider {
    async fn provision(&self, item_id: &ItemId) -> HuntResult<PathBuf> {
        let worktree = self.base_dir.join(item_id);
        if worktree.exists() {
            return Ok(self.working_dir(worktree));
        }

        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| HuntError::Workspace {
                item_id: item_id.clone(),
                message: e.to_string(),
            })?;

        let branch = format!("bughound/{item_id}");
        let output = Command::new("git")
            .args(["worktree", "add", "-b", &branch])
            .arg(&worktree)
            .arg("HEAD")
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| HuntError::Workspace {
                item_id: item_id.clone(),
                message: format!("failed to run git: {e}"),
            })?;

        if !output.status.success() {
            return Err(HuntError::Workspace {
                item_id: item_id.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(item_id = %item_id, worktree = %worktree.display(), "worktree provisioned");
        Ok(self.working_dir(worktree))
    }
}
