//! Filesystem adapters: detail notes and per-item worktrees.

pub mod notes;
pub mod workspace;

pub use notes::FsDetailNotes;
pub use workspace::GitWorktreeProvider;
