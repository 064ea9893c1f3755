//! Bughound - crash-safe automated bug hunting.
//!
//! Bughound drives an external coding agent through a resumable pipeline:
//! suggest entrypoints, scout them for defects, classify what is
//! reproducible, then resolve each item through a bounded
//! write-tests/implement/refine/review loop. Every step is checkpointed,
//! so a crash (or Ctrl-C) resumes exactly where it stopped.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): pure models, the error taxonomy, and the
//!   port traits the core depends on
//! - **Service Layer** (`services`): the dispatcher loop, the resolution
//!   engine, registry merging, and snapshot export
//! - **Adapters** (`adapters`): SQLite checkpointing, the agent CLI
//!   capability, filesystem notes, and git worktrees
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{HuntError, HuntResult};
pub use domain::models::{
    Config, FixRecord, FixStatus, ItemStatus, ResolutionPhase, ResolutionState, RunState,
    Severity, StateDelta, TaskProfile, TerminalStatus, WorkItem,
};
pub use domain::ports::{Capability, CheckpointStore, DetailNotes, WorkspaceProvider};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Dispatcher, HuntLimits, HuntSummary, ResolutionEngine, SnapshotStore};
