//! Domain models for the bughound pipeline.

pub mod config;
pub mod fix_record;
pub mod resolution;
pub mod run_state;
pub mod work_item;

pub use config::{AgentConfig, Config, DatabaseConfig, LoggingConfig, WorkspaceConfig};
pub use fix_record::{FixRecord, FixStatus};
pub use resolution::{ResolutionPhase, ResolutionState, TaskProfile, TerminalStatus};
pub use run_state::{EntrypointQueue, RunState, StateDelta};
pub use work_item::{ItemId, ItemStatus, ReproApproach, ReproChance, Severity, WorkItem};
