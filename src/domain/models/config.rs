//! Configuration domain model.

use serde::{Deserialize, Serialize};

/// Top-level bughound configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding all durable state for this project
    pub state_dir: String,
    /// Prefix for generated item ids (`BH` yields `BH-001`, ...)
    pub id_prefix: String,
    /// Retry bound for the review/implement loop
    pub max_review_attempts: u32,
    /// Ceiling on entrypoint-suggestion rounds per run
    pub max_discovery_rounds: u32,
    /// Maximum candidates discovery may report per entrypoint
    pub max_findings_per_entrypoint: u32,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub agent: AgentConfig,
    pub workspace: WorkspaceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: ".bughound".to_string(),
            id_prefix: "BH".to_string(),
            max_review_attempts: 3,
            max_discovery_rounds: 3,
            max_findings_per_entrypoint: 3,
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            agent: AgentConfig::default(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

/// Checkpoint database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path, relative to the working directory
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: ".bughound/checkpoints.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error
    pub level: String,
    /// One of: json, pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// External agent (capability) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Path to the agent CLI binary
    pub binary_path: String,
    /// Model used for discovery and resolution phases
    pub model: String,
    /// Cheaper model used for classification
    pub classify_model: String,
    /// Maximum agent turns per capability call
    pub max_turns: u32,
    /// Additional CLI flags passed through verbatim
    pub extra_flags: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            binary_path: "claude".to_string(),
            model: "sonnet".to_string(),
            classify_model: "haiku".to_string(),
            max_turns: 50,
            extra_flags: vec![],
        }
    }
}

/// Isolated workspace configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Base directory for per-item worktrees
    pub base_dir: String,
    /// Subdirectory within the repo for monorepo setups (e.g. `apps/web`)
    pub subdir: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_dir: "/tmp/bughound".to_string(),
            subdir: String::new(),
        }
    }
}
