use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Item id prefix cannot be empty")]
    EmptyIdPrefix,

    #[error("Invalid max_review_attempts: {0}. Must be at least 1")]
    InvalidMaxReviewAttempts(u32),

    #[error("Invalid max_discovery_rounds: {0}. Must be at least 1")]
    InvalidMaxDiscoveryRounds(u32),

    #[error("Invalid max_findings_per_entrypoint: {0}. Must be at least 1")]
    InvalidMaxFindings(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Agent binary path cannot be empty")]
    EmptyAgentBinary,

    #[error("Workspace base_dir cannot be empty")]
    EmptyWorkspaceBaseDir,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .bughound/config.yaml (project config)
    /// 3. .bughound/local.yaml (project local overrides, optional)
    /// 4. Environment variables (BUGHOUND_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.bughound/) so several
    /// hunted projects can coexist on one machine.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".bughound/config.yaml"))
            .merge(Yaml::file(".bughound/local.yaml"))
            .merge(Env::prefixed("BUGHOUND_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.id_prefix.is_empty() {
            return Err(ConfigError::EmptyIdPrefix);
        }

        if config.max_review_attempts == 0 {
            return Err(ConfigError::InvalidMaxReviewAttempts(
                config.max_review_attempts,
            ));
        }

        if config.max_discovery_rounds == 0 {
            return Err(ConfigError::InvalidMaxDiscoveryRounds(
                config.max_discovery_rounds,
            ));
        }

        if config.max_findings_per_entrypoint == 0 {
            return Err(ConfigError::InvalidMaxFindings(
                config.max_findings_per_entrypoint,
            ));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.agent.binary_path.is_empty() {
            return Err(ConfigError::EmptyAgentBinary);
        }

        if config.workspace.base_dir.is_empty() {
            return Err(ConfigError::EmptyWorkspaceBaseDir);
        }

        Ok(())
    }
}
