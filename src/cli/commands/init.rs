//! Implementation of the `bughound init` command.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
    pub config_written: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.database_initialized {
            lines.push("\nCheckpoint database initialized".to_string());
        }
        if self.config_written {
            lines.push("Default config written".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(force: bool, config: Config, json_mode: bool) -> Result<()> {
    let state_dir = Path::new(&config.state_dir);

    if state_dir.exists() && !force {
        let output_data = InitOutput {
            success: false,
            message: "Already initialized. Use --force to reinitialize.".to_string(),
            directories_created: vec![],
            database_initialized: false,
            config_written: false,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    if force && state_dir.exists() {
        fs::remove_dir_all(state_dir)
            .await
            .with_context(|| format!("Failed to remove {}", state_dir.display()))?;
    }

    let mut directories_created = vec![];
    for dir in [
        state_dir.to_path_buf(),
        state_dir.join("items"),
        state_dir.join("logs"),
    ] {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            directories_created.push(dir.display().to_string());
        }
    }

    let db_url = format!("sqlite:{}", config.database.path);
    initialize_database(&db_url)
        .await
        .context("Failed to initialize checkpoint database")?;

    // Write a config file for the user to edit, unless one survives
    let config_path = state_dir.join("config.yaml");
    let config_written = if config_path.exists() {
        false
    } else {
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize config")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        true
    };

    let output_data = InitOutput {
        success: true,
        message: if force {
            "Reinitialized successfully.".to_string()
        } else {
            "Initialized successfully.".to_string()
        },
        directories_created,
        database_initialized: true,
        config_written,
    };
    output(&output_data, json_mode);
    Ok(())
}
