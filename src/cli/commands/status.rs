//! Implementation of the `bughound status` command.

use anyhow::{Context, Result};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::path::Path;

use crate::adapters::sqlite::{initialize_database, SqliteCheckpointStore};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::fix_record::FixStatus;
use crate::domain::models::run_state::RunState;
use crate::domain::ports::checkpoint::CheckpointStore;
use crate::services::SnapshotStore;

#[derive(Debug, serde::Serialize)]
pub struct ItemRow {
    pub id: String,
    pub severity: String,
    pub status: String,
    pub description: String,
}

#[derive(Debug, serde::Serialize)]
pub struct StatusOutput {
    /// Incomplete run the next `hunt --resume` would continue, if any
    pub incomplete_run: Option<String>,
    pub items: Vec<ItemRow>,
    pub entrypoints_remaining: usize,
    pub fixes_finished: usize,
    pub fixes_in_flight: usize,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![];
        if let Some(run_id) = &self.incomplete_run {
            lines.push(format!(
                "Incomplete run: {} (hunt --resume to continue)",
                run_id
            ));
        }

        if self.items.is_empty() {
            lines.push("No items tracked yet.".to_string());
        } else {
            let mut table = Table::new();
            table
                .load_preset(presets::UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("ID").add_attribute(Attribute::Bold),
                Cell::new("Severity").add_attribute(Attribute::Bold),
                Cell::new("Status").add_attribute(Attribute::Bold),
                Cell::new("Description").add_attribute(Attribute::Bold),
            ]);
            for row in &self.items {
                table.add_row(vec![
                    Cell::new(&row.id),
                    Cell::new(&row.severity),
                    Cell::new(&row.status).fg(status_color(&row.status)),
                    Cell::new(truncate(&row.description, 60)),
                ]);
            }
            lines.push(table.to_string());
        }

        lines.push(format!(
            "Entrypoints remaining: {}  Fixes finished: {}  Fixes in flight: {}",
            self.entrypoints_remaining, self.fixes_finished, self.fixes_in_flight
        ));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn status_color(status: &str) -> Color {
    match status {
        "SOLVED" => Color::Green,
        "DISCARDED" => Color::DarkGrey,
        "NEEDS_MANUAL_REVIEW" => Color::Yellow,
        "IN_RESOLUTION" => Color::Cyan,
        _ => Color::White,
    }
}

pub async fn execute(config: Config, json_mode: bool) -> Result<()> {
    let db_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&db_url)
        .await
        .context("Failed to open checkpoint database")?;
    let store = SqliteCheckpointStore::new(pool);
    let snapshot = SnapshotStore::new(Path::new(&config.state_dir));

    // Prefer the live checkpoint of an incomplete run; the snapshot only
    // reflects completed (or aborted) runs
    let incomplete = store.incomplete_run().await?;
    let state: RunState = match &incomplete {
        Some(record) => store
            .load_latest(&record.run_id)
            .await?
            .map(|cp| cp.state)
            .unwrap_or_default(),
        None => snapshot.import().await?.unwrap_or_default(),
    };

    let items = state
        .items
        .values()
        .map(|item| ItemRow {
            id: item.id.clone(),
            severity: item.severity.as_str().to_string(),
            status: item.status.as_str().to_string(),
            description: item.short_description.clone(),
        })
        .collect();

    let output_data = StatusOutput {
        incomplete_run: incomplete.map(|r| r.run_id),
        items,
        entrypoints_remaining: state.entrypoints.len(),
        fixes_finished: state
            .fixes
            .values()
            .filter(|f| f.status == FixStatus::Finished)
            .count(),
        fixes_in_flight: state
            .fixes
            .values()
            .filter(|f| f.status != FixStatus::Finished)
            .count(),
    };

    output(&output_data, json_mode);
    Ok(())
}
