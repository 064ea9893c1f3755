//! Shared test doubles and fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bughound::adapters::sqlite::{create_migrated_test_pool, SqliteCheckpointStore};
use bughound::domain::errors::HuntResult;
use bughound::domain::models::work_item::{ItemId, ReproApproach, ReproChance, Severity};
use bughound::domain::ports::capability::{Classification, DiscoveryReport, Finding};
use bughound::domain::ports::notes::DetailNotes;
use bughound::domain::ports::workspace::WorkspaceProvider;

/// Detail notes held in memory, for tests that assert on note content.
#[derive(Default)]
pub struct MemoryNotes {
    sections: Mutex<HashMap<ItemId, String>>,
}

impl MemoryNotes {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DetailNotes for MemoryNotes {
    async fn load(&self, item_id: &ItemId) -> HuntResult<Option<String>> {
        Ok(self.sections.lock().unwrap().get(item_id).cloned())
    }

    async fn append(&self, item_id: &ItemId, title: &str, body: &str) -> HuntResult<()> {
        let mut sections = self.sections.lock().unwrap();
        let text = sections
            .entry(item_id.clone())
            .or_insert_with(|| format!("# {item_id}\n"));
        text.push_str(&format!("\n## {title}\n\n{body}\n"));
        Ok(())
    }

    async fn remove(&self, item_id: &ItemId) -> HuntResult<()> {
        self.sections.lock().unwrap().remove(item_id);
        Ok(())
    }
}

/// Workspace provider that hands every item the same directory.
pub struct FixedWorkspace {
    dir: PathBuf,
}

impl FixedWorkspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl WorkspaceProvider for FixedWorkspace {
    async fn provision(&self, _item_id: &ItemId) -> HuntResult<PathBuf> {
        Ok(self.dir.clone())
    }
}

pub async fn sqlite_store() -> Arc<SqliteCheckpointStore> {
    let pool = create_migrated_test_pool().await.unwrap();
    Arc::new(SqliteCheckpointStore::new(pool))
}

pub fn finding(description: &str, severity: Severity) -> Finding {
    Finding {
        short_description: description.to_string(),
        severity,
        relevant_files: vec!["src/parser.rs".to_string()],
        details: format!("Full context for: {description}"),
    }
}

pub fn report(findings: Vec<Finding>, summary: &str) -> DiscoveryReport {
    DiscoveryReport {
        findings,
        summary: summary.to_string(),
    }
}

pub fn classification(approach: ReproApproach, chance: ReproChance) -> Classification {
    Classification {
        approach,
        chance,
        reasoning: "scripted".to_string(),
    }
}
