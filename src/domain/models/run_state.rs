//! Run state aggregate.
//!
//! `RunState` is the unit the checkpoint manager tracks: every tracked item,
//! every fix, the entrypoint queue, and the narrative log. Phases never share
//! it mutably; each phase receives a snapshot and returns a `StateDelta`
//! holding only the entries it changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::fix_record::FixRecord;
use super::work_item::{ItemId, ItemStatus, Severity, WorkItem};

/// Exploration seeds, consumed strictly from the front.
pub type EntrypointQueue = Vec<String>;

/// The full, authoritative state of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// All tracked items, keyed by id. BTreeMap keeps iteration (and
    /// therefore dispatcher selection) deterministic.
    pub items: BTreeMap<ItemId, WorkItem>,
    /// Fix records, keyed by the item id they reference
    pub fixes: BTreeMap<ItemId, FixRecord>,
    /// Remaining exploration seeds
    pub entrypoints: EntrypointQueue,
    /// Narrative messages, oldest first
    pub log: Vec<String>,
    /// Number of times discovery asked for fresh entrypoints
    pub discovery_rounds: u32,
}

/// The entries one phase changed.
///
/// `None` fields mean "untouched". The entrypoint queue is replaced
/// wholesale when present because popping is destructive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    pub items: BTreeMap<ItemId, WorkItem>,
    pub fixes: BTreeMap<ItemId, FixRecord>,
    pub entrypoints: Option<EntrypointQueue>,
    pub log: Vec<String>,
    /// Set when the phase consumed a discovery round
    pub discovery_round_consumed: bool,
}

impl StateDelta {
    /// A delta carrying only a log message.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            log: vec![text.into()],
            ..Self::default()
        }
    }

    pub fn with_item(mut self, item: WorkItem) -> Self {
        self.items.insert(item.id.clone(), item);
        self
    }

    pub fn with_fix(mut self, fix: FixRecord) -> Self {
        self.fixes.insert(fix.item_id.clone(), fix);
        self
    }

    pub fn with_entrypoints(mut self, queue: EntrypointQueue) -> Self {
        self.entrypoints = Some(queue);
        self
    }
}

impl RunState {
    /// Seed a fresh run with the given entrypoints.
    pub fn with_entrypoints(entrypoints: EntrypointQueue) -> Self {
        Self {
            entrypoints,
            ..Self::default()
        }
    }

    /// Check the aggregate invariants: every fix references an existing
    /// item, and map keys match the ids of the entries they hold.
    pub fn validate(&self) -> Result<(), String> {
        for (key, item) in &self.items {
            if key != &item.id {
                return Err(format!(
                    "Item map key {} does not match item id {}",
                    key, item.id
                ));
            }
        }
        for (key, fix) in &self.fixes {
            if key != &fix.item_id {
                return Err(format!(
                    "Fix map key {} does not match fix item id {}",
                    key, fix.item_id
                ));
            }
            if !self.items.contains_key(&fix.item_id) {
                return Err(format!("Fix references unknown item {}", fix.item_id));
            }
        }
        Ok(())
    }

    /// Items with the given status, in id order (deterministic).
    pub fn items_with_status(&self, status: ItemStatus) -> Vec<&WorkItem> {
        self.items.values().filter(|i| i.status == status).collect()
    }

    /// The oldest candidate eligible for classification, if any.
    ///
    /// Only High-severity candidates enter the pipeline; lower severities
    /// stay `Candidate` as a record of the finding.
    pub fn oldest_candidate(&self) -> Option<&WorkItem> {
        self.items
            .values()
            .filter(|i| i.status == ItemStatus::Candidate && i.severity == Severity::High)
            .min_by_key(|i| (i.created_at, i.id.clone()))
    }

    /// Summaries of every tracked item, for duplicate suppression in
    /// discovery prompts.
    pub fn item_summaries(&self) -> Vec<String> {
        self.items.values().map(WorkItem::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::work_item::{ReproApproach, ReproChance, Severity};

    #[test]
    fn test_validate_rejects_orphan_fix() {
        let mut state = RunState::default();
        state
            .fixes
            .insert("BH-001".into(), FixRecord::in_review("BH-001", "fix"));
        let err = state.validate().unwrap_err();
        assert!(err.contains("unknown item"));
    }

    #[test]
    fn test_validate_rejects_mismatched_key() {
        let mut state = RunState::default();
        let item = WorkItem::candidate("BH-002", "desc", Severity::High, vec![]);
        state.items.insert("BH-001".into(), item);
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_oldest_candidate_ignores_classified_items() {
        let mut state = RunState::default();
        let first = WorkItem::candidate("BH-001", "first", Severity::High, vec![]);
        let second = WorkItem::candidate("BH-002", "second", Severity::High, vec![]);
        state.items.insert(
            first.id.clone(),
            first.classified(ReproApproach::Manual, ReproChance::Hard),
        );
        state.items.insert(second.id.clone(), second);
        assert_eq!(state.oldest_candidate().unwrap().id, "BH-002");
    }

    #[test]
    fn test_oldest_candidate_skips_lower_severities() {
        let mut state = RunState::default();
        let low = WorkItem::candidate("BH-001", "cosmetic", Severity::Low, vec![]);
        let medium = WorkItem::candidate("BH-002", "minor", Severity::Medium, vec![]);
        let high = WorkItem::candidate("BH-003", "crash", Severity::High, vec![]);
        for item in [low, medium, high] {
            state.items.insert(item.id.clone(), item);
        }
        assert_eq!(state.oldest_candidate().unwrap().id, "BH-003");

        state.items.remove("BH-003");
        assert!(state.oldest_candidate().is_none());
    }
}
