//! Task registry merge layer.
//!
//! Pure merge functions over the registry maps, plus id generation. The
//! merges are right-biased unions at whole-entity granularity: for a key
//! present on both sides, the delta's value wins entirely. This is safe
//! only because the dispatcher serializes phases — at most one in-flight
//! operation holds write intent for a given item id at a time.

use std::collections::BTreeMap;

use crate::domain::errors::{HuntError, HuntResult};
use crate::domain::models::fix_record::FixRecord;
use crate::domain::models::run_state::{EntrypointQueue, RunState, StateDelta};
use crate::domain::models::work_item::{ItemId, WorkItem};

/// Right-biased union of item maps: delta entries replace existing ones
/// wholesale. Idempotent.
pub fn merge_items(
    existing: &BTreeMap<ItemId, WorkItem>,
    delta: &BTreeMap<ItemId, WorkItem>,
) -> BTreeMap<ItemId, WorkItem> {
    let mut merged = existing.clone();
    for (id, item) in delta {
        merged.insert(id.clone(), item.clone());
    }
    merged
}

/// Right-biased union of fix maps, same semantics as `merge_items`.
pub fn merge_fixes(
    existing: &BTreeMap<ItemId, FixRecord>,
    delta: &BTreeMap<ItemId, FixRecord>,
) -> BTreeMap<ItemId, FixRecord> {
    let mut merged = existing.clone();
    for (id, fix) in delta {
        merged.insert(id.clone(), fix.clone());
    }
    merged
}

/// Entrypoint queues are replaced wholesale, never merged: popping is
/// destructive and only one consumer pops per step.
pub fn resolve_entrypoints(
    existing: &EntrypointQueue,
    delta: Option<&EntrypointQueue>,
) -> EntrypointQueue {
    match delta {
        Some(queue) => queue.clone(),
        None => existing.clone(),
    }
}

/// Next free item id for the given prefix: max numeric suffix + 1 (not
/// count + 1), zero-padded to three digits. Computed against the
/// just-merged registry so resumed runs cannot collide.
pub fn next_item_id(items: &BTreeMap<ItemId, WorkItem>, prefix: &str) -> ItemId {
    let tag = format!("{prefix}-");
    let max = items
        .keys()
        .filter_map(|id| id.strip_prefix(&tag))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}-{:03}", max + 1)
}

/// Apply one phase's delta to the registry, enforcing the aggregate
/// invariants. Returns the merged state; on violation nothing is applied.
pub fn apply_delta(state: &RunState, delta: &StateDelta) -> HuntResult<RunState> {
    let merged = RunState {
        items: merge_items(&state.items, &delta.items),
        fixes: merge_fixes(&state.fixes, &delta.fixes),
        entrypoints: resolve_entrypoints(&state.entrypoints, delta.entrypoints.as_ref()),
        log: {
            let mut log = state.log.clone();
            log.extend(delta.log.iter().cloned());
            log
        },
        discovery_rounds: state.discovery_rounds
            + u32::from(delta.discovery_round_consumed),
    };
    merged.validate().map_err(HuntError::Invariant)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::work_item::Severity;

    fn item(id: &str, desc: &str) -> WorkItem {
        WorkItem::candidate(id, desc, Severity::High, vec![])
    }

    fn map(items: Vec<WorkItem>) -> BTreeMap<ItemId, WorkItem> {
        items.into_iter().map(|i| (i.id.clone(), i)).collect()
    }

    #[test]
    fn test_merge_is_right_biased() {
        let existing = map(vec![item("BH-001", "old description")]);
        let delta = map(vec![item("BH-001", "new description")]);
        let merged = merge_items(&existing, &delta);
        assert_eq!(merged["BH-001"].short_description, "new description");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = map(vec![item("BH-001", "a"), item("BH-002", "b")]);
        let delta = map(vec![item("BH-002", "b2"), item("BH-003", "c")]);
        let once = merge_items(&existing, &delta);
        let twice = merge_items(&once, &delta);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_keeps_untouched_entries() {
        let existing = map(vec![item("BH-001", "a")]);
        let delta = map(vec![item("BH-002", "b")]);
        let merged = merge_items(&existing, &delta);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["BH-001"].short_description, "a");
    }

    #[test]
    fn test_entrypoints_replaced_wholesale() {
        let existing = vec!["src/a.rs".to_string(), "src/b.rs".to_string()];
        let shortened = vec!["src/b.rs".to_string()];
        assert_eq!(
            resolve_entrypoints(&existing, Some(&shortened)),
            shortened
        );
        assert_eq!(resolve_entrypoints(&existing, None), existing);
    }

    #[test]
    fn test_next_id_is_max_plus_one_not_count_plus_one() {
        let items = map(vec![item("BH-001", "a"), item("BH-003", "b")]);
        assert_eq!(next_item_id(&items, "BH"), "BH-004");
    }

    #[test]
    fn test_next_id_on_empty_registry() {
        assert_eq!(next_item_id(&BTreeMap::new(), "BH"), "BH-001");
    }

    #[test]
    fn test_next_id_ignores_foreign_prefixes() {
        let items = map(vec![item("OTHER-009", "a"), item("BH-002", "b")]);
        assert_eq!(next_item_id(&items, "BH"), "BH-003");
    }

    #[test]
    fn test_apply_delta_rejects_orphan_fix() {
        let state = RunState::default();
        let delta = StateDelta::default().with_fix(FixRecord::in_review("BH-404", "fix"));
        let err = apply_delta(&state, &delta).unwrap_err();
        assert!(matches!(err, HuntError::Invariant(_)));
    }

    #[test]
    fn test_apply_delta_appends_log_and_counts_rounds() {
        let state = RunState::default();
        let mut delta = StateDelta::message("explored src/a.rs");
        delta.discovery_round_consumed = true;
        let merged = apply_delta(&state, &delta).unwrap();
        assert_eq!(merged.log, vec!["explored src/a.rs"]);
        assert_eq!(merged.discovery_rounds, 1);
    }
}
