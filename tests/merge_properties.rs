//! Property tests for the registry merge laws.

use std::collections::BTreeMap;

use proptest::prelude::*;

use bughound::domain::models::work_item::{ItemId, Severity, WorkItem};
use bughound::services::registry::{merge_items, next_item_id, resolve_entrypoints};

fn item(suffix: u32, description: &str) -> WorkItem {
    WorkItem::candidate(
        format!("BH-{suffix:03}"),
        description,
        Severity::High,
        vec![],
    )
}

fn arb_item_map() -> impl Strategy<Value = BTreeMap<ItemId, WorkItem>> {
    proptest::collection::btree_map(1u32..500, "[a-z]{1,12}", 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(suffix, description)| {
                let item = item(suffix, &description);
                (item.id.clone(), item)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn merge_is_right_biased_and_total(
        existing in arb_item_map(),
        delta in arb_item_map(),
    ) {
        let merged = merge_items(&existing, &delta);

        // Every delta entry wins wholesale
        for (id, item) in &delta {
            prop_assert_eq!(&merged[id], item);
        }
        // Untouched entries survive unchanged
        for (id, item) in &existing {
            if !delta.contains_key(id) {
                prop_assert_eq!(&merged[id], item);
            }
        }
        // No entries appear from nowhere
        prop_assert!(merged
            .keys()
            .all(|id| existing.contains_key(id) || delta.contains_key(id)));
    }

    #[test]
    fn merge_is_idempotent(
        existing in arb_item_map(),
        delta in arb_item_map(),
    ) {
        let once = merge_items(&existing, &delta);
        let twice = merge_items(&once, &delta);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn next_id_never_collides(items in arb_item_map()) {
        let id = next_item_id(&items, "BH");
        prop_assert!(!items.contains_key(&id));

        // Strictly above every existing suffix
        let next_suffix: u32 = id.strip_prefix("BH-").unwrap().parse().unwrap();
        for existing in items.keys() {
            let suffix: u32 = existing.strip_prefix("BH-").unwrap().parse().unwrap();
            prop_assert!(next_suffix > suffix);
        }
    }

    #[test]
    fn entrypoint_replacement_is_wholesale(
        existing in proptest::collection::vec("[a-z/]{1,16}", 0..6),
        delta in proptest::option::of(proptest::collection::vec("[a-z/]{1,16}", 0..6)),
    ) {
        let resolved = resolve_entrypoints(&existing, delta.as_ref());
        match delta {
            Some(queue) => prop_assert_eq!(resolved, queue),
            None => prop_assert_eq!(resolved, existing),
        }
    }
}
