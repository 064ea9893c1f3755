//! End-to-end dispatcher runs against the scripted capability and a real
//! SQLite checkpoint store.

mod common;

use std::sync::Arc;

use bughound::adapters::agent::MockCapability;
use bughound::domain::models::fix_record::FixStatus;
use bughound::domain::models::run_state::RunState;
use bughound::domain::models::work_item::{ItemStatus, ReproApproach, ReproChance, Severity};
use bughound::domain::ports::checkpoint::CheckpointStore;
use bughound::domain::ports::notes::DetailNotes;
use bughound::services::{Dispatcher, HuntLimits};

use common::{classification, finding, report, sqlite_store, FixedWorkspace, MemoryNotes};

fn limits(max_discovery_rounds: u32) -> HuntLimits {
    HuntLimits {
        id_prefix: "BH".to_string(),
        max_review_attempts: 3,
        max_discovery_rounds,
        max_findings_per_entrypoint: 3,
    }
}

#[tokio::test]
async fn test_full_hunt_solves_a_discovered_defect() {
    let capability = Arc::new(
        MockCapability::approving()
            .with_entrypoint_batch(vec!["src/parser.rs"])
            .with_discovery(report(
                vec![
                    finding("Null deref on empty input", Severity::High),
                    finding("Typo in help text", Severity::Low),
                ],
                "scouted the parser",
            ))
            .with_classification(classification(ReproApproach::UnitTest, ReproChance::Easy)),
    );
    let store = sqlite_store().await;
    store.begin_run("run-1").await.unwrap();
    let notes = Arc::new(MemoryNotes::new());
    let workspace_dir = tempfile::tempdir().unwrap();
    let workspace = Arc::new(FixedWorkspace::new(workspace_dir.path()));

    let dispatcher = Dispatcher::new(
        capability.clone(),
        store.clone(),
        notes.clone(),
        workspace,
        limits(1),
    );
    let (summary, state) = dispatcher
        .run_with_state("run-1", RunState::default(), None, 0)
        .await
        .unwrap();

    assert_eq!(summary.solved, 1);
    assert_eq!(summary.discarded, 0);
    assert_eq!(summary.needs_manual_review, 0);

    // Both findings were tracked; only the HIGH one entered the pipeline
    assert_eq!(state.items.len(), 2);
    let item = &state.items["BH-001"];
    assert_eq!(item.status, ItemStatus::Solved);
    assert_eq!(item.short_description, "Null deref on empty input");
    let low = &state.items["BH-002"];
    assert_eq!(low.status, ItemStatus::Candidate);
    assert_eq!(low.short_description, "Typo in help text");

    let fix = &state.fixes["BH-001"];
    assert_eq!(fix.status, FixStatus::Finished);
    assert_eq!(fix.commits, vec!["abc1234"]);

    assert!(state.entrypoints.is_empty());
    assert_eq!(state.discovery_rounds, 1);

    // The pipeline ran every stage exactly once, in order
    assert_eq!(
        capability.calls(),
        vec![
            "suggest_entrypoints",
            "discover",
            "classify",
            "write_tests",
            "implement",
            "refine",
            "review",
        ]
    );

    // Discovery details and phase notes landed in the item's notes
    let text = notes.load(&"BH-001".to_string()).await.unwrap().unwrap();
    assert!(text.contains("## Discovery"));
    assert!(text.contains("## Classification"));
    assert!(text.contains("## Implementation"));
}

#[tokio::test]
async fn test_seeded_in_resolution_item_is_routed_to_manual_review() {
    // A snapshot exported after a mid-resolution failure carries the item
    // as IN_RESOLUTION; a fresh run seeded from it has no loop state, so
    // the item must be handed to a human rather than stranded
    let stuck = bughound::domain::models::work_item::WorkItem::candidate(
        "BH-001",
        "Null deref on empty input",
        Severity::High,
        vec![],
    )
    .classified(ReproApproach::UnitTest, ReproChance::Easy)
    .with_status(ItemStatus::InResolution)
    .unwrap();
    let mut seed = RunState::default();
    seed.items.insert(stuck.id.clone(), stuck);

    let capability = Arc::new(MockCapability::approving());
    let store = sqlite_store().await;
    store.begin_run("run-1").await.unwrap();
    let workspace_dir = tempfile::tempdir().unwrap();

    let dispatcher = Dispatcher::new(
        capability.clone(),
        store.clone(),
        Arc::new(MemoryNotes::new()),
        Arc::new(FixedWorkspace::new(workspace_dir.path())),
        limits(0),
    );
    let (summary, state) = dispatcher
        .run_with_state("run-1", seed, None, 0)
        .await
        .unwrap();

    assert_eq!(summary.needs_manual_review, 1);
    assert_eq!(state.items["BH-001"].status, ItemStatus::NeedsManualReview);
    // Routing is a bookkeeping step; the capability was never consulted
    assert!(capability.calls().is_empty());
    assert_eq!(summary.steps, 1);
}

#[tokio::test]
async fn test_manual_item_is_routed_without_resolution() {
    let capability = Arc::new(
        MockCapability::approving()
            .with_entrypoint_batch(vec!["src/ui.rs"])
            .with_discovery(report(
                vec![finding("Flicker on resize", Severity::High)],
                "scouted the ui",
            ))
            .with_classification(classification(ReproApproach::Manual, ReproChance::Hard)),
    );
    let store = sqlite_store().await;
    store.begin_run("run-1").await.unwrap();
    let workspace_dir = tempfile::tempdir().unwrap();

    let dispatcher = Dispatcher::new(
        capability.clone(),
        store.clone(),
        Arc::new(MemoryNotes::new()),
        Arc::new(FixedWorkspace::new(workspace_dir.path())),
        limits(1),
    );
    let (summary, state) = dispatcher
        .run_with_state("run-1", RunState::default(), None, 0)
        .await
        .unwrap();

    assert_eq!(summary.needs_manual_review, 1);
    assert_eq!(state.items["BH-001"].status, ItemStatus::NeedsManualReview);
    assert!(state.fixes.is_empty());
    // The resolution loop never started
    assert!(!capability.calls().contains(&"write_tests".to_string()));
}

#[tokio::test]
async fn test_every_step_is_checkpointed() {
    let capability = Arc::new(
        MockCapability::approving()
            .with_entrypoint_batch(vec!["src/parser.rs"])
            .with_discovery(report(
                vec![finding("Off-by-one in pager", Severity::High)],
                "scouted",
            ))
            .with_classification(classification(ReproApproach::UnitTest, ReproChance::Easy)),
    );
    let store = sqlite_store().await;
    store.begin_run("run-1").await.unwrap();
    let workspace_dir = tempfile::tempdir().unwrap();

    let dispatcher = Dispatcher::new(
        capability,
        store.clone(),
        Arc::new(MemoryNotes::new()),
        Arc::new(FixedWorkspace::new(workspace_dir.path())),
        limits(1),
    );
    let (summary, _) = dispatcher
        .run_with_state("run-1", RunState::default(), None, 0)
        .await
        .unwrap();

    // suggest, scout, classify, start, write_tests, implement, refine, review
    assert_eq!(summary.steps, 8);
    let latest = store.load_latest("run-1").await.unwrap().unwrap();
    assert_eq!(latest.seq, 8);
    // The run completed, so nothing is offered for resume
    assert!(store.incomplete_run().await.unwrap().is_none());
}

#[tokio::test]
async fn test_item_ids_continue_across_seeded_registry() {
    // A registry carried over from an earlier run already holds BH-003;
    // fresh findings must not collide with it
    let mut seed = RunState::default();
    let old = bughound::domain::models::work_item::WorkItem::candidate(
        "BH-003",
        "old solved bug",
        Severity::High,
        vec![],
    )
    .classified(ReproApproach::UnitTest, ReproChance::Easy)
    .with_status(ItemStatus::InResolution)
    .unwrap()
    .with_status(ItemStatus::Solved)
    .unwrap();
    seed.items.insert(old.id.clone(), old);
    seed.entrypoints = vec!["src/parser.rs".to_string()];

    let capability = Arc::new(
        MockCapability::approving()
            .with_discovery(report(
                vec![finding("Fresh defect", Severity::High)],
                "scouted",
            ))
            .with_classification(classification(ReproApproach::UnitTest, ReproChance::Easy)),
    );
    let store = sqlite_store().await;
    store.begin_run("run-2").await.unwrap();
    let workspace_dir = tempfile::tempdir().unwrap();

    let dispatcher = Dispatcher::new(
        capability,
        store.clone(),
        Arc::new(MemoryNotes::new()),
        Arc::new(FixedWorkspace::new(workspace_dir.path())),
        limits(0),
    );
    let (_, state) = dispatcher
        .run_with_state("run-2", seed, None, 0)
        .await
        .unwrap();

    assert!(state.items.contains_key("BH-004"));
    assert_eq!(state.items["BH-004"].status, ItemStatus::Solved);
}
