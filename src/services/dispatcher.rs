//! Priority dispatcher: the outer hunt loop.
//!
//! The dispatcher executes one action per iteration, merges the resulting
//! delta into the registry, and checkpoints before deciding again. Actions
//! are strictly serialized; nothing in the pipeline runs concurrently, which
//! is what makes the wholesale-replacement merge in [`registry`] safe.
//!
//! Selection priority, highest first:
//! 1. an in-flight resolution loop (finish what was started)
//! 2. a classified item eligible for automated resolution
//! 3. an unclassified candidate
//! 4. an entrypoint waiting to be scouted
//! 5. a fresh round of entrypoint suggestions, while rounds remain
//!
//! When none applies the run is finished.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::errors::{HuntError, HuntResult};
use crate::domain::models::fix_record::FixRecord;
use crate::domain::models::resolution::{ResolutionState, TaskProfile};
use crate::domain::models::run_state::{RunState, StateDelta};
use crate::domain::models::work_item::{ItemId, ItemStatus, WorkItem};
use crate::domain::ports::capability::{
    Capability, ClassifyContext, DiscoveryContext, SuggestContext,
};
use crate::domain::ports::checkpoint::{CheckpointStore, RunId};
use crate::domain::ports::notes::DetailNotes;
use crate::domain::ports::workspace::WorkspaceProvider;
use crate::services::registry::{apply_delta, next_item_id};
use crate::services::resolution::{FixEvent, PhaseInputs, ResolutionEngine};

/// Tunables the dispatcher needs from configuration.
#[derive(Debug, Clone)]
pub struct HuntLimits {
    /// Item id prefix, e.g. `BH`
    pub id_prefix: String,
    pub max_review_attempts: u32,
    pub max_discovery_rounds: u32,
    pub max_findings_per_entrypoint: u32,
}

/// The action the dispatcher selected for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction {
    /// Advance the in-flight resolution loop by one phase
    ResolutionStep,
    /// Route an `InResolution` item whose loop state is gone to a human
    RouteOrphaned(ItemId),
    /// Hand a classified, unit-testable item to the resolution engine
    StartResolution(ItemId),
    /// Classify the oldest candidate
    Classify(ItemId),
    /// Explore the front entrypoint
    Scout(String),
    /// Ask for fresh entrypoints
    SuggestEntrypoints,
    /// Nothing left to do
    Finished,
}

/// Pure selection function. Deterministic for a given state.
pub fn decide(
    state: &RunState,
    resolution: Option<&ResolutionState>,
    max_discovery_rounds: u32,
) -> NextAction {
    if resolution.is_some_and(|r| !r.is_done()) {
        return NextAction::ResolutionStep;
    }
    // An item stuck in resolution with no in-flight loop lost its context
    // (a fresh run seeded from a snapshot exported mid-resolution); it can
    // never re-enter the loop and goes to a human instead
    if let Some(item) = state
        .items
        .values()
        .find(|i| i.status == ItemStatus::InResolution)
    {
        return NextAction::RouteOrphaned(item.id.clone());
    }
    if let Some(item) = state.items.values().find(|i| i.is_resolvable()) {
        return NextAction::StartResolution(item.id.clone());
    }
    if let Some(item) = state.oldest_candidate() {
        return NextAction::Classify(item.id.clone());
    }
    if let Some(entrypoint) = state.entrypoints.first() {
        return NextAction::Scout(entrypoint.clone());
    }
    if state.discovery_rounds < max_discovery_rounds {
        return NextAction::SuggestEntrypoints;
    }
    NextAction::Finished
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct HuntSummary {
    pub run_id: RunId,
    pub steps: i64,
    pub solved: usize,
    pub discarded: usize,
    pub needs_manual_review: usize,
}

impl HuntSummary {
    fn from_state(run_id: &str, steps: i64, state: &RunState) -> Self {
        Self {
            run_id: run_id.to_string(),
            steps,
            solved: state.items_with_status(ItemStatus::Solved).len(),
            discarded: state.items_with_status(ItemStatus::Discarded).len(),
            needs_manual_review: state
                .items_with_status(ItemStatus::NeedsManualReview)
                .len(),
        }
    }
}

/// The hunt loop, wired to its ports.
pub struct Dispatcher<C> {
    capability: Arc<C>,
    engine: ResolutionEngine<C>,
    store: Arc<dyn CheckpointStore>,
    notes: Arc<dyn DetailNotes>,
    workspace: Arc<dyn WorkspaceProvider>,
    limits: HuntLimits,
}

impl<C: Capability> Dispatcher<C> {
    pub fn new(
        capability: Arc<C>,
        store: Arc<dyn CheckpointStore>,
        notes: Arc<dyn DetailNotes>,
        workspace: Arc<dyn WorkspaceProvider>,
        limits: HuntLimits,
    ) -> Self {
        let engine = ResolutionEngine::new(capability.clone(), limits.max_review_attempts);
        Self {
            capability,
            engine,
            store,
            notes,
            workspace,
            limits,
        }
    }

    /// Drive the run to completion from the given (possibly restored) state.
    ///
    /// A checkpoint is written after every applied delta; `seq` continues
    /// from the restored checkpoint so resumed runs keep a single monotonic
    /// sequence.
    pub async fn run(
        &self,
        run_id: &str,
        mut state: RunState,
        mut resolution: Option<ResolutionState>,
        mut seq: i64,
    ) -> HuntResult<HuntSummary> {
        loop {
            let action = decide(&state, resolution.as_ref(), self.limits.max_discovery_rounds);
            info!(run_id, seq, ?action, "dispatcher step");

            let (delta, next_resolution) = match action {
                NextAction::ResolutionStep => {
                    let current = resolution.as_ref().ok_or_else(|| {
                        HuntError::Invariant("Resolution step without in-flight state".into())
                    })?;
                    self.resolution_step(&state, current).await?
                }
                NextAction::RouteOrphaned(id) => self.route_orphaned(&state, &id)?,
                NextAction::StartResolution(id) => self.start_resolution(&state, &id)?,
                NextAction::Classify(id) => self.classify(&state, &id).await?,
                NextAction::Scout(entrypoint) => self.scout(&state, &entrypoint).await?,
                NextAction::SuggestEntrypoints => self.suggest(&state).await?,
                NextAction::Finished => break,
            };

            state = apply_delta(&state, &delta)?;
            resolution = next_resolution;
            seq += 1;
            self.store
                .save(run_id, seq, &state, resolution.as_ref())
                .await?;
        }

        self.store.complete_run(run_id).await?;
        let summary = HuntSummary::from_state(run_id, seq, &state);
        info!(
            run_id,
            solved = summary.solved,
            discarded = summary.discarded,
            needs_manual_review = summary.needs_manual_review,
            "hunt finished"
        );
        Ok(summary)
    }

    /// Final state after a run, for snapshot export. The loop owns `state`
    /// internally, so callers that need it back use `run_with_state`.
    pub async fn run_with_state(
        &self,
        run_id: &str,
        state: RunState,
        resolution: Option<ResolutionState>,
        seq: i64,
    ) -> HuntResult<(HuntSummary, RunState)> {
        // Re-load from the store rather than threading the state out of the
        // loop; the last checkpoint is authoritative by construction.
        let summary = self.run(run_id, state, resolution, seq).await?;
        let checkpoint = self.store.load_latest(run_id).await?.ok_or_else(|| {
            HuntError::Persistence(format!("No checkpoint recorded for run {run_id}"))
        })?;
        Ok((summary, checkpoint.state))
    }

    async fn resolution_step(
        &self,
        state: &RunState,
        current: &ResolutionState,
    ) -> HuntResult<(StateDelta, Option<ResolutionState>)> {
        let item = state.items.get(&current.item_id).ok_or_else(|| {
            HuntError::Invariant(format!(
                "Resolution references unknown item {}",
                current.item_id
            ))
        })?;

        let workspace = self.workspace.provision(&item.id).await?;
        let details = self.notes.load(&item.id).await?.unwrap_or_default();
        let inputs = PhaseInputs {
            description: &item.short_description,
            details: &details,
            relevant_files: &item.relevant_files,
            workspace: &workspace,
        };

        let outcome = self.engine.step(current, &inputs).await?;

        if let Some((title, body)) = &outcome.note {
            self.notes.append(&item.id, title, body).await?;
        }

        let mut delta = StateDelta::default();
        match outcome.fix_event {
            FixEvent::None => {}
            FixEvent::Implemented {
                description,
                commits,
            } => {
                let fix = match state.fixes.get(&item.id) {
                    // Re-implementation after rejection keeps the record's
                    // history, replaces the description, and accumulates
                    // the new commits
                    Some(existing) => {
                        let mut fix = existing.clone();
                        fix.description = description;
                        fix.status = crate::domain::models::fix_record::FixStatus::InReview;
                        fix.commits.extend(commits);
                        fix.updated_at = chrono::Utc::now();
                        fix
                    }
                    None => commits
                        .into_iter()
                        .fold(FixRecord::in_review(&item.id, description), |fix, commit| {
                            fix.with_commit(commit)
                        }),
                };
                delta = delta.with_fix(fix);
            }
            FixEvent::Approved => {
                if let Some(fix) = state.fixes.get(&item.id) {
                    delta = delta.with_fix(fix.finished());
                }
            }
            FixEvent::Rejected { reason } => {
                if let Some(fix) = state.fixes.get(&item.id) {
                    delta = delta.with_fix(fix.rejected(reason));
                }
            }
        }

        if let Some(terminal) = outcome.state.terminal {
            // Fold the loop's terminal status back onto the item in the
            // same delta, so the two can never diverge across a crash
            let updated = item
                .with_status(terminal.item_status())
                .map_err(HuntError::Invariant)?;
            delta = delta.with_item(updated);
            delta.log.push(format!(
                "{}: resolution ended with {}",
                item.id,
                terminal.item_status().as_str()
            ));
            return Ok((delta, None));
        }

        delta.log.push(format!(
            "{}: advanced to {}",
            item.id,
            outcome.state.phase.as_str()
        ));
        Ok((delta, Some(outcome.state)))
    }

    fn route_orphaned(
        &self,
        state: &RunState,
        id: &ItemId,
    ) -> HuntResult<(StateDelta, Option<ResolutionState>)> {
        let item = state
            .items
            .get(id)
            .ok_or_else(|| HuntError::Invariant(format!("Unknown item {id}")))?;
        warn!(item_id = %id, "resolution context lost, routing to manual review");
        let updated = item
            .with_status(ItemStatus::NeedsManualReview)
            .map_err(HuntError::Invariant)?;
        let delta = StateDelta::message(format!(
            "{id}: resolution context lost, routed to manual review"
        ))
        .with_item(updated);
        Ok((delta, None))
    }

    fn start_resolution(
        &self,
        state: &RunState,
        id: &ItemId,
    ) -> HuntResult<(StateDelta, Option<ResolutionState>)> {
        let item = state
            .items
            .get(id)
            .ok_or_else(|| HuntError::Invariant(format!("Unknown item {id}")))?;
        let updated = item
            .with_status(ItemStatus::InResolution)
            .map_err(HuntError::Invariant)?;

        let delta = StateDelta::message(format!("{id}: entering resolution"))
            .with_item(updated);
        let resolution = ResolutionState::new(id.clone(), TaskProfile::BugFix);
        Ok((delta, Some(resolution)))
    }

    async fn classify(
        &self,
        state: &RunState,
        id: &ItemId,
    ) -> HuntResult<(StateDelta, Option<ResolutionState>)> {
        let item = state
            .items
            .get(id)
            .ok_or_else(|| HuntError::Invariant(format!("Unknown item {id}")))?;
        let details = self.notes.load(id).await?.unwrap_or_default();

        let ctx = ClassifyContext {
            item: item.clone(),
            details,
        };
        let classification = self
            .capability
            .classify(&ctx)
            .await
            .map_err(|e| HuntError::capability("classify", e.to_string()))?;

        self.notes
            .append(id, "Classification", &classification.reasoning)
            .await?;

        let classified = item.classified(classification.approach, classification.chance);
        // Items automation cannot drive are routed out in the same delta;
        // a crash can never leave a non-resolvable item parked in CLASSIFIED
        let (updated, note) = if classified.is_resolvable() {
            (classified, "eligible for resolution")
        } else {
            let routed = classified
                .with_status(ItemStatus::NeedsManualReview)
                .map_err(HuntError::Invariant)?;
            (routed, "routed to manual review")
        };

        let delta = StateDelta::message(format!(
            "{id}: classified as {} ({note})",
            classification.approach.as_str()
        ))
        .with_item(updated);
        Ok((delta, None))
    }

    async fn scout(
        &self,
        state: &RunState,
        entrypoint: &str,
    ) -> HuntResult<(StateDelta, Option<ResolutionState>)> {
        let ctx = DiscoveryContext {
            entrypoint: entrypoint.to_string(),
            known_items: state.item_summaries(),
            max_findings: self.limits.max_findings_per_entrypoint,
        };
        let report = self
            .capability
            .discover(&ctx)
            .await
            .map_err(|e| HuntError::capability("discover", e.to_string()))?;

        // Popping the entrypoint and recording its findings land in one
        // delta: a crash either replays the whole scout or sees it done
        let mut remaining = state.entrypoints.clone();
        if let Some(pos) = remaining.iter().position(|e| e == entrypoint) {
            remaining.remove(pos);
        }

        let mut delta = StateDelta::default().with_entrypoints(remaining);
        delta
            .log
            .push(format!("Scouted {entrypoint}: {}", report.summary));

        // Every finding is tracked regardless of severity; classification
        // selection later picks High-severity candidates only
        let mut known = state.items.clone();
        for finding in report
            .findings
            .into_iter()
            .take(self.limits.max_findings_per_entrypoint as usize)
        {
            let id = next_item_id(&known, &self.limits.id_prefix);
            let item = WorkItem::candidate(
                id.clone(),
                finding.short_description,
                finding.severity,
                finding.relevant_files,
            );
            self.notes.append(&id, "Discovery", &finding.details).await?;
            delta.log.push(format!(
                "Tracked {id} [{}]: {}",
                item.severity.as_str(),
                item.short_description
            ));
            known.insert(id.clone(), item.clone());
            delta = delta.with_item(item);
        }

        Ok((delta, None))
    }

    async fn suggest(
        &self,
        state: &RunState,
    ) -> HuntResult<(StateDelta, Option<ResolutionState>)> {
        let ctx = SuggestContext {
            known_items: state.item_summaries(),
        };
        let suggestion = self
            .capability
            .suggest_entrypoints(&ctx)
            .await
            .map_err(|e| HuntError::capability("suggest_entrypoints", e.to_string()))?;

        if suggestion.entrypoints.is_empty() {
            warn!("entrypoint suggestion came back empty");
        }

        let mut delta = StateDelta::message(format!(
            "Discovery round {}: {} entrypoints suggested",
            state.discovery_rounds + 1,
            suggestion.entrypoints.len()
        ))
        .with_entrypoints(suggestion.entrypoints);
        delta.discovery_round_consumed = true;
        Ok((delta, None))
    }
}
