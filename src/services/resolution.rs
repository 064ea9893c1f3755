//! Generic bounded-retry resolution engine.
//!
//! Drives the write-tests → implement → refine → review loop for one item,
//! one phase per `step` call. The dispatcher checkpoints between steps, so
//! a crash resumes at the phase that was about to run, with the attempt
//! counter and rejection history intact.
//!
//! The engine never retries a phase internally: a capability failure
//! propagates as `HuntError::Capability` and the step produces no state
//! change. A genuine `Rejected` review verdict is a valid loop iteration,
//! not an error.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::domain::errors::{HuntError, HuntResult};
use crate::domain::models::resolution::{ResolutionPhase, ResolutionState, TerminalStatus};
use crate::domain::ports::capability::{
    Capability, ImplementOutcome, PhaseContext, ReviewVerdict, WriteTestsOutcome,
};

/// Inputs a phase needs beyond the resolution state itself.
#[derive(Debug, Clone)]
pub struct PhaseInputs<'a> {
    /// Short description of the item under resolution
    pub description: &'a str,
    /// Detail notes accumulated for the item
    pub details: &'a str,
    pub relevant_files: &'a [String],
    /// Isolated worktree for this item
    pub workspace: &'a Path,
}

/// Fix-record event produced by a step, for the dispatcher to fold into
/// the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum FixEvent {
    None,
    /// Implement produced a change; a fix record enters review
    Implemented {
        description: String,
        commits: Vec<String>,
    },
    /// Review accepted the change
    Approved,
    /// Review rejected the change with a reason
    Rejected { reason: String },
}

/// Result of executing one phase.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The advanced resolution state
    pub state: ResolutionState,
    /// Titled section to append to the item's detail notes
    pub note: Option<(String, String)>,
    pub fix_event: FixEvent,
}

/// The four-phase state machine, generic over the capability behind it.
pub struct ResolutionEngine<C> {
    capability: Arc<C>,
    max_review_attempts: u32,
}

impl<C: Capability> ResolutionEngine<C> {
    pub fn new(capability: Arc<C>, max_review_attempts: u32) -> Self {
        Self {
            capability,
            max_review_attempts,
        }
    }

    fn phase_context(&self, state: &ResolutionState, inputs: &PhaseInputs<'_>) -> PhaseContext {
        PhaseContext {
            item_id: state.item_id.clone(),
            profile: state.profile,
            phase: state.phase,
            description: inputs.description.to_string(),
            details: inputs.details.to_string(),
            relevant_files: inputs.relevant_files.to_vec(),
            rejection_history: state.rejection_history.clone(),
            workspace: inputs.workspace.to_path_buf(),
        }
    }

    /// Execute exactly one phase and return the advanced state.
    pub async fn step(
        &self,
        state: &ResolutionState,
        inputs: &PhaseInputs<'_>,
    ) -> HuntResult<StepOutcome> {
        let ctx = self.phase_context(state, inputs);
        match state.phase {
            ResolutionPhase::WriteTests => self.write_tests(state, &ctx).await,
            ResolutionPhase::Implement => self.implement(state, &ctx).await,
            ResolutionPhase::Refine => self.refine(state, &ctx).await,
            ResolutionPhase::Review => self.review(state, &ctx).await,
            ResolutionPhase::Done => Err(HuntError::Invariant(format!(
                "Resolution for {} is already done",
                state.item_id
            ))),
        }
    }

    async fn write_tests(
        &self,
        state: &ResolutionState,
        ctx: &PhaseContext,
    ) -> HuntResult<StepOutcome> {
        let outcome = self
            .capability
            .write_tests(ctx)
            .await
            .map_err(|e| HuntError::capability("write_tests", e.to_string()))?;

        let mut next = state.clone();
        let outcome = match outcome {
            WriteTestsOutcome::Prepared {
                test_reference,
                notes,
            } => {
                info!(item_id = %state.item_id, "tests prepared");
                next.test_reference = test_reference;
                next.phase = ResolutionPhase::Implement;
                next.push_note(ResolutionPhase::WriteTests, &notes);
                StepOutcome {
                    state: next,
                    note: Some(("Reproduction".to_string(), notes)),
                    fix_event: FixEvent::None,
                }
            }
            WriteTestsOutcome::Discarded { reason } => {
                // Discard short-circuits: implement/refine/review never run
                info!(item_id = %state.item_id, %reason, "discarded at write_tests");
                next.phase = ResolutionPhase::Done;
                next.terminal = Some(TerminalStatus::Discarded);
                next.push_note(ResolutionPhase::WriteTests, &reason);
                StepOutcome {
                    state: next,
                    note: Some(("Discarded".to_string(), reason)),
                    fix_event: FixEvent::None,
                }
            }
        };
        Ok(outcome)
    }

    async fn implement(
        &self,
        state: &ResolutionState,
        ctx: &PhaseContext,
    ) -> HuntResult<StepOutcome> {
        let outcome = self
            .capability
            .implement(ctx)
            .await
            .map_err(|e| HuntError::capability("implement", e.to_string()))?;

        let mut next = state.clone();
        let outcome = match outcome {
            ImplementOutcome::Ready {
                description,
                notes,
                commits,
            } => {
                next.phase = if state.profile.refines() {
                    ResolutionPhase::Refine
                } else {
                    ResolutionPhase::Review
                };
                next.push_note(ResolutionPhase::Implement, &notes);
                StepOutcome {
                    state: next,
                    note: Some(("Implementation".to_string(), notes)),
                    fix_event: FixEvent::Implemented {
                        description,
                        commits,
                    },
                }
            }
            ImplementOutcome::Discarded { reason } => {
                info!(item_id = %state.item_id, %reason, "discarded at implement");
                next.phase = ResolutionPhase::Done;
                next.terminal = Some(TerminalStatus::Discarded);
                next.push_note(ResolutionPhase::Implement, &reason);
                StepOutcome {
                    state: next,
                    note: Some(("Discarded".to_string(), reason)),
                    fix_event: FixEvent::None,
                }
            }
        };
        Ok(outcome)
    }

    async fn refine(
        &self,
        state: &ResolutionState,
        ctx: &PhaseContext,
    ) -> HuntResult<StepOutcome> {
        let mut next = state.clone();
        next.phase = ResolutionPhase::Review;

        if !state.profile.refines() {
            // Profiles without a refine pass fall straight through
            return Ok(StepOutcome {
                state: next,
                note: None,
                fix_event: FixEvent::None,
            });
        }

        let outcome = self
            .capability
            .refine(ctx)
            .await
            .map_err(|e| HuntError::capability("refine", e.to_string()))?;

        next.push_note(ResolutionPhase::Refine, &outcome.notes);
        let note = if outcome.notes.is_empty() {
            None
        } else {
            Some(("Refinement".to_string(), outcome.notes))
        };
        Ok(StepOutcome {
            state: next,
            note,
            fix_event: FixEvent::None,
        })
    }

    async fn review(
        &self,
        state: &ResolutionState,
        ctx: &PhaseContext,
    ) -> HuntResult<StepOutcome> {
        let verdict = self
            .capability
            .review(ctx)
            .await
            .map_err(|e| HuntError::capability("review", e.to_string()))?;

        let mut next = state.clone();
        let outcome = match verdict {
            ReviewVerdict::Approved { notes } => {
                info!(item_id = %state.item_id, "review approved");
                next.phase = ResolutionPhase::Done;
                next.terminal = Some(TerminalStatus::Success);
                next.push_note(ResolutionPhase::Review, &notes);
                StepOutcome {
                    state: next,
                    note: Some(("Review".to_string(), notes)),
                    fix_event: FixEvent::Approved,
                }
            }
            ReviewVerdict::Rejected { reason, notes } => {
                next.review_attempts = state.review_attempts + 1;
                next.rejection_history.push(reason.clone());
                next.push_note(ResolutionPhase::Review, &notes);
                if next.review_attempts >= self.max_review_attempts {
                    info!(
                        item_id = %state.item_id,
                        attempts = next.review_attempts,
                        "review retry bound reached"
                    );
                    next.phase = ResolutionPhase::Done;
                    next.terminal = Some(TerminalStatus::MaxAttemptsReached);
                } else {
                    info!(
                        item_id = %state.item_id,
                        attempts = next.review_attempts,
                        "review rejected, looping back to implement"
                    );
                    next.phase = ResolutionPhase::Implement;
                }
                StepOutcome {
                    state: next,
                    note: Some(("Review rejection".to_string(), reason.clone())),
                    fix_event: FixEvent::Rejected { reason },
                }
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::agent::mock::MockCapability;
    use crate::domain::models::resolution::TaskProfile;
    use std::path::PathBuf;

    fn inputs(workspace: &Path) -> PhaseInputs<'_> {
        PhaseInputs {
            description: "Null deref in parser",
            details: "",
            relevant_files: &[],
            workspace,
        }
    }

    async fn drive_to_done(
        engine: &ResolutionEngine<MockCapability>,
        mut state: ResolutionState,
    ) -> (ResolutionState, Vec<FixEvent>) {
        let workspace = PathBuf::from("/tmp/unused");
        let mut events = Vec::new();
        while !state.is_done() {
            let outcome = engine.step(&state, &inputs(&workspace)).await.unwrap();
            events.push(outcome.fix_event);
            state = outcome.state;
        }
        (state, events)
    }

    #[tokio::test]
    async fn test_happy_path_reaches_success() {
        let capability = Arc::new(MockCapability::approving());
        let engine = ResolutionEngine::new(capability, 3);
        let state = ResolutionState::new("BH-001", TaskProfile::BugFix);
        let (done, events) = drive_to_done(&engine, state).await;

        assert_eq!(done.terminal, Some(TerminalStatus::Success));
        assert_eq!(done.review_attempts, 0);
        assert!(events.contains(&FixEvent::Approved));
        // The implement phase hands its commit references through
        assert!(events.iter().any(|e| matches!(
            e,
            FixEvent::Implemented { commits, .. } if commits == &["abc1234".to_string()]
        )));
    }

    #[tokio::test]
    async fn test_discard_at_write_tests_short_circuits() {
        let capability = Arc::new(MockCapability::discarding("cannot reproduce"));
        let engine = ResolutionEngine::new(capability.clone(), 3);
        let state = ResolutionState::new("BH-001", TaskProfile::BugFix);
        let (done, _) = drive_to_done(&engine, state).await;

        assert_eq!(done.terminal, Some(TerminalStatus::Discarded));
        // Only write_tests ran; the loop never started
        assert_eq!(capability.calls(), vec!["write_tests"]);
    }

    #[tokio::test]
    async fn test_always_rejected_hits_bound_after_exactly_three() {
        let capability = Arc::new(MockCapability::rejecting("not quite right"));
        let engine = ResolutionEngine::new(capability, 3);
        let state = ResolutionState::new("BH-001", TaskProfile::BugFix);
        let (done, _) = drive_to_done(&engine, state).await;

        assert_eq!(done.terminal, Some(TerminalStatus::MaxAttemptsReached));
        assert_eq!(done.review_attempts, 3);
        assert_eq!(done.rejection_history.len(), 3);
    }

    #[tokio::test]
    async fn test_refactor_profile_never_calls_refine() {
        let capability = Arc::new(MockCapability::approving());
        let engine = ResolutionEngine::new(capability.clone(), 3);
        let state = ResolutionState::new("BH-001", TaskProfile::Refactor);
        let (done, _) = drive_to_done(&engine, state).await;

        assert_eq!(done.terminal, Some(TerminalStatus::Success));
        assert!(!capability.calls().contains(&"refine".to_string()));
    }

    #[tokio::test]
    async fn test_capability_failure_propagates_without_state_change() {
        let capability = Arc::new(MockCapability::failing());
        let engine = ResolutionEngine::new(capability, 3);
        let state = ResolutionState::new("BH-001", TaskProfile::BugFix);
        let workspace = PathBuf::from("/tmp/unused");

        let err = engine.step(&state, &inputs(&workspace)).await.unwrap_err();
        assert!(matches!(err, HuntError::Capability { .. }));
        // A failed call never counts as a rejection
        assert_eq!(state.review_attempts, 0);
        assert!(state.rejection_history.is_empty());
    }

    #[tokio::test]
    async fn test_step_on_done_state_is_invariant_error() {
        let capability = Arc::new(MockCapability::approving());
        let engine = ResolutionEngine::new(capability, 3);
        let mut state = ResolutionState::new("BH-001", TaskProfile::BugFix);
        state.phase = ResolutionPhase::Done;
        let workspace = PathBuf::from("/tmp/unused");

        let err = engine.step(&state, &inputs(&workspace)).await.unwrap_err();
        assert!(matches!(err, HuntError::Invariant(_)));
    }
}
