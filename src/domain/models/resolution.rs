//! Resolution sub-workflow state.
//!
//! One `ResolutionState` exists per item the dispatcher has handed to the
//! resolution engine. The state is checkpointed between phases so a crash
//! resumes mid-loop instead of restarting at `WriteTests`.

use serde::{Deserialize, Serialize};

use super::work_item::{ItemId, ItemStatus};

/// Phase of the write-tests/implement/refine/review loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPhase {
    WriteTests,
    Implement,
    Refine,
    Review,
    Done,
}

impl ResolutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteTests => "write_tests",
            Self::Implement => "implement",
            Self::Refine => "refine",
            Self::Review => "review",
            Self::Done => "done",
        }
    }
}

/// How a resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalStatus {
    /// Review accepted the fix
    Success,
    /// The item was dropped during the loop (e.g. not reproducible)
    Discarded,
    /// The review/implement loop hit its retry bound
    MaxAttemptsReached,
}

impl TerminalStatus {
    /// Map a resolution outcome onto the item status it produces.
    ///
    /// Total: every terminal status maps to exactly one item status.
    pub fn item_status(&self) -> ItemStatus {
        match self {
            Self::Success => ItemStatus::Solved,
            Self::Discarded => ItemStatus::Discarded,
            Self::MaxAttemptsReached => ItemStatus::NeedsManualReview,
        }
    }
}

/// Task-type profile for the resolution loop.
///
/// Control flow is identical across profiles; only the instruction content
/// differs, plus whether the refine pass runs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskProfile {
    /// Reproduce a defect with a failing test, then fix it
    BugFix,
    /// Specify a feature with tests, then build it
    Feature,
    /// Characterize current behavior, then restructure under green tests
    Refactor,
}

impl TaskProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BugFix => "bug_fix",
            Self::Feature => "feature",
            Self::Refactor => "refactor",
        }
    }

    /// Whether this profile runs the refine pass between implement and review.
    ///
    /// Refactoring is already a cleanup task; a second cleanup pass over it
    /// adds a capability call without adding information.
    pub fn refines(&self) -> bool {
        !matches!(self, Self::Refactor)
    }

    /// Instruction content for the write-tests phase.
    pub fn write_tests_instructions(&self) -> &'static str {
        match self {
            Self::BugFix => {
                "Write a failing unit test that demonstrates the defect. \
                 The test must fail before the fix and pass after it. \
                 If the defect cannot be reproduced without complex setup, discard it with a reason."
            }
            Self::Feature => {
                "Write tests that specify the expected behavior of the feature. \
                 Focus on what it should do, not how."
            }
            Self::Refactor => {
                "Write characterization tests that capture the current behavior, \
                 so the restructuring cannot silently change it."
            }
        }
    }

    /// Instruction content for the implement phase.
    pub fn implement_instructions(&self) -> &'static str {
        match self {
            Self::BugFix => {
                "The failing test is in place. Make it pass with the smallest change \
                 that actually fixes the defect."
            }
            Self::Feature => "Tests are in place. Implement the minimal code to make them pass.",
            Self::Refactor => {
                "Characterization tests are in place. Restructure the code while \
                 keeping every test green."
            }
        }
    }

    /// Instruction content for the refine phase.
    pub fn refine_instructions(&self) -> &'static str {
        match self {
            Self::BugFix | Self::Feature => {
                "Simplify the production change, then transform the driving tests into \
                 maintainable ones: drop scaffolding, consolidate redundant cases, and \
                 describe behavior rather than implementation."
            }
            Self::Refactor => "",
        }
    }

    /// Instruction content for the review phase.
    pub fn review_instructions(&self) -> &'static str {
        match self {
            Self::BugFix => {
                "Review the reproduction and the fix. Check that the whole defect is \
                 addressed, the change follows project style, and the tests are meaningful."
            }
            Self::Feature => {
                "Review the feature. Check that it meets the requirements, the \
                 implementation is clean, and edge cases are handled."
            }
            Self::Refactor => {
                "Review the restructuring. Check that behavior is preserved, the code \
                 is cleaner, and all tests pass."
            }
        }
    }
}

/// Transient per-item state of the resolution loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionState {
    /// The item being resolved
    pub item_id: ItemId,
    /// Task-type profile driving the instruction content
    pub profile: TaskProfile,
    /// Phase the next step will execute
    pub phase: ResolutionPhase,
    /// Number of completed review attempts
    pub review_attempts: u32,
    /// Rejection reasons, oldest first
    pub rejection_history: Vec<String>,
    /// Reference to the test artifact produced by `WriteTests`
    pub test_reference: Option<String>,
    /// Accumulated narrative from the phases
    pub notes: String,
    /// Set exactly once, when the loop reaches `Done`
    pub terminal: Option<TerminalStatus>,
}

impl ResolutionState {
    pub fn new(item_id: impl Into<ItemId>, profile: TaskProfile) -> Self {
        Self {
            item_id: item_id.into(),
            profile,
            phase: ResolutionPhase::WriteTests,
            review_attempts: 0,
            rejection_history: Vec::new(),
            test_reference: None,
            notes: String::new(),
            terminal: None,
        }
    }

    /// Whether the loop has ended.
    pub fn is_done(&self) -> bool {
        self.phase == ResolutionPhase::Done
    }

    /// Append a section to the accumulated notes.
    pub fn push_note(&mut self, phase: ResolutionPhase, note: &str) {
        if note.is_empty() {
            return;
        }
        if !self.notes.is_empty() {
            self.notes.push_str("\n\n");
        }
        self.notes.push_str(&format!("{}: {}", phase.as_str(), note));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_status_mapping_is_total() {
        assert_eq!(TerminalStatus::Success.item_status(), ItemStatus::Solved);
        assert_eq!(TerminalStatus::Discarded.item_status(), ItemStatus::Discarded);
        assert_eq!(
            TerminalStatus::MaxAttemptsReached.item_status(),
            ItemStatus::NeedsManualReview
        );
    }

    #[test]
    fn test_refactor_profile_skips_refine() {
        assert!(TaskProfile::BugFix.refines());
        assert!(TaskProfile::Feature.refines());
        assert!(!TaskProfile::Refactor.refines());
    }

    #[test]
    fn test_new_state_starts_at_write_tests() {
        let state = ResolutionState::new("BH-001", TaskProfile::BugFix);
        assert_eq!(state.phase, ResolutionPhase::WriteTests);
        assert_eq!(state.review_attempts, 0);
        assert!(state.terminal.is_none());
        assert!(!state.is_done());
    }

    #[test]
    fn test_notes_accumulate_with_phase_labels() {
        let mut state = ResolutionState::new("BH-001", TaskProfile::BugFix);
        state.push_note(ResolutionPhase::WriteTests, "reproduced in parser_test");
        state.push_note(ResolutionPhase::Implement, "guarded the empty case");
        state.push_note(ResolutionPhase::Refine, "");
        assert_eq!(
            state.notes,
            "write_tests: reproduced in parser_test\n\nimplement: guarded the empty case"
        );
    }
}
