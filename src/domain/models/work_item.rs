//! Work item domain model.
//!
//! A work item is one tracked defect moving through the hunt pipeline.
//! Items are replaced wholesale on every mutation; no caller mutates
//! individual fields of an entry it does not own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a work item, formatted `PREFIX-NNN` (e.g. `BH-001`).
pub type ItemId = String;

/// Severity of a tracked defect, ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// Status of a work item in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Freshly discovered, not yet classified
    Candidate,
    /// Reproducibility approach and chance are set
    Classified,
    /// Handed to the resolution engine
    InResolution,
    /// Resolution succeeded and the fix passed review
    Solved,
    /// Dropped: could not be reproduced or is not a real defect
    Discarded,
    /// Automation gave up; a human has to look at it
    NeedsManualReview,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Candidate => "CANDIDATE",
            Self::Classified => "CLASSIFIED",
            Self::InResolution => "IN_RESOLUTION",
            Self::Solved => "SOLVED",
            Self::Discarded => "DISCARDED",
            Self::NeedsManualReview => "NEEDS_MANUAL_REVIEW",
        }
    }

    /// Check if this is a terminal state. Terminal statuses are final for
    /// the run; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Solved | Self::Discarded | Self::NeedsManualReview)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<ItemStatus> {
        match self {
            Self::Candidate => vec![Self::Classified],
            Self::Classified => vec![Self::InResolution, Self::NeedsManualReview],
            Self::InResolution => {
                vec![Self::Solved, Self::Discarded, Self::NeedsManualReview]
            }
            Self::Solved | Self::Discarded | Self::NeedsManualReview => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// How a defect can be reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReproApproach {
    /// A failing unit test can demonstrate the defect. Only these items
    /// are eligible for automated resolution.
    UnitTest,
    /// Requires a human driving the system
    Manual,
    /// Requires environment setup beyond a single unit of code
    IntegrationTest,
}

impl ReproApproach {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnitTest => "UNIT_TEST",
            Self::Manual => "MANUAL",
            Self::IntegrationTest => "INTEGRATION_TEST",
        }
    }
}

/// Estimated likelihood that a developer can reproduce the defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReproChance {
    Easy,
    Medium,
    Hard,
}

impl ReproChance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }
}

/// A tracked defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier, monotonically assigned per run namespace
    pub id: ItemId,
    /// One-line description of the defect
    pub short_description: String,
    /// Severity assigned at discovery
    pub severity: Severity,
    /// Current pipeline status
    pub status: ItemStatus,
    /// Files relevant to the defect, in the order discovery reported them
    pub relevant_files: Vec<String>,
    /// Set during classification; None until then
    pub reproducibility_approach: Option<ReproApproach>,
    /// Set during classification; None until then
    pub reproducibility_chance: Option<ReproChance>,
    /// When discovered
    pub created_at: DateTime<Utc>,
    /// When last replaced
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Create a fresh candidate as discovery reports it.
    pub fn candidate(
        id: impl Into<ItemId>,
        short_description: impl Into<String>,
        severity: Severity,
        relevant_files: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            short_description: short_description.into(),
            severity,
            status: ItemStatus::Candidate,
            relevant_files,
            reproducibility_approach: None,
            reproducibility_chance: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Return a copy classified with the given approach and chance.
    ///
    /// Classification is the only transition out of `Candidate`.
    pub fn classified(&self, approach: ReproApproach, chance: ReproChance) -> Self {
        let mut item = self.clone();
        item.status = ItemStatus::Classified;
        item.reproducibility_approach = Some(approach);
        item.reproducibility_chance = Some(chance);
        item.updated_at = Utc::now();
        item
    }

    /// Return a copy with a new status, validating the transition.
    pub fn with_status(&self, new_status: ItemStatus) -> Result<Self, String> {
        if !self.status.can_transition_to(new_status) {
            return Err(format!(
                "Cannot transition {} from {} to {}",
                self.id,
                self.status.as_str(),
                new_status.as_str()
            ));
        }
        let mut item = self.clone();
        item.status = new_status;
        item.updated_at = Utc::now();
        Ok(item)
    }

    /// Whether this item is done for the run.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the dispatcher may hand this item to the resolution engine.
    pub fn is_resolvable(&self) -> bool {
        self.status == ItemStatus::Classified
            && self.reproducibility_approach == Some(ReproApproach::UnitTest)
    }

    /// One-line summary used when telling discovery what is already tracked.
    pub fn summary(&self) -> String {
        format!(
            "{} [{}] {}",
            self.id,
            self.severity.as_str(),
            self.short_description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem::candidate("BH-001", "Null deref in parser", Severity::High, vec![])
    }

    #[test]
    fn test_candidate_starts_unclassified() {
        let item = item();
        assert_eq!(item.status, ItemStatus::Candidate);
        assert!(item.reproducibility_approach.is_none());
        assert!(item.reproducibility_chance.is_none());
    }

    #[test]
    fn test_classification_sets_both_dimensions() {
        let item = item().classified(ReproApproach::UnitTest, ReproChance::Easy);
        assert_eq!(item.status, ItemStatus::Classified);
        assert_eq!(item.reproducibility_approach, Some(ReproApproach::UnitTest));
        assert_eq!(item.reproducibility_chance, Some(ReproChance::Easy));
        assert!(item.is_resolvable());
    }

    #[test]
    fn test_non_unit_test_items_are_not_resolvable() {
        let item = item().classified(ReproApproach::Manual, ReproChance::Hard);
        assert!(!item.is_resolvable());
        // But the transition to manual review is legal
        assert!(item.with_status(ItemStatus::NeedsManualReview).is_ok());
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for status in [
            ItemStatus::Solved,
            ItemStatus::Discarded,
            ItemStatus::NeedsManualReview,
        ] {
            assert!(status.is_terminal());
            assert!(status.valid_transitions().is_empty());
        }
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let item = item();
        // Candidate cannot jump straight into resolution
        assert!(item.with_status(ItemStatus::InResolution).is_err());
        assert!(item.with_status(ItemStatus::Solved).is_err());
    }

    #[test]
    fn test_resolution_resolves_to_exactly_one_terminal() {
        let classified = item().classified(ReproApproach::UnitTest, ReproChance::Easy);
        let in_resolution = classified.with_status(ItemStatus::InResolution).unwrap();
        let exits = in_resolution.status.valid_transitions();
        assert_eq!(
            exits,
            vec![
                ItemStatus::Solved,
                ItemStatus::Discarded,
                ItemStatus::NeedsManualReview
            ]
        );
    }
}
