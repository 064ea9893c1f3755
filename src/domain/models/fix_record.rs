//! Fix record domain model.
//!
//! Exactly one fix record exists per item that reached review. Records are
//! replaced wholesale, the same discipline as work items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::work_item::ItemId;

/// Status of a fix in the review cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixStatus {
    /// Implemented, waiting for (or undergoing) review
    InReview,
    /// Review rejected the change; another implement cycle follows
    Rejected,
    /// Review accepted the change
    Finished,
}

impl FixStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InReview => "IN_REVIEW",
            Self::Rejected => "REJECTED",
            Self::Finished => "FINISHED",
        }
    }
}

/// A committed (or in-review) fix for a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    /// The work item this fix belongs to. Must reference an existing item.
    pub item_id: ItemId,
    /// What the fix changes
    pub description: String,
    /// Review status
    pub status: FixStatus,
    /// Last rejection reason, if any
    pub rejection_reason: Option<String>,
    /// Commits that carry the reproduction and the fix
    pub commits: Vec<String>,
    /// When the fix was first produced
    pub created_at: DateTime<Utc>,
    /// When last replaced
    pub updated_at: DateTime<Utc>,
}

impl FixRecord {
    /// Create a record for a fix that just entered review.
    pub fn in_review(item_id: impl Into<ItemId>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            item_id: item_id.into(),
            description: description.into(),
            status: FixStatus::InReview,
            rejection_reason: None,
            commits: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Return a copy marked rejected with the given reason.
    pub fn rejected(&self, reason: impl Into<String>) -> Self {
        let mut fix = self.clone();
        fix.status = FixStatus::Rejected;
        fix.rejection_reason = Some(reason.into());
        fix.updated_at = Utc::now();
        fix
    }

    /// Return a copy marked finished.
    pub fn finished(&self) -> Self {
        let mut fix = self.clone();
        fix.status = FixStatus::Finished;
        fix.updated_at = Utc::now();
        fix
    }

    /// Record a commit reference.
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commits.push(commit.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_lifecycle() {
        let fix = FixRecord::in_review("BH-001", "Guard against empty input");
        assert_eq!(fix.status, FixStatus::InReview);
        assert!(fix.rejection_reason.is_none());

        let rejected = fix.rejected("Misses the zero-length case");
        assert_eq!(rejected.status, FixStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("Misses the zero-length case")
        );

        let finished = rejected.finished();
        assert_eq!(finished.status, FixStatus::Finished);
        // The last rejection reason is kept for the record
        assert!(finished.rejection_reason.is_some());
    }

    #[test]
    fn test_commits_accumulate() {
        let fix = FixRecord::in_review("BH-002", "desc")
            .with_commit("abc123")
            .with_commit("def456");
        assert_eq!(fix.commits, vec!["abc123", "def456"]);
    }
}
