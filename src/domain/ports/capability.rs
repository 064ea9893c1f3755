//! Port trait for the external exploration/implementation/review capability.
//!
//! Every unit of pipeline work is one call to an opaque agent that explores
//! code and proposes changes. The call may block for arbitrary wall-clock
//! time and is non-deterministic; the core only sees the structured results
//! defined here.
//!
//! Failures at this boundary are transient by definition: the dispatcher
//! aborts the in-flight step without merging and the run resumes from the
//! previous checkpoint. A phase is therefore safe to re-execute from the
//! same stored context. In particular, a failed `review` call is an error,
//! never a rejection — the two must not be conflated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::models::resolution::{ResolutionPhase, TaskProfile};
use crate::domain::models::work_item::{
    ItemId, ReproApproach, ReproChance, Severity, WorkItem,
};

/// Error from a capability call.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The agent process or transport failed
    #[error("capability call failed: {0}")]
    CallFailed(String),

    /// The agent returned output the adapter could not parse
    #[error("capability returned unparsable output: {0}")]
    Unparsable(String),
}

pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Context for requesting fresh exploration seeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestContext {
    /// Summaries of already-tracked items, so suggestions avoid ground
    /// that has been covered
    pub known_items: Vec<String>,
}

/// Suggested exploration seeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrypointSuggestion {
    pub entrypoints: Vec<String>,
    pub reasoning: String,
}

/// Context for one discovery pass over an entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryContext {
    /// The file or module to explore from
    pub entrypoint: String,
    /// Summaries of already-tracked items (duplicate suppression)
    pub known_items: Vec<String>,
    /// Upper bound on findings per pass
    pub max_findings: u32,
}

/// One candidate defect reported by discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub short_description: String,
    pub severity: Severity,
    pub relevant_files: Vec<String>,
    /// Full context and reproduction steps, stored as detail notes
    pub details: String,
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub findings: Vec<Finding>,
    pub summary: String,
}

/// Context for classifying one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyContext {
    pub item: WorkItem,
    /// Detail notes accumulated for the item
    pub details: String,
}

/// Classification verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub approach: ReproApproach,
    pub chance: ReproChance,
    pub reasoning: String,
}

/// Context for one resolution phase. Freshly constructed per call from
/// checkpointed state, so re-running a phase after a crash sees the same
/// inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseContext {
    pub item_id: ItemId,
    pub profile: TaskProfile,
    pub phase: ResolutionPhase,
    /// Short description of the item
    pub description: String,
    /// Detail notes accumulated so far
    pub details: String,
    pub relevant_files: Vec<String>,
    /// Review rejections so far, oldest first
    pub rejection_history: Vec<String>,
    /// Isolated worktree the agent operates in
    pub workspace: PathBuf,
}

/// Outcome of the write-tests phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteTestsOutcome {
    /// A reproducing/specifying test exists and is committed
    Prepared {
        test_reference: Option<String>,
        notes: String,
    },
    /// The item is not worth pursuing; the loop never starts
    Discarded { reason: String },
}

/// Outcome of the implement phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplementOutcome {
    /// An implementation delta exists and is committed
    Ready {
        description: String,
        notes: String,
        /// Commit references carrying the change
        #[serde(default)]
        commits: Vec<String>,
    },
    /// Implementation concluded this is not a real defect
    Discarded { reason: String },
}

/// Outcome of the refine phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineOutcome {
    pub refined: bool,
    pub notes: String,
}

/// Outcome of the review phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewVerdict {
    Approved { notes: String },
    Rejected { reason: String, notes: String },
}

/// The external agent behind every pipeline phase.
///
/// Implementations must be `Send + Sync`; the dispatcher holds one instance
/// for the whole run and never issues concurrent calls.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Ask for fresh exploration seeds.
    async fn suggest_entrypoints(
        &self,
        ctx: &SuggestContext,
    ) -> CapabilityResult<EntrypointSuggestion>;

    /// Explore one entrypoint for candidate defects.
    async fn discover(&self, ctx: &DiscoveryContext) -> CapabilityResult<DiscoveryReport>;

    /// Classify a candidate's reproducibility.
    async fn classify(&self, ctx: &ClassifyContext) -> CapabilityResult<Classification>;

    /// Produce a failing/specifying test, or discard the item.
    async fn write_tests(&self, ctx: &PhaseContext) -> CapabilityResult<WriteTestsOutcome>;

    /// Produce an implementation delta against the test.
    async fn implement(&self, ctx: &PhaseContext) -> CapabilityResult<ImplementOutcome>;

    /// Optional cleanup pass over the implementation.
    async fn refine(&self, ctx: &PhaseContext) -> CapabilityResult<RefineOutcome>;

    /// Review the change; approve or reject with a reason.
    async fn review(&self, ctx: &PhaseContext) -> CapabilityResult<ReviewVerdict>;
}
