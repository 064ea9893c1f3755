//! Port traits the core depends on. Adapters implement them.

pub mod capability;
pub mod checkpoint;
pub mod notes;
pub mod workspace;

pub use capability::{
    Capability, CapabilityError, CapabilityResult, Classification, ClassifyContext,
    DiscoveryContext, DiscoveryReport, EntrypointSuggestion, Finding, ImplementOutcome,
    PhaseContext, RefineOutcome, ReviewVerdict, SuggestContext, WriteTestsOutcome,
};
pub use checkpoint::{Checkpoint, CheckpointStore, RunId, RunRecord};
pub use notes::DetailNotes;
pub use workspace::WorkspaceProvider;
