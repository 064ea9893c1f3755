//! Service layer: the dispatcher loop, the resolution engine, the registry
//! merge functions, and snapshot export.

pub mod dispatcher;
pub mod registry;
pub mod resolution;
pub mod snapshot;

pub use dispatcher::{decide, Dispatcher, HuntLimits, HuntSummary, NextAction};
pub use resolution::{FixEvent, PhaseInputs, ResolutionEngine, StepOutcome};
pub use snapshot::SnapshotStore;
