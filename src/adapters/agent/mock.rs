//! Scripted capability test double.
//!
//! Discovery-side calls pop from scripted queues; resolution-phase calls
//! follow a fixed behavior. Every call is recorded so tests can assert
//! which phases actually ran.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::ports::capability::{
    Capability, CapabilityError, CapabilityResult, Classification, ClassifyContext,
    DiscoveryContext, DiscoveryReport, EntrypointSuggestion, ImplementOutcome, PhaseContext,
    RefineOutcome, ReviewVerdict, SuggestContext, WriteTestsOutcome,
};

#[derive(Debug, Clone)]
enum PhaseBehavior {
    /// Every review approves
    Approve,
    /// Every review rejects with this reason
    Reject(String),
    /// write_tests discards with this reason
    Discard(String),
    /// Every call fails at the transport
    Fail,
}

pub struct MockCapability {
    behavior: PhaseBehavior,
    calls: Mutex<Vec<String>>,
    entrypoint_batches: Mutex<VecDeque<Vec<String>>>,
    discovery_reports: Mutex<VecDeque<DiscoveryReport>>,
    classifications: Mutex<VecDeque<Classification>>,
}

impl MockCapability {
    fn with_behavior(behavior: PhaseBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            entrypoint_batches: Mutex::new(VecDeque::new()),
            discovery_reports: Mutex::new(VecDeque::new()),
            classifications: Mutex::new(VecDeque::new()),
        }
    }

    pub fn approving() -> Self {
        Self::with_behavior(PhaseBehavior::Approve)
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self::with_behavior(PhaseBehavior::Reject(reason.into()))
    }

    pub fn discarding(reason: impl Into<String>) -> Self {
        Self::with_behavior(PhaseBehavior::Discard(reason.into()))
    }

    pub fn failing() -> Self {
        Self::with_behavior(PhaseBehavior::Fail)
    }

    /// Queue one batch of entrypoints for `suggest_entrypoints`. Later
    /// calls past the queue return an empty suggestion.
    pub fn with_entrypoint_batch(self, entrypoints: Vec<&str>) -> Self {
        self.entrypoint_batches
            .lock()
            .unwrap()
            .push_back(entrypoints.into_iter().map(String::from).collect());
        self
    }

    /// Queue one discovery report for `discover`.
    pub fn with_discovery(self, report: DiscoveryReport) -> Self {
        self.discovery_reports.lock().unwrap().push_back(report);
        self
    }

    /// Queue one classification verdict for `classify`.
    pub fn with_classification(self, classification: Classification) -> Self {
        self.classifications.lock().unwrap().push_back(classification);
        self
    }

    /// Names of the capability methods called, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &str) -> CapabilityResult<()> {
        self.calls.lock().unwrap().push(name.to_string());
        if matches!(self.behavior, PhaseBehavior::Fail) {
            return Err(CapabilityError::CallFailed(format!("{name} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl Capability for MockCapability {
    async fn suggest_entrypoints(
        &self,
        _ctx: &SuggestContext,
    ) -> CapabilityResult<EntrypointSuggestion> {
        self.record("suggest_entrypoints")?;
        let entrypoints = self
            .entrypoint_batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(EntrypointSuggestion {
            entrypoints,
            reasoning: "scripted".into(),
        })
    }

    async fn discover(&self, _ctx: &DiscoveryContext) -> CapabilityResult<DiscoveryReport> {
        self.record("discover")?;
        Ok(self
            .discovery_reports
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(DiscoveryReport {
                findings: vec![],
                summary: "nothing found".into(),
            }))
    }

    async fn classify(&self, _ctx: &ClassifyContext) -> CapabilityResult<Classification> {
        self.record("classify")?;
        self.classifications
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CapabilityError::CallFailed("no classification scripted".into()))
    }

    async fn write_tests(&self, _ctx: &PhaseContext) -> CapabilityResult<WriteTestsOutcome> {
        self.record("write_tests")?;
        match &self.behavior {
            PhaseBehavior::Discard(reason) => Ok(WriteTestsOutcome::Discarded {
                reason: reason.clone(),
            }),
            _ => Ok(WriteTestsOutcome::Prepared {
                test_reference: Some("tests/repro.rs".into()),
                notes: "failing test in place".into(),
            }),
        }
    }

    async fn implement(&self, _ctx: &PhaseContext) -> CapabilityResult<ImplementOutcome> {
        self.record("implement")?;
        Ok(ImplementOutcome::Ready {
            description: "guard the empty case".into(),
            notes: "minimal change".into(),
            commits: vec!["abc1234".into()],
        })
    }

    async fn refine(&self, _ctx: &PhaseContext) -> CapabilityResult<RefineOutcome> {
        self.record("refine")?;
        Ok(RefineOutcome {
            refined: true,
            notes: "tidied the test".into(),
        })
    }

    async fn review(&self, _ctx: &PhaseContext) -> CapabilityResult<ReviewVerdict> {
        self.record("review")?;
        match &self.behavior {
            PhaseBehavior::Reject(reason) => Ok(ReviewVerdict::Rejected {
                reason: reason.clone(),
                notes: "see reason".into(),
            }),
            _ => Ok(ReviewVerdict::Approved {
                notes: "looks good".into(),
            }),
        }
    }
}
