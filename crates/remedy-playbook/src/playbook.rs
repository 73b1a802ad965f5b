//! Playbook definitions

use crate::step::PlaybookStep;
use crate::steps::{
    DispatchWorkflow, IngestIncidentUpdate, IngestWorkflowResult, PollWorkflow, RunVerification,
};
use remedy_core::{Category, Evidence, EvidenceKind};
use std::sync::Arc;

/// Id of the workflow re-dispatch playbook
pub const REDISPATCH_WORKFLOW: &str = "redispatch-workflow";

/// Id of the deployment verification playbook
pub const VERIFY_DEPLOYMENT: &str = "verify-deployment";

/// Immutable playbook definition
#[derive(Clone)]
pub struct Playbook {
    pub id: String,
    pub version: String,
    pub applicable_categories: Vec<Category>,
    /// Any one of these kinds satisfies the evidence gate
    pub required_evidence: Vec<EvidenceKind>,
    pub steps: Vec<Arc<dyn PlaybookStep>>,
}

impl std::fmt::Debug for Playbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playbook")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("applicable_categories", &self.applicable_categories)
            .field("required_evidence", &self.required_evidence)
            .field("steps", &self.step_ids())
            .finish()
    }
}

impl Playbook {
    /// Create playbook with no steps
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            applicable_categories: Vec::new(),
            required_evidence: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Applicable to category
    #[must_use]
    pub fn for_category(mut self, category: Category) -> Self {
        self.applicable_categories.push(category);
        self
    }

    /// Accept evidence kind in the gate
    #[must_use]
    pub fn requires(mut self, kind: EvidenceKind) -> Self {
        self.required_evidence.push(kind);
        self
    }

    /// Append step
    #[must_use]
    pub fn step(mut self, step: Arc<dyn PlaybookStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Step ids in execution order
    #[must_use]
    pub fn step_ids(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    /// Whether this playbook handles `category`
    #[inline]
    #[must_use]
    pub fn applies_to(&self, category: Category) -> bool {
        self.applicable_categories.contains(&category)
    }

    /// Evidence gate (OR semantics); an empty requirement always passes
    #[must_use]
    pub fn evidence_satisfied(&self, evidence: &[Evidence]) -> bool {
        self.required_evidence.is_empty()
            || evidence
                .iter()
                .any(|e| self.required_evidence.contains(&e.kind()))
    }

    /// Re-dispatch a failed CI workflow at its recorded revision
    #[must_use]
    pub fn redispatch_workflow() -> Self {
        Self::new(REDISPATCH_WORKFLOW, "1.0.0")
            .for_category(Category::RunnerWorkflowFailed)
            .requires(EvidenceKind::GithubRun)
            .step(Arc::new(DispatchWorkflow))
            .step(Arc::new(PollWorkflow))
            .step(Arc::new(IngestWorkflowResult))
    }

    /// Re-run deployment verification and mitigate on success
    #[must_use]
    pub fn verify_deployment() -> Self {
        Self::new(VERIFY_DEPLOYMENT, "1.0.0")
            .for_category(Category::DeployVerificationFailed)
            .for_category(Category::AlbTargetUnhealthy)
            .requires(EvidenceKind::Verification)
            .step(Arc::new(RunVerification))
            .step(Arc::new(IngestIncidentUpdate))
    }
}
