//! Step execution context and shared resources

use crate::provider::{RepoAllowlist, VerificationRunner, WorkflowProvider};
use remedy_core::{of_kind, Evidence, EvidenceKind, IncidentId, IncidentStore, RunId};
use remedy_retry::RetryPolicy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Inputs for one step within one run
///
/// `inputs` maps a prior step id to that step's redacted output. It never
/// carries state across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct StepContext {
    pub incident_id: IncidentId,
    pub incident_key: String,
    pub run_id: RunId,
    pub lawbook_version: String,
    pub evidence: Vec<Evidence>,
    pub inputs: BTreeMap<String, Value>,
}

impl StepContext {
    /// Create context with no prior step outputs
    #[must_use]
    pub fn new(
        incident_id: IncidentId,
        incident_key: impl Into<String>,
        run_id: RunId,
        lawbook_version: impl Into<String>,
        evidence: Vec<Evidence>,
    ) -> Self {
        Self {
            incident_id,
            incident_key: incident_key.into(),
            run_id,
            lawbook_version: lawbook_version.into(),
            evidence,
            inputs: BTreeMap::new(),
        }
    }

    /// With output of a prior step
    #[inline]
    #[must_use]
    pub fn with_input(mut self, step_id: impl Into<String>, output: Value) -> Self {
        self.inputs.insert(step_id.into(), output);
        self
    }

    /// Output of a prior step
    #[inline]
    #[must_use]
    pub fn input(&self, step_id: &str) -> Option<&Value> {
        self.inputs.get(step_id)
    }

    /// One field of a prior step's output
    #[must_use]
    pub fn input_field(&self, step_id: &str, field: &str) -> Option<&Value> {
        self.input(step_id).and_then(|o| o.get(field))
    }

    /// Evidence of one kind in canonical order
    #[inline]
    #[must_use]
    pub fn evidence_of(&self, kind: EvidenceKind) -> Vec<&Evidence> {
        of_kind(&self.evidence, kind)
    }
}

/// Collaborators available to every step
#[derive(Clone)]
pub struct StepResources {
    pub store: Arc<dyn IncidentStore>,
    pub provider: Arc<dyn WorkflowProvider>,
    pub verifier: Arc<dyn VerificationRunner>,
    pub allowlist: Arc<dyn RepoAllowlist>,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for StepResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepResources")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl StepResources {
    /// Create resources with the default retry policy
    #[must_use]
    pub fn new(
        store: Arc<dyn IncidentStore>,
        provider: Arc<dyn WorkflowProvider>,
        verifier: Arc<dyn VerificationRunner>,
        allowlist: Arc<dyn RepoAllowlist>,
    ) -> Self {
        Self {
            store,
            provider,
            verifier,
            allowlist,
            retry: RetryPolicy::default(),
        }
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
