//! Built-in playbook steps
//!
//! - `workflow`: dispatch, poll and ingest a CI workflow run
//! - `verification`: run post-deploy verification, then update the incident

mod verification;
mod workflow;

pub use verification::{IngestIncidentUpdate, RunVerification};
pub use workflow::{DispatchWorkflow, IngestWorkflowResult, PollWorkflow, WorkflowCoordinates};

use remedy_core::{StepError, StepErrorCode, StepResult};
use serde_json::{json, Value};

/// Step id of [`DispatchWorkflow`]
pub const DISPATCH_WORKFLOW: &str = "dispatch-workflow";
/// Step id of [`PollWorkflow`]
pub const POLL_WORKFLOW: &str = "poll-workflow";
/// Step id of [`IngestWorkflowResult`]
pub const INGEST_WORKFLOW_RESULT: &str = "ingest-workflow-result";
/// Step id of [`RunVerification`]
pub const RUN_VERIFICATION: &str = "run-verification";
/// Step id of [`IngestIncidentUpdate`]
pub const INGEST_INCIDENT_UPDATE: &str = "ingest-incident-update";

/// Placeholder disambiguator when the key input is absent
const MISSING: &str = "missing";

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn input_u64(value: Option<&Value>) -> Option<u64> {
    value.and_then(Value::as_u64)
}

fn invalid_evidence(kind: &str, missing: &[&str]) -> StepResult {
    StepResult::fail(
        StepError::new(
            StepErrorCode::InvalidEvidence,
            format!("{kind} evidence is missing required fields: {}", missing.join(", ")),
        )
        .with_details(json!({ "kind": kind, "missingFields": missing })),
    )
}

fn evidence_missing(kind: &str) -> StepResult {
    StepResult::fail(
        StepError::new(
            StepErrorCode::EvidenceMissing,
            format!("no {kind} evidence attached to incident"),
        )
        .with_details(json!({ "requiredKind": kind })),
    )
}
