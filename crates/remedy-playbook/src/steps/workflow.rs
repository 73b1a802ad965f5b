//! Workflow re-dispatch steps

use super::{
    evidence_missing, input_u64, invalid_evidence, non_empty, DISPATCH_WORKFLOW,
    INGEST_WORKFLOW_RESULT, MISSING, POLL_WORKFLOW,
};
use crate::context::{StepContext, StepResources};
use crate::provider::{DispatchRequest, GitTarget};
use crate::step::PlaybookStep;
use async_trait::async_trait;
use chrono::Utc;
use remedy_core::{
    Evidence, EvidenceKind, EvidenceRef, GithubRunRef, StepError, StepErrorCode, StepResult,
};
use remedy_retry::{ErrorType, ProviderError};
use serde_json::json;
use tracing::{info, instrument, warn};

/// Repository and workflow a run belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCoordinates {
    pub owner: String,
    pub repo: String,
    pub workflow: String,
    /// Revision, if the evidence recorded one
    pub target: Option<GitTarget>,
}

impl WorkflowCoordinates {
    /// Resolve from workflow-run evidence in canonical order
    ///
    /// The first entry with full coordinates and a revision wins, then the
    /// first with full coordinates. Entries appended by ingestion may lack a
    /// revision and must not shadow the original failure.
    ///
    /// # Errors
    /// Returns the gate failure (`EVIDENCE_MISSING` or `INVALID_EVIDENCE`)
    pub fn from_context(context: &StepContext) -> Result<Self, StepResult> {
        let kind = EvidenceKind::GithubRun;
        let runs: Vec<&GithubRunRef> = context
            .evidence_of(kind)
            .into_iter()
            .filter_map(|e| match &e.payload {
                EvidenceRef::GithubRun(run) => Some(run),
                _ => None,
            })
            .collect();
        let Some(first) = runs.first() else {
            return Err(evidence_missing(kind.as_str()));
        };

        let resolved: Vec<Self> = runs.iter().filter_map(|run| Self::resolve(run)).collect();
        resolved
            .iter()
            .find(|c| c.target.is_some())
            .or_else(|| resolved.first())
            .cloned()
            .ok_or_else(|| {
                let missing: Vec<&str> = [
                    ("owner", &first.owner),
                    ("repo", &first.repo),
                    ("workflow", &first.workflow),
                ]
                .into_iter()
                .filter(|(_, v)| non_empty(v.as_deref()).is_none())
                .map(|(name, _)| name)
                .collect();
                invalid_evidence(kind.as_str(), &missing)
            })
    }

    fn resolve(run: &GithubRunRef) -> Option<Self> {
        let owner = non_empty(run.owner.as_deref())?;
        let repo = non_empty(run.repo.as_deref())?;
        let workflow = non_empty(run.workflow.as_deref())?;

        // Commit sha wins over a ref; never fall back to a default branch
        let target = non_empty(run.head_sha.as_deref())
            .map(|s| GitTarget::Sha(s.to_string()))
            .or_else(|| non_empty(run.git_ref.as_deref()).map(|r| GitTarget::Ref(r.to_string())));

        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            workflow: workflow.to_string(),
            target,
        })
    }

    /// `owner/repo`
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn provider_failure(code: StepErrorCode, err: &ProviderError) -> StepResult {
    let error_type: ErrorType = err.error_type();
    StepResult::fail(StepError::new(code, err.message.clone()).with_details(json!({
        "errorType": error_type,
        "httpStatus": err.status,
    })))
}

/// Trigger the failed workflow again at its recorded revision
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchWorkflow;

#[async_trait]
impl PlaybookStep for DispatchWorkflow {
    fn id(&self) -> &'static str {
        DISPATCH_WORKFLOW
    }

    fn output_fields(&self) -> &'static [&'static str] {
        &["newRunId", "runUrl", "recordId", "isExisting"]
    }

    fn idempotency_key(&self, context: &StepContext) -> String {
        let disambiguator = match WorkflowCoordinates::from_context(context) {
            Ok(c) => format!(
                "{}/{}@{}",
                c.slug(),
                c.workflow,
                c.target.as_ref().map_or(MISSING, GitTarget::as_str)
            ),
            Err(_) => MISSING.to_string(),
        };
        format!("workflow-dispatch:{}:{disambiguator}", context.incident_key)
    }

    #[instrument(skip_all, fields(incident_key = %context.incident_key))]
    async fn execute(&self, resources: &StepResources, context: &StepContext) -> StepResult {
        let coords = match WorkflowCoordinates::from_context(context) {
            Ok(c) => c,
            Err(gate) => return gate,
        };
        let Some(target) = coords.target.clone() else {
            return StepResult::fail(
                StepError::new(
                    StepErrorCode::DeterminismRequired,
                    "workflow evidence carries neither a commit sha nor a ref",
                )
                .with_details(json!({ "repository": coords.slug() })),
            );
        };

        // Fail closed: lookup errors deny
        match resources.allowlist.is_allowed(&coords.owner, &coords.repo).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(repository = %coords.slug(), "repository not in allowlist");
                return StepResult::fail(
                    StepError::new(
                        StepErrorCode::RepoNotAllowed,
                        format!("repository {} is not allowlisted", coords.slug()),
                    )
                    .with_details(json!({ "repository": coords.slug() })),
                );
            }
            Err(err) => {
                warn!(repository = %coords.slug(), error = %err, "allowlist lookup failed");
                return StepResult::fail(
                    StepError::new(StepErrorCode::RepoNotAllowed, err.to_string())
                        .with_details(json!({ "repository": coords.slug(), "lookupFailed": true })),
                );
            }
        }

        let request = DispatchRequest {
            owner: coords.owner.clone(),
            repo: coords.repo.clone(),
            workflow: coords.workflow.clone(),
            target,
            idempotency_key: self.idempotency_key(context),
        };
        let provider = resources.provider.as_ref();
        let request = &request;
        match resources.retry.execute(move || provider.dispatch(request)).await {
            Ok(outcome) => {
                info!(
                    repository = %coords.slug(),
                    new_run_id = outcome.new_run_id,
                    is_existing = outcome.is_existing,
                    "workflow dispatched"
                );
                self.succeed(&json!(outcome))
            }
            Err(err) => provider_failure(StepErrorCode::DispatchFailed, &err),
        }
    }
}

/// Read the dispatched run's status once
#[derive(Debug, Clone, Copy, Default)]
pub struct PollWorkflow;

#[async_trait]
impl PlaybookStep for PollWorkflow {
    fn id(&self) -> &'static str {
        POLL_WORKFLOW
    }

    fn output_fields(&self) -> &'static [&'static str] {
        &["runId", "status", "conclusion", "completed"]
    }

    fn idempotency_key(&self, context: &StepContext) -> String {
        let run_id = input_u64(context.input_field(DISPATCH_WORKFLOW, "newRunId"))
            .map_or_else(|| MISSING.to_string(), |id| id.to_string());
        format!("workflow-poll:{}:{run_id}", context.incident_key)
    }

    // An in-progress snapshot must be read again on the next run
    fn is_reusable(&self, result: &StepResult) -> bool {
        result.success
            && result
                .output
                .as_ref()
                .and_then(|o| o.get("completed"))
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
    }

    #[instrument(skip_all, fields(incident_key = %context.incident_key))]
    async fn execute(&self, resources: &StepResources, context: &StepContext) -> StepResult {
        let Some(run_id) = input_u64(context.input_field(DISPATCH_WORKFLOW, "newRunId")) else {
            return StepResult::failure(
                StepErrorCode::MissingRunId,
                "dispatch output carries no newRunId",
            );
        };
        let coords = match WorkflowCoordinates::from_context(context) {
            Ok(c) => c,
            Err(gate) => return gate,
        };

        let provider = resources.provider.as_ref();
        let (owner, repo) = (coords.owner.as_str(), coords.repo.as_str());
        let polled = resources
            .retry
            .execute(move || provider.run_status(owner, repo, run_id))
            .await;
        match polled {
            Ok(snapshot) => self.succeed(&json!(snapshot)),
            Err(err) => provider_failure(StepErrorCode::PollFailed, &err),
        }
    }
}

/// Collect the completed run and record it as evidence
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestWorkflowResult;

#[async_trait]
impl PlaybookStep for IngestWorkflowResult {
    fn id(&self) -> &'static str {
        INGEST_WORKFLOW_RESULT
    }

    fn output_fields(&self) -> &'static [&'static str] {
        &[
            "runId",
            "conclusion",
            "jobCount",
            "failedJobs",
            "artifactCount",
            "evidenceId",
        ]
    }

    fn idempotency_key(&self, context: &StepContext) -> String {
        let run_id = input_u64(context.input_field(POLL_WORKFLOW, "runId"))
            .map_or_else(|| MISSING.to_string(), |id| id.to_string());
        format!("workflow-ingest:{}:{run_id}", context.incident_key)
    }

    #[instrument(skip_all, fields(incident_key = %context.incident_key))]
    async fn execute(&self, resources: &StepResources, context: &StepContext) -> StepResult {
        let Some(run_id) = input_u64(context.input_field(POLL_WORKFLOW, "runId")) else {
            return StepResult::failure(StepErrorCode::MissingRunId, "poll output carries no runId");
        };
        let completed = context
            .input_field(POLL_WORKFLOW, "completed")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if !completed {
            return StepResult::fail(
                StepError::new(
                    StepErrorCode::RunNotCompleted,
                    format!("workflow run {run_id} has not completed"),
                )
                .with_details(json!({ "runId": run_id })),
            );
        }
        let coords = match WorkflowCoordinates::from_context(context) {
            Ok(c) => c,
            Err(gate) => return gate,
        };

        let provider = resources.provider.as_ref();
        let (owner, repo) = (coords.owner.as_str(), coords.repo.as_str());
        let ingested = match resources
            .retry
            .execute(move || provider.ingest_run(owner, repo, run_id))
            .await
        {
            Ok(run) => run,
            Err(err) => return provider_failure(StepErrorCode::IngestFailed, &err),
        };

        let payload = EvidenceRef::GithubRun(GithubRunRef {
            owner: Some(coords.owner.clone()),
            repo: Some(coords.repo.clone()),
            workflow: Some(coords.workflow.clone()),
            run_id: Some(run_id),
            head_sha: ingested.head_sha.clone(),
            git_ref: None,
            conclusion: ingested.conclusion.clone(),
            step_name: None,
            message: None,
        });
        let evidence = match Evidence::new(context.incident_id, payload, Utc::now()) {
            Ok(e) => e,
            Err(err) => return StepResult::failure(StepErrorCode::IngestFailed, err.to_string()),
        };
        let evidence = match resources.store.append_evidence(evidence).await {
            Ok(e) => e,
            Err(err) => return StepResult::failure(StepErrorCode::IngestFailed, err.to_string()),
        };

        let failed_jobs: Vec<&str> = ingested
            .jobs
            .iter()
            .filter(|j| j.conclusion.as_deref() == Some("failure"))
            .map(|j| j.name.as_str())
            .collect();
        info!(run_id, conclusion = ?ingested.conclusion, "workflow run ingested");
        self.succeed(&json!({
            "runId": run_id,
            "conclusion": ingested.conclusion,
            "jobCount": ingested.jobs.len(),
            "failedJobs": failed_jobs,
            "artifactCount": ingested.artifacts.len(),
            "evidenceId": evidence.id,
        }))
    }
}
