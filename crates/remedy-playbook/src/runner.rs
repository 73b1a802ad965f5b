//! Playbook run executor
//!
//! Runs one playbook against one incident:
//! 1. Load the incident and its evidence
//! 2. Apply the playbook's evidence gate (a failed gate records a `SKIPPED` run)
//! 3. Execute steps in order, reusing idempotent results and feeding each
//!    redacted output into later steps' inputs
//! 4. Stop at the first failed step and persist the terminal run

use crate::context::{StepContext, StepResources};
use crate::error::RunnerError;
use crate::playbook::Playbook;
use crate::registry::PlaybookRegistry;
use crate::step::PlaybookStep;
use chrono::Utc;
use remedy_core::{
    Classification, Evidence, IdempotencyStore, IncidentId, RemediationRun, RunStatus, StepError,
    StepErrorCode, StepRecord, StepResult,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Step id recorded on runs skipped by the evidence gate
pub const EVIDENCE_GATE: &str = "evidence-gate";

/// Playbooks whose category matches and whose evidence gate passes
#[must_use]
pub fn eligible_playbooks<'r>(
    registry: &'r PlaybookRegistry,
    classification: &Classification,
    evidence: &[Evidence],
) -> Vec<&'r Playbook> {
    registry
        .for_category(classification.category)
        .into_iter()
        .filter(|p| p.evidence_satisfied(evidence))
        .collect()
}

/// Sequential step executor
#[derive(Clone)]
pub struct PlaybookRunner {
    resources: StepResources,
    idempotency: Arc<dyn IdempotencyStore>,
    lawbook_version: String,
}

impl std::fmt::Debug for PlaybookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybookRunner")
            .field("resources", &self.resources)
            .field("lawbook_version", &self.lawbook_version)
            .finish_non_exhaustive()
    }
}

impl PlaybookRunner {
    /// Create runner
    #[must_use]
    pub fn new(
        resources: StepResources,
        idempotency: Arc<dyn IdempotencyStore>,
        lawbook_version: impl Into<String>,
    ) -> Self {
        Self {
            resources,
            idempotency,
            lawbook_version: lawbook_version.into(),
        }
    }

    /// Shared step resources
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &StepResources {
        &self.resources
    }

    /// Lawbook version stamped on every run
    #[inline]
    #[must_use]
    pub fn lawbook_version(&self) -> &str {
        &self.lawbook_version
    }

    /// Look up a playbook by id and run it
    ///
    /// # Errors
    /// Returns error if the id is unknown or the run cannot be persisted
    pub async fn run_by_id(
        &self,
        registry: &PlaybookRegistry,
        playbook_id: &str,
        incident_id: IncidentId,
    ) -> Result<RemediationRun, RunnerError> {
        let playbook = registry
            .get(playbook_id)
            .ok_or_else(|| RunnerError::UnknownPlaybook(playbook_id.to_string()))?;
        self.run(playbook, incident_id).await
    }

    /// Run `playbook` for the incident and persist the resulting run
    ///
    /// Step failures end the run as `FAILED`; they are not Rust errors.
    ///
    /// # Errors
    /// Returns error if the incident cannot be loaded, the idempotency store
    /// cannot be read, or the run cannot be persisted
    #[instrument(skip_all, fields(playbook_id = %playbook.id, incident_id = %incident_id))]
    pub async fn run(
        &self,
        playbook: &Playbook,
        incident_id: IncidentId,
    ) -> Result<RemediationRun, RunnerError> {
        let store = &self.resources.store;
        let incident = store.get_incident(incident_id).await?;
        let evidence = store.list_evidence(incident_id).await?;

        let mut run = RemediationRun::planned(
            incident_id,
            &playbook.id,
            &playbook.version,
            &self.lawbook_version,
            Utc::now(),
        );

        if !playbook.evidence_satisfied(&evidence) {
            let required: Vec<&str> = playbook.required_evidence.iter().map(|k| k.as_str()).collect();
            warn!(required = ?required, "evidence gate failed, skipping playbook");
            run.steps.push(StepRecord {
                step_id: EVIDENCE_GATE.to_string(),
                idempotency_key: format!("{EVIDENCE_GATE}:{}:{}", incident.incident_key, playbook.id),
                result: StepResult::fail(
                    StepError::new(
                        StepErrorCode::EvidenceMissing,
                        format!("playbook {} requires one of: {}", playbook.id, required.join(", ")),
                    )
                    .with_details(json!({ "requiredKinds": required })),
                ),
                reused: false,
            });
            run.finish(RunStatus::Skipped, Utc::now());
            store.upsert_run(&run).await?;
            return Ok(run);
        }

        run.status = RunStatus::Running;
        store.upsert_run(&run).await?;
        info!(run_id = %run.id, steps = playbook.steps.len(), "playbook run started");

        let mut context = StepContext::new(
            incident_id,
            &incident.incident_key,
            run.id,
            &self.lawbook_version,
            evidence,
        );

        let mut status = RunStatus::Succeeded;
        for step in &playbook.steps {
            let record = self.execute_step(step.as_ref(), &context).await?;
            let success = record.result.success;
            if success {
                let output = record.result.output.clone().unwrap_or(Value::Null);
                context.inputs.insert(record.step_id.clone(), output);
            }
            run.steps.push(record);
            if !success {
                status = RunStatus::Failed;
                break;
            }
        }

        run.finish(status, Utc::now());
        store.upsert_run(&run).await?;
        match status {
            RunStatus::Succeeded => info!(run_id = %run.id, "playbook run succeeded"),
            _ => warn!(
                run_id = %run.id,
                failed_step = run.steps.last().map(|s| s.step_id.as_str()),
                code = ?run.steps.last().and_then(|s| s.result.error_code()),
                "playbook run failed"
            ),
        }
        Ok(run)
    }

    async fn execute_step(
        &self,
        step: &dyn PlaybookStep,
        context: &StepContext,
    ) -> Result<StepRecord, RunnerError> {
        let key = step.idempotency_key(context);

        if let Some(previous) = self.idempotency.get_result(&key).await? {
            if step.is_reusable(&previous) {
                debug!(step_id = step.id(), key = %key, "reusing recorded step result");
                return Ok(StepRecord {
                    step_id: step.id().to_string(),
                    idempotency_key: key,
                    result: step.redact(previous),
                    reused: true,
                });
            }
        }

        let result = step.redact(step.execute(&self.resources, context).await);
        if result.success {
            // Recording is best effort; the side effect already happened
            if let Err(err) = self.idempotency.put_result(&key, &result).await {
                warn!(step_id = step.id(), key = %key, error = %err, "failed to record step result");
            }
        }
        debug!(step_id = step.id(), success = result.success, "step finished");

        Ok(StepRecord {
            step_id: step.id().to_string(),
            idempotency_key: key,
            result,
            reused: false,
        })
    }
}
