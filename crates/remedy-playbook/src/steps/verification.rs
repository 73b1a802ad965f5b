//! Deployment verification steps

use super::{
    evidence_missing, invalid_evidence, non_empty, INGEST_INCIDENT_UPDATE, MISSING,
    RUN_VERIFICATION,
};
use crate::context::{StepContext, StepResources};
use crate::redaction::redact_output;
use crate::step::PlaybookStep;
use async_trait::async_trait;
use chrono::Utc;
use remedy_core::{
    Evidence, EvidenceKind, EvidenceRef, IncidentStatus, StepError, StepErrorCode, StepResult,
    VerificationRef, VerificationStatus,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

/// Deployment a verification run targets
#[derive(Debug, Clone, PartialEq, Eq)]
struct VerificationTarget {
    env: String,
    deploy_id: Option<String>,
    /// sha256 of the evidence entry the target was read from
    evidence_sha: String,
}

impl VerificationTarget {
    fn disambiguator(&self) -> String {
        format!(
            "{}@{}:{}",
            self.env,
            self.deploy_id.as_deref().unwrap_or(MISSING),
            self.evidence_sha
        )
    }
}

/// Most recent verification evidence with an env, preferring entries that
/// have not passed
///
/// A passing entry is what a previous run appended; a newer failed deploy
/// must win over it.
fn verification_target(context: &StepContext) -> Result<VerificationTarget, StepResult> {
    let kind = EvidenceKind::Verification;
    let mut candidates: Vec<(&Evidence, &VerificationRef)> = context
        .evidence_of(kind)
        .into_iter()
        .filter_map(|e| match &e.payload {
            EvidenceRef::Verification(v) => Some((e, v)),
            _ => None,
        })
        .collect();
    if candidates.is_empty() {
        return Err(evidence_missing(kind.as_str()));
    }
    candidates.retain(|(_, v)| non_empty(v.env.as_deref()).is_some());
    candidates.sort_by(|(a, _), (b, _)| {
        a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
    });

    let pending = candidates
        .iter()
        .rev()
        .find(|(_, v)| v.status != VerificationStatus::Success);
    let (evidence, v) = pending
        .or_else(|| candidates.last())
        .ok_or_else(|| invalid_evidence(kind.as_str(), &["env"]))?;
    Ok(VerificationTarget {
        env: non_empty(v.env.as_deref()).unwrap_or_default().to_string(),
        deploy_id: non_empty(v.deploy_id.as_deref()).map(str::to_string),
        evidence_sha: evidence.sha256.clone(),
    })
}

/// Run post-deploy verification for the incident's environment
#[derive(Debug, Clone, Copy, Default)]
pub struct RunVerification;

#[async_trait]
impl PlaybookStep for RunVerification {
    fn id(&self) -> &'static str {
        RUN_VERIFICATION
    }

    fn output_fields(&self) -> &'static [&'static str] {
        &["status", "env", "playbookRunId", "reportHash"]
    }

    fn idempotency_key(&self, context: &StepContext) -> String {
        let target = verification_target(context)
            .map_or_else(|_| MISSING.to_string(), |t| t.disambiguator());
        format!("verification-run:{}:{target}", context.incident_key)
    }

    #[instrument(skip_all, fields(incident_key = %context.incident_key))]
    async fn execute(&self, resources: &StepResources, context: &StepContext) -> StepResult {
        let VerificationTarget { env, deploy_id, .. } = match verification_target(context) {
            Ok(target) => target,
            Err(gate) => return gate,
        };

        let key = self.idempotency_key(context);
        let report = match resources
            .verifier
            .verify(&env, deploy_id.as_deref(), &key)
            .await
        {
            Ok(report) => report,
            Err(err) => {
                warn!(env = %env, error = %err, "verification did not run");
                return StepResult::fail(
                    StepError::new(StepErrorCode::VerificationExecutionError, err.to_string())
                        .with_details(json!({ "env": env })),
                );
            }
        };

        let output = json!(report);
        if report.status == VerificationStatus::Success {
            info!(env = %env, report_hash = %report.report_hash, "verification passed");
            return self.succeed(&output);
        }

        warn!(env = %env, status = %report.status, "verification failed");
        // The report stays attached so the failure is inspectable downstream
        let redacted = redact_output(&output, self.output_fields());
        StepResult {
            success: false,
            error: Some(
                StepError::new(
                    StepErrorCode::VerificationFailed,
                    format!("verification in {env} reported {}", report.status),
                )
                .with_details(redacted.clone()),
            ),
            output: Some(redacted),
        }
    }
}

/// Mark the incident mitigated once verification passed
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestIncidentUpdate;

#[async_trait]
impl PlaybookStep for IngestIncidentUpdate {
    fn id(&self) -> &'static str {
        INGEST_INCIDENT_UPDATE
    }

    fn output_fields(&self) -> &'static [&'static str] {
        &["currentStatus", "previousStatus", "reportHash", "evidenceId"]
    }

    fn idempotency_key(&self, context: &StepContext) -> String {
        let hash = context
            .input_field(RUN_VERIFICATION, "reportHash")
            .and_then(Value::as_str)
            .unwrap_or(MISSING);
        format!("incident-update:{}:{hash}", context.incident_key)
    }

    #[instrument(skip_all, fields(incident_key = %context.incident_key))]
    async fn execute(&self, resources: &StepResources, context: &StepContext) -> StepResult {
        let Some(report) = context.input(RUN_VERIFICATION) else {
            return StepResult::failure(
                StepErrorCode::MissingVerificationOutput,
                "no run-verification output in this run",
            );
        };
        let Some(status) = report
            .get("status")
            .cloned()
            .and_then(|s| serde_json::from_value::<VerificationStatus>(s).ok())
        else {
            return StepResult::failure(
                StepErrorCode::MissingVerificationOutput,
                "run-verification output carries no status",
            );
        };
        let report_hash = report.get("reportHash").and_then(Value::as_str);

        if status != VerificationStatus::Success {
            return self.succeed(&json!({
                "currentStatus": "unchanged",
                "reportHash": report_hash,
            }));
        }

        let update_failed = |message: String| {
            StepResult::fail(StepError::new(StepErrorCode::IncidentUpdateFailed, message))
        };

        let incident = match resources.store.get_incident(context.incident_id).await {
            Ok(incident) => incident,
            Err(err) => return update_failed(err.to_string()),
        };
        // Never move a closed incident backwards
        if incident.status == IncidentStatus::Closed {
            info!(incident_id = %context.incident_id, "incident already closed");
            return self.succeed(&json!({
                "currentStatus": "unchanged",
                "previousStatus": incident.status,
                "reportHash": report_hash,
            }));
        }

        let payload = EvidenceRef::Verification(VerificationRef {
            status,
            env: report.get("env").and_then(Value::as_str).map(str::to_string),
            deploy_id: None,
            report_hash: report_hash.map(str::to_string),
            playbook_run_id: report
                .get("playbookRunId")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
        let evidence = match Evidence::new(context.incident_id, payload, Utc::now()) {
            Ok(e) => e,
            Err(err) => return update_failed(err.to_string()),
        };

        // Evidence before status: a failed append leaves the incident untouched
        let evidence = match resources.store.append_evidence(evidence).await {
            Ok(e) => e,
            Err(err) => return update_failed(err.to_string()),
        };
        let updated = match resources
            .store
            .update_incident_status(context.incident_id, IncidentStatus::Mitigated)
            .await
        {
            Ok(updated) => updated,
            Err(err) => return update_failed(err.to_string()),
        };

        info!(
            incident_id = %context.incident_id,
            previous = %incident.status,
            "incident mitigated after verification"
        );
        self.succeed(&json!({
            "currentStatus": updated.status,
            "previousStatus": incident.status,
            "reportHash": report_hash,
            "evidenceId": evidence.id,
        }))
    }
}
