//! Postmortem and outcome record generation
//!
//! [`build_postmortem`] is pure. [`PostmortemGenerator`] adds hashing and
//! idempotent persistence keyed by `(outcome_key, postmortem_hash)`.

use crate::document::{
    AttemptedPlaybook, Detection, Impact, IncidentSection, OutcomeSection, Postmortem, References,
    Remediation, VerificationSection, POSTMORTEM_VERSION,
};
use crate::error::PostmortemError;
use crate::learnings::{self, LearningInputs};
use chrono::{DateTime, Utc};
use remedy_core::{
    canonical_order, Classification, Evidence, EvidenceId, EvidenceKind, EvidenceRef, Incident,
    IncidentId, IncidentStatus, IncidentStore, OutcomeId, OutcomeRecord, OutcomeStatus,
    RemediationRun, RunId, RunStatus,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// `entity_type` of incident outcomes
pub const ENTITY_INCIDENT: &str = "incident";

/// Outcome key for an incident: `postmortem:<incident_key>`
#[must_use]
pub fn outcome_key(incident_key: &str) -> String {
    format!("postmortem:{incident_key}")
}

/// Result of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub postmortem: Postmortem,
    pub outcome_record: OutcomeRecord,
    /// False when an identical outcome was already stored
    pub is_new: bool,
}

fn ensure_owned(
    incident: &Incident,
    evidence: &[Evidence],
    runs: &[RemediationRun],
) -> Result<(), PostmortemError> {
    let foreign = |kind: &'static str, id: String| PostmortemError::ForeignRecord {
        kind,
        id,
        incident_id: incident.id.to_string(),
    };
    if let Some(e) = evidence.iter().find(|e| e.incident_id != incident.id) {
        return Err(foreign("evidence", e.id.to_string()));
    }
    if let Some(r) = runs.iter().find(|r| r.incident_id != incident.id) {
        return Err(foreign("run", r.id.to_string()));
    }
    Ok(())
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}

fn detection(evidence: &[Evidence], classification: Option<&Classification>) -> Detection {
    let signal_kinds: BTreeSet<EvidenceKind> = evidence.iter().map(Evidence::kind).collect();
    Detection {
        signal_kinds: signal_kinds.into_iter().collect(),
        evidence_count: evidence.len(),
        first_evidence_at: evidence.iter().map(|e| e.created_at).min(),
        category: classification.map(|c| c.category),
        confidence: classification.map(|c| c.confidence),
        labels: classification
            .map(|c| c.label_list().into_iter().map(str::to_string).collect())
            .unwrap_or_default(),
        classifier_version: classification.map(|c| c.classifier_version.clone()),
        summary: classification.map(|c| c.evidence_pack.summary.clone()),
    }
}

fn impact(incident: &Incident, evidence: &[Evidence]) -> Impact {
    let mut environments = BTreeSet::new();
    let mut services = BTreeSet::new();
    for e in evidence {
        match &e.payload {
            EvidenceRef::Verification(v) => environments.extend(v.env.clone()),
            EvidenceRef::DeployStatus(d) => {
                environments.insert(d.env.clone());
            }
            EvidenceRef::Ecs(ecs) => services.extend(ecs.service.clone()),
            EvidenceRef::GithubRun(run) => {
                if let (Some(owner), Some(repo)) = (&run.owner, &run.repo) {
                    services.insert(format!("{owner}/{repo}"));
                }
            }
            EvidenceRef::Alb(_) | EvidenceRef::Runner(_) | EvidenceRef::LogPointer(_) => {}
        }
    }
    let end = incident.closed_at.unwrap_or(incident.last_seen_at);
    Impact {
        severity: incident.severity,
        environments: environments.into_iter().collect(),
        services: services.into_iter().collect(),
        duration_minutes: minutes_between(incident.first_seen_at, end),
    }
}

fn remediation(runs: &[&RemediationRun]) -> Remediation {
    let steps = runs.iter().flat_map(|r| r.steps.iter());
    Remediation {
        attempted_playbooks: runs
            .iter()
            .map(|r| AttemptedPlaybook {
                run_id: r.id,
                playbook_id: r.playbook_id.clone(),
                version: r.playbook_version.clone(),
                status: r.status,
            })
            .collect(),
        steps_executed: steps.clone().filter(|s| !s.reused).count(),
        steps_reused: steps.filter(|s| s.reused).count(),
    }
}

/// Latest step output carrying a `reportHash`, failed verifications included
fn verification(runs: &[&RemediationRun]) -> VerificationSection {
    runs.iter()
        .rev()
        .find_map(|run| {
            run.steps.iter().rev().find_map(|step| {
                let hash = step.result.output.as_ref()?.get("reportHash")?.as_str()?;
                // Status comes from the step that produced this report
                let status = run
                    .steps
                    .iter()
                    .rev()
                    .filter_map(|s| s.result.output.as_ref())
                    .filter(|o| o.get("reportHash").and_then(Value::as_str) == Some(hash))
                    .find_map(|o| o.get("status").and_then(Value::as_str));
                Some(VerificationSection {
                    report_hash: Some(hash.to_string()),
                    status: status.map(str::to_string),
                    source_run_id: Some(run.id),
                })
            })
        })
        .unwrap_or(VerificationSection {
            report_hash: None,
            status: None,
            source_run_id: None,
        })
}

fn outcome(incident: &Incident, runs: &[&RemediationRun]) -> OutcomeSection {
    let resolved = incident.is_resolved();
    let mttr_minutes = resolved.then(|| {
        let closed = incident.closed_at.unwrap_or(incident.updated_at);
        minutes_between(incident.first_seen_at, closed)
    });
    OutcomeSection {
        resolved,
        mttr_minutes,
        auto_fixed: runs.iter().any(|r| r.status == RunStatus::Succeeded),
        final_status: incident.status,
    }
}

/// Assemble the postmortem document
///
/// Input order of `evidence` and `runs` does not affect the result.
#[must_use]
pub fn build_postmortem(
    incident: &Incident,
    evidence: &[Evidence],
    classification: Option<&Classification>,
    runs: &[RemediationRun],
    generated_at: DateTime<Utc>,
) -> Postmortem {
    let mut ordered_runs: Vec<&RemediationRun> = runs.iter().collect();
    ordered_runs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let detection = detection(evidence, classification);
    let remediation = remediation(&ordered_runs);
    let verification = verification(&ordered_runs);
    let outcome = outcome(incident, &ordered_runs);
    let learnings = learnings::derive(LearningInputs {
        incident,
        detection: &detection,
        remediation: &remediation,
        verification: &verification,
        outcome: &outcome,
    });

    Postmortem {
        version: POSTMORTEM_VERSION.to_string(),
        generated_at,
        incident: IncidentSection {
            id: incident.id,
            incident_key: incident.incident_key.clone(),
            title: incident.title.clone(),
            severity: incident.severity,
            status: incident.status,
            tags: incident.tags.iter().cloned().collect(),
            first_seen_at: incident.first_seen_at,
            last_seen_at: incident.last_seen_at,
            closed_at: incident.closed_at,
        },
        impact: impact(incident, evidence),
        detection,
        remediation,
        verification,
        outcome,
        learnings,
        references: References {
            primary_evidence: classification
                .and_then(|c| c.primary_evidence.clone())
                .or_else(|| incident.source_primary.clone()),
            evidence: canonical_order(evidence).into_iter().map(Evidence::pointer).collect(),
            runs: ordered_runs.iter().map(|r| r.id).collect(),
        },
    }
}

fn outcome_status(status: IncidentStatus) -> OutcomeStatus {
    match status {
        IncidentStatus::Closed => OutcomeStatus::Resolved,
        IncidentStatus::Mitigated => OutcomeStatus::Mitigated,
        IncidentStatus::Open | IncidentStatus::Acked => OutcomeStatus::Unresolved,
    }
}

/// `{mttrMinutes, autoFixed, resolved, evidenceCount, remediationAttempts}`
#[must_use]
pub fn metrics_json(postmortem: &Postmortem) -> Value {
    json!({
        "mttrMinutes": postmortem.outcome.mttr_minutes,
        "autoFixed": postmortem.outcome.auto_fixed,
        "resolved": postmortem.outcome.resolved,
        "evidenceCount": postmortem.detection.evidence_count,
        "remediationAttempts": postmortem.remediation.attempted_playbooks.len(),
    })
}

/// `{incidentId, evidenceIds, runIds}` with sorted id lists
#[must_use]
pub fn source_refs(incident_id: IncidentId, evidence: &[Evidence], runs: &[RemediationRun]) -> Value {
    let evidence_ids: BTreeSet<EvidenceId> = evidence.iter().map(|e| e.id).collect();
    let run_ids: BTreeSet<RunId> = runs.iter().map(|r| r.id).collect();
    json!({
        "incidentId": incident_id,
        "evidenceIds": evidence_ids,
        "runIds": run_ids,
    })
}

/// Generates postmortems and persists their outcome records
#[derive(Clone)]
pub struct PostmortemGenerator {
    store: Arc<dyn IncidentStore>,
    lawbook_version: String,
}

impl std::fmt::Debug for PostmortemGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostmortemGenerator")
            .field("lawbook_version", &self.lawbook_version)
            .finish_non_exhaustive()
    }
}

impl PostmortemGenerator {
    /// Create generator
    #[must_use]
    pub fn new(store: Arc<dyn IncidentStore>, lawbook_version: impl Into<String>) -> Self {
        Self {
            store,
            lawbook_version: lawbook_version.into(),
        }
    }

    /// Generate from the incident's stored state
    ///
    /// # Errors
    /// Returns error if the incident cannot be loaded or the outcome cannot
    /// be persisted
    pub async fn generate_for_incident(&self, incident_id: IncidentId) -> Result<Generated, PostmortemError> {
        let incident = self.store.get_incident(incident_id).await?;
        let evidence = self.store.list_evidence(incident_id).await?;
        let runs = self.store.list_runs(incident_id).await?;
        let classification = incident.classification.clone();
        self.generate(&incident, &evidence, classification.as_ref(), &runs)
            .await
    }

    /// Generate now
    ///
    /// # Errors
    /// Returns error if inputs belong to another incident, hashing fails or
    /// the outcome cannot be persisted
    pub async fn generate(
        &self,
        incident: &Incident,
        evidence: &[Evidence],
        classification: Option<&Classification>,
        runs: &[RemediationRun],
    ) -> Result<Generated, PostmortemError> {
        self.generate_at(incident, evidence, classification, runs, Utc::now())
            .await
    }

    /// Generate with an explicit `generated_at`
    ///
    /// A second call with unchanged inputs returns the stored record with
    /// `is_new == false`.
    ///
    /// # Errors
    /// Returns error if inputs belong to another incident, hashing fails or
    /// the outcome cannot be persisted
    #[instrument(skip_all, fields(incident_key = %incident.incident_key))]
    pub async fn generate_at(
        &self,
        incident: &Incident,
        evidence: &[Evidence],
        classification: Option<&Classification>,
        runs: &[RemediationRun],
        generated_at: DateTime<Utc>,
    ) -> Result<Generated, PostmortemError> {
        ensure_owned(incident, evidence, runs)?;

        let postmortem = build_postmortem(incident, evidence, classification, runs, generated_at);
        let postmortem_hash = postmortem.content_hash()?;
        let key = outcome_key(&incident.incident_key);

        if let Some(existing) = self.store.find_outcome(&key, &postmortem_hash).await? {
            debug!(outcome_id = %existing.id, "outcome already recorded");
            return Ok(Generated {
                postmortem,
                outcome_record: existing,
                is_new: false,
            });
        }

        let record = OutcomeRecord {
            id: OutcomeId::new(),
            entity_type: ENTITY_INCIDENT.to_string(),
            entity_id: incident.id.to_string(),
            outcome_key: key,
            status: outcome_status(incident.status),
            metrics_json: metrics_json(&postmortem),
            postmortem_json: serde_json::to_value(&postmortem)?,
            postmortem_hash,
            lawbook_version: self.lawbook_version.clone(),
            source_refs: source_refs(incident.id, evidence, runs),
            created_at: generated_at,
        };
        // A concurrent insert of the same pair returns the earlier row
        let (outcome_record, is_new) = self.store.insert_outcome(record).await?;
        info!(
            outcome_id = %outcome_record.id,
            status = %outcome_record.status,
            is_new,
            "outcome recorded"
        );
        Ok(Generated {
            postmortem,
            outcome_record,
            is_new,
        })
    }
}
