//! Postmortem document
//!
//! Every field except `generated_at` is derived deterministically from the
//! incident, its evidence, its classification and its remediation runs.

use chrono::{DateTime, Utc};
use remedy_core::{
    sha256_hex, Category, Confidence, EvidenceKind, EvidencePointer, HashError, IncidentId,
    IncidentStatus, RunId, RunStatus, Severity,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document schema version
pub const POSTMORTEM_VERSION: &str = "1.0.0";

/// JSON key excluded from the content hash
const GENERATED_AT_KEY: &str = "generatedAt";

/// Synthesized incident report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Postmortem {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub incident: IncidentSection,
    pub detection: Detection,
    pub impact: Impact,
    pub remediation: Remediation,
    pub verification: VerificationSection,
    pub outcome: OutcomeSection,
    pub learnings: Learnings,
    pub references: References,
}

impl Postmortem {
    /// Canonical JSON value without `generatedAt`
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn stable_value(&self) -> Result<Value, HashError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut value {
            fields.remove(GENERATED_AT_KEY);
        }
        Ok(value)
    }

    /// SHA-256 hex over the canonical document, excluding `generatedAt`
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn content_hash(&self) -> Result<String, HashError> {
        sha256_hex(&self.stable_value()?)
    }
}

/// Incident identity and timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSection {
    pub id: IncidentId,
    pub incident_key: String,
    pub title: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub tags: Vec<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// What was observed and how it was classified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Sorted, deduplicated
    pub signal_kinds: Vec<EvidenceKind>,
    pub evidence_count: usize,
    pub first_evidence_at: Option<DateTime<Utc>>,
    pub category: Option<Category>,
    pub confidence: Option<Confidence>,
    pub labels: Vec<String>,
    pub classifier_version: Option<String>,
    pub summary: Option<String>,
}

/// Blast radius recorded in evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    pub severity: Severity,
    /// Sorted, deduplicated
    pub environments: Vec<String>,
    /// Sorted, deduplicated
    pub services: Vec<String>,
    /// First seen until closed, or until last seen while open
    pub duration_minutes: i64,
}

/// One remediation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptedPlaybook {
    pub run_id: RunId,
    pub playbook_id: String,
    pub version: String,
    pub status: RunStatus,
}

/// Remediation history ordered by run creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remediation {
    pub attempted_playbooks: Vec<AttemptedPlaybook>,
    pub steps_executed: usize,
    pub steps_reused: usize,
}

/// Latest verification report seen in run output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSection {
    pub report_hash: Option<String>,
    pub status: Option<String>,
    pub source_run_id: Option<RunId>,
}

/// Resolution metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSection {
    pub resolved: bool,
    /// Set only when resolved
    pub mttr_minutes: Option<i64>,
    pub auto_fixed: bool,
    pub final_status: IncidentStatus,
}

/// Literal statements and explicit gaps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Learnings {
    pub facts: Vec<String>,
    pub unknowns: Vec<String>,
}

/// Evidence and runs the document was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct References {
    pub primary_evidence: Option<EvidencePointer>,
    /// Sorted by kind, sha256, id
    pub evidence: Vec<EvidencePointer>,
    pub runs: Vec<RunId>,
}
