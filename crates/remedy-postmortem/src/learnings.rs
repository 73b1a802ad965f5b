//! Facts and unknowns
//!
//! Facts are literal statements in a fixed order. Each unknown is present
//! exactly when its triggering condition holds.

use crate::document::{Detection, Learnings, OutcomeSection, Remediation, VerificationSection};
use remedy_core::{Category, Incident};

pub const UNKNOWN_NOT_CLASSIFIED: &str = "Root cause: Not classified";
pub const UNKNOWN_NO_RULE_MATCHED: &str = "Root cause: No classification rule matched";
pub const UNKNOWN_NO_REMEDIATION: &str = "No remediation attempted";
pub const UNKNOWN_NO_VERIFICATION: &str = "Verification report not available";

/// Sections the learnings are derived from
#[derive(Debug, Clone, Copy)]
pub struct LearningInputs<'a> {
    pub incident: &'a Incident,
    pub detection: &'a Detection,
    pub remediation: &'a Remediation,
    pub verification: &'a VerificationSection,
    pub outcome: &'a OutcomeSection,
}

/// Build facts then unknowns
#[must_use]
pub fn derive(inputs: LearningInputs<'_>) -> Learnings {
    Learnings {
        facts: facts(inputs),
        unknowns: unknowns(inputs),
    }
}

fn facts(inputs: LearningInputs<'_>) -> Vec<String> {
    let LearningInputs {
        incident,
        detection,
        remediation,
        verification,
        outcome,
    } = inputs;

    let mut facts = vec![
        format!("severity: {}", incident.severity),
        format!("status: {}", incident.status),
        format!("Evidence collected: {} items", detection.evidence_count),
    ];
    facts.extend(
        detection
            .signal_kinds
            .iter()
            .map(|kind| format!("Evidence kind observed: {kind}")),
    );
    if let (Some(category), Some(confidence)) = (detection.category, detection.confidence) {
        facts.push(format!("Classified as {category} ({confidence} confidence)"));
    }
    facts.extend(
        remediation
            .attempted_playbooks
            .iter()
            .map(|p| format!("Playbook {}@{}: {}", p.playbook_id, p.version, p.status)),
    );
    if outcome.auto_fixed {
        facts.push("Remediated automatically".to_string());
    }
    if let Some(minutes) = outcome.mttr_minutes {
        facts.push(format!("Time to resolve: {minutes} minutes"));
    }
    if let Some(hash) = &verification.report_hash {
        facts.push(format!("Verification report: {hash}"));
    }
    facts
}

fn unknowns(inputs: LearningInputs<'_>) -> Vec<String> {
    let mut unknowns = Vec::new();
    match inputs.detection.category {
        None => unknowns.push(UNKNOWN_NOT_CLASSIFIED.to_string()),
        Some(Category::Unknown) => unknowns.push(UNKNOWN_NO_RULE_MATCHED.to_string()),
        Some(_) => {}
    }
    let attempted = !inputs.remediation.attempted_playbooks.is_empty();
    if !attempted {
        unknowns.push(UNKNOWN_NO_REMEDIATION.to_string());
    }
    if !inputs.outcome.resolved {
        unknowns.push(format!("Incident {} not yet resolved", inputs.incident.incident_key));
    }
    if attempted && inputs.verification.report_hash.is_none() {
        unknowns.push(UNKNOWN_NO_VERIFICATION.to_string());
    }
    unknowns
}
