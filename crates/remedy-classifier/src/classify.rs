//! Incident classification
//!
//! `classify` is pure: the same incident and evidence set always produce a
//! byte-identical [`Classification`], regardless of evidence order.

use crate::rules::{rules, Rule};
use remedy_core::{
    canonical_order, Category, Classification, Confidence, ContentHash, Evidence, EvidencePack,
    HashError, Incident,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Version stamped on every classification
pub const CLASSIFIER_VERSION: &str = "1.0.0";

/// Label attached when no rule matched
pub const NEEDS_CLASSIFICATION: &str = "needs-classification";

/// Classify an incident from its evidence
///
/// Never fails; when no rule matches the result is `UNKNOWN` with low
/// confidence.
#[must_use]
pub fn classify(incident: &Incident, evidence: &[Evidence]) -> Classification {
    let ordered = canonical_order(evidence);
    let mut facts = base_facts(incident, &ordered);

    for rule in rules() {
        let mut supporting = ordered.iter().filter(|e| rule.matches(e));
        if let Some(primary) = supporting.next() {
            debug!(
                incident_key = %incident.incident_key,
                rule = rule.id,
                evidence_id = %primary.id,
                "classification rule matched"
            );
            facts.extend(rule.evaluate(primary).unwrap_or_default());
            facts.push(format!("rule={}", rule.id));
            let pointers = std::iter::once(*primary)
                .chain(supporting.copied())
                .map(Evidence::pointer);
            return known(rule, primary, facts, pointers);
        }
    }

    debug!(incident_key = %incident.incident_key, "no classification rule matched");
    Classification {
        classifier_version: CLASSIFIER_VERSION.to_string(),
        category: Category::Unknown,
        confidence: Confidence::Low,
        labels: BTreeSet::from([NEEDS_CLASSIFICATION.to_string()]),
        primary_evidence: None,
        evidence_pack: EvidencePack::new(
            "No classification rule matched",
            facts,
            ordered.iter().map(|e| e.pointer()),
        ),
    }
}

fn known(
    rule: &Rule,
    primary: &Evidence,
    facts: Vec<String>,
    pointers: impl Iterator<Item = remedy_core::EvidencePointer>,
) -> Classification {
    Classification {
        classifier_version: CLASSIFIER_VERSION.to_string(),
        category: rule.category,
        confidence: rule.confidence,
        labels: rule.labels.iter().map(|l| (*l).to_string()).collect(),
        primary_evidence: Some(primary.pointer()),
        evidence_pack: EvidencePack::new(rule.summary, facts, pointers),
    }
}

fn base_facts(incident: &Incident, ordered: &[&Evidence]) -> Vec<String> {
    let kinds: BTreeSet<&str> = ordered.iter().map(|e| e.kind().as_str()).collect();
    let kinds: Vec<&str> = kinds.into_iter().collect();
    vec![
        format!("evidence.count={}", ordered.len()),
        format!("evidence.kinds={}", kinds.join(",")),
        format!("incident.severity={}", incident.severity),
    ]
}

/// Content hash of a classification (64 lowercase hex chars when displayed)
///
/// # Errors
/// Returns error if the classification cannot be serialized
#[inline]
pub fn classification_hash(classification: &Classification) -> Result<ContentHash, HashError> {
    classification.content_hash()
}
