//! Classification model
//!
//! Produced by the classifier, attached to incidents, and read by playbook
//! selection and postmortem generation. Collections are `BTreeSet`/sorted
//! `Vec` so the serialized form is canonical by construction.

use crate::evidence::EvidencePointer;
use crate::hash::{ContentHash, HashError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Incident category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    DeployVerificationFailed,
    AlbTargetUnhealthy,
    EcsTaskCrashloop,
    EcsImagePullFailed,
    IamPolicyValidationFailed,
    RunnerWorkflowFailed,
    Unknown,
}

impl Category {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeployVerificationFailed => "DEPLOY_VERIFICATION_FAILED",
            Self::AlbTargetUnhealthy => "ALB_TARGET_UNHEALTHY",
            Self::EcsTaskCrashloop => "ECS_TASK_CRASHLOOP",
            Self::EcsImagePullFailed => "ECS_IMAGE_PULL_FAILED",
            Self::IamPolicyValidationFailed => "IAM_POLICY_VALIDATION_FAILED",
            Self::RunnerWorkflowFailed => "RUNNER_WORKFLOW_FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence summary backing a classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePack {
    pub summary: String,
    /// Sorted lexicographically
    pub key_facts: Vec<String>,
    /// Sorted by kind, then sha256, then id
    pub pointers: Vec<EvidencePointer>,
}

impl EvidencePack {
    /// Build a pack, normalizing fact and pointer order
    #[must_use]
    pub fn new(
        summary: impl Into<String>,
        key_facts: impl IntoIterator<Item = String>,
        pointers: impl IntoIterator<Item = EvidencePointer>,
    ) -> Self {
        let mut key_facts: Vec<String> = key_facts.into_iter().collect();
        key_facts.sort();
        key_facts.dedup();
        let mut pointers: Vec<EvidencePointer> = pointers.into_iter().collect();
        pointers.sort();
        pointers.dedup();
        Self {
            summary: summary.into(),
            key_facts,
            pointers,
        }
    }
}

/// Deterministic category/confidence/labels for an incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub classifier_version: String,
    pub category: Category,
    pub confidence: Confidence,
    /// Sorted, deduplicated
    pub labels: BTreeSet<String>,
    pub primary_evidence: Option<EvidencePointer>,
    pub evidence_pack: EvidencePack,
}

impl Classification {
    /// Content hash over the canonical serialization
    ///
    /// # Errors
    /// Returns error if serialization fails
    #[inline]
    pub fn content_hash(&self) -> Result<ContentHash, HashError> {
        ContentHash::of_canonical(self)
    }

    /// Labels in sorted order
    #[must_use]
    pub fn label_list(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).collect()
    }

    /// Whether a rule matched
    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.category != Category::Unknown
    }
}
