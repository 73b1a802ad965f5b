//! Evidence model
//!
//! Evidence is an immutable, kind-tagged fact attached to one incident.
//! The `ref` payload is a sum type keyed by [`EvidenceKind`]: every variant
//! has its own struct, so a consumer that needs a sub-field matches on the
//! variant and checks the field instead of probing an untyped map.
//!
//! Fields that upstream collectors routinely omit are `Option`; a step that
//! needs one of them reports `INVALID_EVIDENCE` when it is absent.

use crate::hash::{sha256_hex, HashError};
use crate::incident::{EvidenceId, IncidentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Evidence kind discriminator
///
/// Variants are declared in lexicographic order of their wire names so the
/// derived `Ord` matches string ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Alb,
    DeployStatus,
    Ecs,
    GithubRun,
    LogPointer,
    Runner,
    Verification,
}

impl EvidenceKind {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alb => "alb",
            Self::DeployStatus => "deploy_status",
            Self::Ecs => "ecs",
            Self::GithubRun => "github_run",
            Self::LogPointer => "log_pointer",
            Self::Runner => "runner",
            Self::Verification => "verification",
        }
    }
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported by a deploy verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Success,
    Failed,
    Timeout,
}

impl VerificationStatus {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-deploy verification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRef {
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook_run_id: Option<String>,
}

/// Stopped ECS task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcsRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Load balancer target health snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_group_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_health: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// CI runner job/step outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Hosted workflow run reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubRunRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Deploy status observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployStatusRef {
    pub env: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_id: Option<String>,
}

/// Pointer into an external log store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPointerRef {
    pub source: String,
    pub locator: String,
}

/// Kind-specific evidence payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceRef {
    Alb(AlbRef),
    DeployStatus(DeployStatusRef),
    Ecs(EcsRef),
    GithubRun(GithubRunRef),
    LogPointer(LogPointerRef),
    Runner(RunnerRef),
    Verification(VerificationRef),
}

impl EvidenceRef {
    /// Discriminator of this payload
    #[must_use]
    pub const fn kind(&self) -> EvidenceKind {
        match self {
            Self::Alb(_) => EvidenceKind::Alb,
            Self::DeployStatus(_) => EvidenceKind::DeployStatus,
            Self::Ecs(_) => EvidenceKind::Ecs,
            Self::GithubRun(_) => EvidenceKind::GithubRun,
            Self::LogPointer(_) => EvidenceKind::LogPointer,
            Self::Runner(_) => EvidenceKind::Runner,
            Self::Verification(_) => EvidenceKind::Verification,
        }
    }
}

/// Immutable fact attached to an incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: EvidenceId,
    pub incident_id: IncidentId,
    #[serde(rename = "ref")]
    pub payload: EvidenceRef,
    /// SHA-256 (hex) of the canonical payload
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

impl Evidence {
    /// Create evidence, hashing its payload
    ///
    /// # Errors
    /// Returns error if the payload cannot be canonicalized
    pub fn new(
        incident_id: IncidentId,
        payload: EvidenceRef,
        created_at: DateTime<Utc>,
    ) -> Result<Self, HashError> {
        let sha256 = sha256_hex(&payload)?;
        Ok(Self {
            id: EvidenceId::new(),
            incident_id,
            payload,
            sha256,
            created_at,
        })
    }

    /// With explicit identifier
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: EvidenceId) -> Self {
        self.id = id;
        self
    }

    /// Kind of this evidence
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EvidenceKind {
        self.payload.kind()
    }

    /// Stable reference to this evidence
    #[inline]
    #[must_use]
    pub fn pointer(&self) -> EvidencePointer {
        EvidencePointer {
            kind: self.kind(),
            sha256: self.sha256.clone(),
            id: self.id,
        }
    }

    /// Recompute the payload hash and compare with the stored one
    #[must_use]
    pub fn verify(&self) -> bool {
        sha256_hex(&self.payload).is_ok_and(|h| h == self.sha256)
    }
}

/// Reference to one evidence entry
///
/// Field order defines the ordering: kind, then content hash, then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePointer {
    pub kind: EvidenceKind,
    pub sha256: String,
    pub id: EvidenceId,
}

/// Evidence in canonical order (kind, sha256, id), independent of input order
#[must_use]
pub fn canonical_order(evidence: &[Evidence]) -> Vec<&Evidence> {
    let mut sorted: Vec<&Evidence> = evidence.iter().collect();
    sorted.sort_by(|a, b| {
        a.kind()
            .cmp(&b.kind())
            .then_with(|| a.sha256.cmp(&b.sha256))
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted
}

/// All evidence of one kind, in canonical order
#[must_use]
pub fn of_kind(evidence: &[Evidence], kind: EvidenceKind) -> Vec<&Evidence> {
    canonical_order(evidence)
        .into_iter()
        .filter(|e| e.kind() == kind)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ecs(reason: &str, exit_code: Option<i32>) -> EvidenceRef {
        EvidenceRef::Ecs(EcsRef {
            stopped_reason: Some(reason.to_string()),
            exit_code,
            ..EcsRef::default()
        })
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn kind_order_matches_wire_name_order() {
        let kinds = [
            EvidenceKind::Alb,
            EvidenceKind::DeployStatus,
            EvidenceKind::Ecs,
            EvidenceKind::GithubRun,
            EvidenceKind::LogPointer,
            EvidenceKind::Runner,
            EvidenceKind::Verification,
        ];
        let mut by_name = kinds;
        by_name.sort_by_key(|k| k.as_str());
        assert_eq!(kinds, by_name);
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let json = serde_json::to_value(ecs("Essential container in task exited", Some(1))).unwrap();
        assert_eq!(json["kind"], "ecs");
        assert_eq!(json["exitCode"], 1);
        assert!(json.get("cluster").is_none());
    }

    #[test]
    fn github_ref_field_is_named_ref() {
        let payload = EvidenceRef::GithubRun(GithubRunRef {
            git_ref: Some("main".into()),
            ..GithubRunRef::default()
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["ref"], "main");
    }

    #[test]
    fn evidence_hash_depends_only_on_payload() {
        let incident = IncidentId::from_u128(1);
        let a = Evidence::new(incident, ecs("x", Some(1)), at()).unwrap();
        let b = Evidence::new(incident, ecs("x", Some(1)), at()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.sha256.len(), 64);
        assert!(a.verify());
    }

    #[test]
    fn evidence_round_trips_through_json() {
        let evidence = Evidence::new(IncidentId::from_u128(7), ecs("y", None), at()).unwrap();
        let json = serde_json::to_string(&evidence).unwrap();
        let decoded: Evidence = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, evidence);
        assert!(decoded.verify());
    }

    #[test]
    fn canonical_order_is_input_order_independent() {
        let incident = IncidentId::from_u128(1);
        let e1 = Evidence::new(incident, ecs("a", Some(1)), at())
            .unwrap()
            .with_id(EvidenceId::from_u128(1));
        let e2 = Evidence::new(
            incident,
            EvidenceRef::Alb(AlbRef {
                target_health: Some("unhealthy".into()),
                ..AlbRef::default()
            }),
            at(),
        )
        .unwrap()
        .with_id(EvidenceId::from_u128(2));

        let forward = vec![e1.clone(), e2.clone()];
        let backward = vec![e2, e1];
        let f: Vec<_> = canonical_order(&forward).iter().map(|e| e.id).collect();
        let b: Vec<_> = canonical_order(&backward).iter().map(|e| e.id).collect();
        assert_eq!(f, b);
        assert_eq!(f[0], EvidenceId::from_u128(2));
    }
}
