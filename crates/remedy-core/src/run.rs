//! Remediation run records
//!
//! One [`RemediationRun`] per playbook attempt. A run is built up while the
//! runner executes and is immutable once persisted in a terminal status.

use crate::incident::{IncidentId, RunId};
use crate::step::StepResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Planned,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl RunStatus {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    /// No further transitions
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed (or reused) step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step_id: String,
    pub idempotency_key: String,
    pub result: StepResult,
    /// Result came from the idempotency store instead of a fresh execution
    pub reused: bool,
}

/// A single remediation attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationRun {
    pub id: RunId,
    pub incident_id: IncidentId,
    pub playbook_id: String,
    pub playbook_version: String,
    pub status: RunStatus,
    pub lawbook_version: String,
    pub steps: Vec<StepRecord>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RemediationRun {
    /// Create a planned run
    #[must_use]
    pub fn planned(
        incident_id: IncidentId,
        playbook_id: impl Into<String>,
        playbook_version: impl Into<String>,
        lawbook_version: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RunId::new(),
            incident_id,
            playbook_id: playbook_id.into(),
            playbook_version: playbook_version.into(),
            status: RunStatus::Planned,
            lawbook_version: lawbook_version.into(),
            steps: Vec::new(),
            created_at,
            finished_at: None,
        }
    }

    /// With explicit identifier
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: RunId) -> Self {
        self.id = id;
        self
    }

    /// Close the run with a terminal status
    pub fn finish(&mut self, status: RunStatus, at: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(at);
    }

    /// Whether the run reached a successful terminal status
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Last value recorded for `field` in any successful step output
    #[must_use]
    pub fn output_field(&self, field: &str) -> Option<&Value> {
        self.steps
            .iter()
            .rev()
            .filter(|s| s.result.success)
            .find_map(|s| s.result.output.as_ref().and_then(|o| o.get(field)))
    }
}
