//! Outcome records
//!
//! Persisted wrapper around a postmortem plus metrics. Uniqueness is on
//! `(outcome_key, postmortem_hash)`: re-submitting the same pair returns the
//! existing row.

use crate::incident::OutcomeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Resolution state captured in the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Resolved,
    Mitigated,
    Unresolved,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolved => "RESOLVED",
            Self::Mitigated => "MITIGATED",
            Self::Unresolved => "UNRESOLVED",
        })
    }
}

/// Persisted outcome row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutcomeRecord {
    pub id: OutcomeId,
    pub entity_type: String,
    pub entity_id: String,
    pub outcome_key: String,
    pub status: OutcomeStatus,
    pub metrics_json: Value,
    pub postmortem_json: Value,
    pub postmortem_hash: String,
    pub lawbook_version: String,
    pub source_refs: Value,
    pub created_at: DateTime<Utc>,
}

impl OutcomeRecord {
    /// Identity used for idempotent persistence
    #[inline]
    #[must_use]
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.outcome_key, &self.postmortem_hash)
    }
}
