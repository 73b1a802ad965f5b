//! Persistence collaborator interfaces
//!
//! The engine depends only on these operations, never on storage internals:
//! - [`IncidentStore`]: incidents, evidence, remediation runs, outcomes
//! - [`IdempotencyStore`]: step results keyed by idempotency key
//!
//! [`InMemoryStore`](crate::memory::InMemoryStore) implements both.

use crate::evidence::Evidence;
use crate::incident::{Incident, IncidentId, IncidentStatus, RunId};
use crate::outcome::OutcomeRecord;
use crate::run::RemediationRun;
use crate::step::StepResult;
use async_trait::async_trait;

/// Persistence errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Incident not found
    #[error("incident not found: {0}")]
    IncidentNotFound(String),

    /// Evidence references an unknown incident
    #[error("evidence rejected: {0}")]
    EvidenceRejected(String),

    /// Attempt to rewrite an immutable record
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend unavailable or write failed
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if error is a missing-record error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IncidentNotFound(_))
    }

    /// Check if the operation may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Incident, evidence, run and outcome persistence
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Read incident by id
    async fn get_incident(&self, id: IncidentId) -> Result<Incident, StoreError>;

    /// Read incident by its stable dedup key
    async fn get_incident_by_key(&self, incident_key: &str) -> Result<Incident, StoreError>;

    /// Transition incident status, returning the updated incident
    async fn update_incident_status(
        &self,
        id: IncidentId,
        status: IncidentStatus,
    ) -> Result<Incident, StoreError>;

    /// Append evidence (never mutates existing entries)
    async fn append_evidence(&self, evidence: Evidence) -> Result<Evidence, StoreError>;

    /// All evidence for an incident
    async fn list_evidence(&self, incident_id: IncidentId) -> Result<Vec<Evidence>, StoreError>;

    /// Insert or update a run; terminal runs are immutable
    async fn upsert_run(&self, run: &RemediationRun) -> Result<(), StoreError>;

    /// Read a run by id
    async fn get_run(&self, id: RunId) -> Result<Option<RemediationRun>, StoreError>;

    /// All runs for an incident
    async fn list_runs(&self, incident_id: IncidentId) -> Result<Vec<RemediationRun>, StoreError>;

    /// Look up an outcome by its dedup pair
    async fn find_outcome(
        &self,
        outcome_key: &str,
        postmortem_hash: &str,
    ) -> Result<Option<OutcomeRecord>, StoreError>;

    /// Insert an outcome unless `(outcome_key, postmortem_hash)` exists.
    ///
    /// Returns the stored record and whether it was newly created.
    async fn insert_outcome(
        &self,
        record: OutcomeRecord,
    ) -> Result<(OutcomeRecord, bool), StoreError>;
}

/// Step results keyed by idempotency key
///
/// Owned by the caller of the executor; deduplicates redundant invocations of
/// the same step for the same context.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Previously recorded result for a key
    async fn get_result(&self, key: &str) -> Result<Option<StepResult>, StoreError>;

    /// Record a result for a key
    async fn put_result(&self, key: &str, result: &StepResult) -> Result<(), StoreError>;
}
