//! In-memory store
//!
//! Reference implementation of [`IncidentStore`] and [`IdempotencyStore`]
//! backed by `DashMap`, safe for concurrent runs. Write failures can be
//! injected to exercise persistence error paths.

use crate::evidence::Evidence;
use crate::incident::{Incident, IncidentId, IncidentStatus, RunId};
use crate::outcome::OutcomeRecord;
use crate::run::RemediationRun;
use crate::step::StepResult;
use crate::store::{IdempotencyStore, IncidentStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Concurrent in-memory persistence
#[derive(Debug, Default)]
pub struct InMemoryStore {
    incidents: DashMap<IncidentId, Incident>,
    keys: DashMap<String, IncidentId>,
    evidence: DashMap<IncidentId, Vec<Evidence>>,
    runs: DashMap<RunId, RemediationRun>,
    outcomes: DashMap<(String, String), OutcomeRecord>,
    idempotency: DashMap<String, StepResult>,
    fail_writes: AtomicBool,
    fail_evidence: AtomicBool,
}

impl InMemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an incident
    pub fn insert_incident(&self, incident: Incident) {
        self.keys.insert(incident.incident_key.clone(), incident.id);
        self.incidents.insert(incident.id, incident);
    }

    /// Seed evidence without the incident check
    pub fn seed_evidence(&self, evidence: Evidence) {
        self.evidence
            .entry(evidence.incident_id)
            .or_default()
            .push(evidence);
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make only evidence appends fail, leaving other writes working
    pub fn set_fail_evidence(&self, fail: bool) {
        self.fail_evidence.store(fail, Ordering::SeqCst);
    }

    /// Number of stored outcome rows
    #[inline]
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.outcomes.len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IncidentStore for InMemoryStore {
    async fn get_incident(&self, id: IncidentId) -> Result<Incident, StoreError> {
        self.incidents
            .get(&id)
            .map(|i| i.clone())
            .ok_or_else(|| StoreError::IncidentNotFound(id.to_string()))
    }

    async fn get_incident_by_key(&self, incident_key: &str) -> Result<Incident, StoreError> {
        let id = self
            .keys
            .get(incident_key)
            .map(|id| *id)
            .ok_or_else(|| StoreError::IncidentNotFound(incident_key.to_string()))?;
        self.get_incident(id).await
    }

    async fn update_incident_status(
        &self,
        id: IncidentId,
        status: IncidentStatus,
    ) -> Result<Incident, StoreError> {
        self.check_writable()?;
        let mut incident = self
            .incidents
            .get_mut(&id)
            .ok_or_else(|| StoreError::IncidentNotFound(id.to_string()))?;
        incident.transition(status, Utc::now());
        Ok(incident.clone())
    }

    async fn append_evidence(&self, evidence: Evidence) -> Result<Evidence, StoreError> {
        self.check_writable()?;
        if self.fail_evidence.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("evidence writes disabled".to_string()));
        }
        if !self.incidents.contains_key(&evidence.incident_id) {
            return Err(StoreError::EvidenceRejected(format!(
                "unknown incident {}",
                evidence.incident_id
            )));
        }
        self.evidence
            .entry(evidence.incident_id)
            .or_default()
            .push(evidence.clone());
        Ok(evidence)
    }

    async fn list_evidence(&self, incident_id: IncidentId) -> Result<Vec<Evidence>, StoreError> {
        Ok(self
            .evidence
            .get(&incident_id)
            .map(|e| e.clone())
            .unwrap_or_default())
    }

    async fn upsert_run(&self, run: &RemediationRun) -> Result<(), StoreError> {
        self.check_writable()?;
        match self.runs.entry(run.id) {
            Entry::Occupied(mut existing) => {
                if existing.get().status.is_terminal() {
                    return Err(StoreError::Conflict(format!(
                        "run {} already recorded as {}",
                        run.id,
                        existing.get().status
                    )));
                }
                existing.insert(run.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(run.clone());
            }
        }
        Ok(())
    }

    async fn get_run(&self, id: RunId) -> Result<Option<RemediationRun>, StoreError> {
        Ok(self.runs.get(&id).map(|r| r.clone()))
    }

    async fn list_runs(&self, incident_id: IncidentId) -> Result<Vec<RemediationRun>, StoreError> {
        let mut runs: Vec<RemediationRun> = self
            .runs
            .iter()
            .filter(|r| r.incident_id == incident_id)
            .map(|r| r.clone())
            .collect();
        runs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(runs)
    }

    async fn find_outcome(
        &self,
        outcome_key: &str,
        postmortem_hash: &str,
    ) -> Result<Option<OutcomeRecord>, StoreError> {
        Ok(self
            .outcomes
            .get(&(outcome_key.to_string(), postmortem_hash.to_string()))
            .map(|r| r.clone()))
    }

    async fn insert_outcome(
        &self,
        record: OutcomeRecord,
    ) -> Result<(OutcomeRecord, bool), StoreError> {
        self.check_writable()?;
        let key = (record.outcome_key.clone(), record.postmortem_hash.clone());
        match self.outcomes.entry(key) {
            Entry::Occupied(existing) => Ok((existing.get().clone(), false)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok((record, true))
            }
        }
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryStore {
    async fn get_result(&self, key: &str) -> Result<Option<StepResult>, StoreError> {
        Ok(self.idempotency.get(key).map(|r| r.clone()))
    }

    async fn put_result(&self, key: &str, result: &StepResult) -> Result<(), StoreError> {
        self.check_writable()?;
        self.idempotency.insert(key.to_string(), result.clone());
        Ok(())
    }
}
