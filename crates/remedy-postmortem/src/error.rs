//! Postmortem generation errors

use remedy_core::{HashError, StoreError};

/// Failure to build or persist a postmortem
#[derive(Debug, thiserror::Error)]
pub enum PostmortemError {
    /// Evidence or run belongs to another incident
    #[error("{kind} {id} does not belong to incident {incident_id}")]
    ForeignRecord {
        kind: &'static str,
        id: String,
        incident_id: String,
    },

    /// Canonical hashing failed
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// Document could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persistence failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl PostmortemError {
    /// Check if generation may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}
