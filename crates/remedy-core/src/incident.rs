//! Incident model
//!
//! An [`Incident`] is owned by the persistence collaborator. The engine only
//! reads it and requests status transitions through
//! [`IncidentStore`](crate::store::IncidentStore).

use crate::classification::Classification;
use crate::evidence::EvidencePointer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Build a fixed identifier (fixtures, replays)
            #[inline]
            #[must_use]
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique incident identifier
    IncidentId
);
uuid_id!(
    /// Unique evidence identifier
    EvidenceId
);
uuid_id!(
    /// Unique remediation run identifier
    RunId
);
uuid_id!(
    /// Unique outcome record identifier
    OutcomeId
);

/// Incident severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Red,
    Yellow,
    Green,
}

impl Severity {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Yellow => "YELLOW",
            Self::Green => "GREEN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Open,
    Acked,
    Mitigated,
    Closed,
}

impl IncidentStatus {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Acked => "ACKED",
            Self::Mitigated => "MITIGATED",
            Self::Closed => "CLOSED",
        }
    }

    /// Closed incidents are terminal and count as resolved
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked operational problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: IncidentId,
    /// Stable deduplication key
    pub incident_key: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub title: String,
    pub classification: Option<Classification>,
    pub source_primary: Option<EvidencePointer>,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Create an open incident first seen at `at`
    #[must_use]
    pub fn new(
        incident_key: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IncidentId::new(),
            incident_key: incident_key.into(),
            severity,
            status: IncidentStatus::Open,
            title: title.into(),
            classification: None,
            source_primary: None,
            tags: BTreeSet::new(),
            created_at: at,
            updated_at: at,
            first_seen_at: at,
            last_seen_at: at,
            closed_at: None,
        }
    }

    /// With explicit identifier
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: IncidentId) -> Self {
        self.id = id;
        self
    }

    /// With tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// With classification attached
    #[inline]
    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    /// Mark closed at the given time
    #[must_use]
    pub fn closed(mut self, at: DateTime<Utc>) -> Self {
        self.status = IncidentStatus::Closed;
        self.closed_at = Some(at);
        self.updated_at = at;
        self
    }

    /// Apply a status transition, stamping `updated_at` (and `closed_at` on close)
    pub fn transition(&mut self, status: IncidentStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
        if status.is_terminal() && self.closed_at.is_none() {
            self.closed_at = Some(at);
        }
    }

    /// Whether the incident reached a terminal state
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }
}
