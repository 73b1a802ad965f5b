//! Remedy Core - incident model and persistence interfaces
//!
//! Shared by every remedy crate:
//! - Incidents, evidence (tagged by kind) and evidence pointers
//! - Classifications and their evidence packs
//! - Step results, remediation runs, outcome records
//! - Canonical JSON and SHA-256 content hashing
//! - Async store interfaces plus a `DashMap`-backed in-memory store
//! - Tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_core::prelude::*;
//!
//! let incident = Incident::new("deploy:prod", Severity::Red, "prod down", Utc::now());
//! let evidence = Evidence::new(incident.id, payload, Utc::now())?;
//! assert!(evidence.verify());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod classification;
pub mod evidence;
pub mod hash;
pub mod incident;
pub mod memory;
pub mod outcome;
pub mod run;
pub mod step;
pub mod store;
pub mod telemetry;

pub use classification::{Category, Classification, Confidence, EvidencePack};
pub use evidence::{
    canonical_order, of_kind, AlbRef, DeployStatusRef, EcsRef, Evidence, EvidenceKind,
    EvidencePointer, EvidenceRef, GithubRunRef, LogPointerRef, RunnerRef, VerificationRef,
    VerificationStatus,
};
pub use hash::{canonical_json, sha256_hex, ContentHash, HashError};
pub use incident::{
    EvidenceId, Incident, IncidentId, IncidentStatus, OutcomeId, RunId, Severity,
};
pub use memory::InMemoryStore;
pub use outcome::{OutcomeRecord, OutcomeStatus};
pub use run::{RemediationRun, RunStatus, StepRecord};
pub use step::{StepError, StepErrorCode, StepResult};
pub use store::{IdempotencyStore, IncidentStore, StoreError};
pub use telemetry::{init_tracing, LogConfig, LogFormat, TelemetryError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with remedy types
    pub use crate::{
        Category, Classification, Confidence, Evidence, EvidenceKind, EvidencePointer,
        EvidenceRef, IdempotencyStore, InMemoryStore, Incident, IncidentId, IncidentStatus,
        IncidentStore, RemediationRun, RunStatus, Severity, StepError, StepErrorCode,
        StepResult,
    };
    pub use chrono::{DateTime, Utc};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
