//! Remedy Postmortem - reproducible incident reports
//!
//! Synthesizes a postmortem once an incident settles:
//! - Detection, impact, remediation and verification sections
//! - Ordered literal facts and explicit unknowns
//! - Content hash that ignores the generation timestamp
//! - Outcome records persisted once per `(outcome_key, postmortem_hash)`
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_postmortem::PostmortemGenerator;
//!
//! let generator = PostmortemGenerator::new(store.clone(), "v1");
//! let generated = generator.generate_for_incident(incident.id).await?;
//! if generated.is_new {
//!     println!("recorded {}", generated.outcome_record.postmortem_hash);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod document;
pub mod error;
pub mod generator;
pub mod learnings;

pub use document::{
    AttemptedPlaybook, Detection, Impact, IncidentSection, Learnings, OutcomeSection, Postmortem,
    References, Remediation, VerificationSection, POSTMORTEM_VERSION,
};
pub use error::PostmortemError;
pub use generator::{
    build_postmortem, metrics_json, outcome_key, source_refs, Generated, PostmortemGenerator,
    ENTITY_INCIDENT,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
