//! Remedy Playbook - evidence-gated, idempotent remediation
//!
//! Turns a classified incident into remediation runs:
//! - Playbook definitions and an explicitly constructed registry
//! - Steps that gate on evidence, determinism and the repo allowlist before
//!   any side effect
//! - Per-step output redaction
//! - A sequential runner backed by a caller-supplied idempotency store
//! - TOML engine configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_playbook::prelude::*;
//!
//! let registry = PlaybookRegistry::with_defaults();
//! let runner = PlaybookRunner::new(resources, store.clone(), "v1");
//! for playbook in eligible_playbooks(&registry, &classification, &evidence) {
//!     let run = runner.run(playbook, incident.id).await?;
//!     println!("{} -> {}", playbook.id, run.status);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod playbook;
pub mod provider;
pub mod redaction;
pub mod registry;
pub mod runner;
pub mod step;
pub mod steps;

pub use config::{AllowlistConfig, EngineConfig, StaticAllowlist};
pub use context::{StepContext, StepResources};
pub use error::{AllowlistError, ConfigError, RunnerError, VerificationError};
pub use playbook::{Playbook, REDISPATCH_WORKFLOW, VERIFY_DEPLOYMENT};
pub use provider::{
    DispatchOutcome, DispatchRequest, GitTarget, IngestedRun, JobSummary, RepoAllowlist,
    RunSnapshot, VerificationReport, VerificationRunner, WorkflowProvider,
};
pub use redaction::{redact_output, sanitize_url};
pub use registry::PlaybookRegistry;
pub use runner::{eligible_playbooks, PlaybookRunner, EVIDENCE_GATE};
pub use step::PlaybookStep;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        eligible_playbooks, EngineConfig, Playbook, PlaybookRegistry, PlaybookRunner,
        PlaybookStep, RepoAllowlist, RunnerError, StepContext, StepResources, VerificationRunner,
        WorkflowProvider,
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
