//! Error types for the playbook engine
//!
//! Step failures are reported as [`StepResult`](remedy_core::StepResult)
//! data. The errors here cover:
//! - Collaborator failures (verification, allowlist lookup)
//! - Runner failures that prevent a run from being recorded
//! - Configuration loading and validation

use remedy_core::StoreError;
use remedy_retry::RetryConfigError;

/// Verification collaborator failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// Verification could not be started or crashed
    #[error("verification execution failed: {0}")]
    Execution(String),

    /// Verification did not finish in time
    #[error("verification timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Allowlist lookup failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("allowlist lookup failed: {0}")]
pub struct AllowlistError(pub String);

/// Failure that aborts a playbook run
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Playbook id not in the registry
    #[error("unknown playbook: {0}")]
    UnknownPlaybook(String),

    /// Persistence failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RunnerError {
    /// Check if the run may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Retry section out of range
    #[error("invalid retry config: {0}")]
    Retry(#[from] RetryConfigError),

    /// Allowlist entry is not `owner/repo` or `owner/*`
    #[error("invalid allowlist entry {entry:?}: {reason}")]
    InvalidAllowlistEntry { entry: String, reason: String },

    /// Required field empty
    #[error("missing config value: {0}")]
    Missing(&'static str),
}
