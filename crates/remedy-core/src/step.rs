//! Step results and the structured step error taxonomy
//!
//! Step failures are data, not Rust errors: they are persisted on the
//! remediation run and mapped to user-facing responses by the API layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Structured failure codes a step can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepErrorCode {
    /// No evidence of a required kind
    EvidenceMissing,
    /// Evidence present but lacks a required sub-field
    InvalidEvidence,
    /// Neither a commit sha nor an explicit ref
    DeterminismRequired,
    /// Repository/target denied by the allowlist
    RepoNotAllowed,
    DispatchFailed,
    PollFailed,
    MissingRunId,
    RunNotCompleted,
    IngestFailed,
    VerificationFailed,
    VerificationExecutionError,
    MissingVerificationOutput,
    IncidentUpdateFailed,
}

impl StepErrorCode {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EvidenceMissing => "EVIDENCE_MISSING",
            Self::InvalidEvidence => "INVALID_EVIDENCE",
            Self::DeterminismRequired => "DETERMINISM_REQUIRED",
            Self::RepoNotAllowed => "REPO_NOT_ALLOWED",
            Self::DispatchFailed => "DISPATCH_FAILED",
            Self::PollFailed => "POLL_FAILED",
            Self::MissingRunId => "MISSING_RUN_ID",
            Self::RunNotCompleted => "RUN_NOT_COMPLETED",
            Self::IngestFailed => "INGEST_FAILED",
            Self::VerificationFailed => "VERIFICATION_FAILED",
            Self::VerificationExecutionError => "VERIFICATION_EXECUTION_ERROR",
            Self::MissingVerificationOutput => "MISSING_VERIFICATION_OUTPUT",
            Self::IncidentUpdateFailed => "INCIDENT_UPDATE_FAILED",
        }
    }

    /// Gate failures happen before any side effect
    #[inline]
    #[must_use]
    pub const fn is_gate(self) -> bool {
        matches!(
            self,
            Self::EvidenceMissing
                | Self::InvalidEvidence
                | Self::DeterminismRequired
                | Self::RepoNotAllowed
                | Self::MissingRunId
                | Self::MissingVerificationOutput
        )
    }
}

impl fmt::Display for StepErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{code, message, details?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    pub code: StepErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl StepError {
    /// Create new step error
    #[inline]
    #[must_use]
    pub fn new(code: StepErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// With structured details
    #[inline]
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result of one step execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

impl StepResult {
    /// Successful result with output
    #[inline]
    #[must_use]
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    /// Failed result
    #[inline]
    #[must_use]
    pub fn fail(error: StepError) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error),
        }
    }

    /// Failed result from code and message
    #[inline]
    #[must_use]
    pub fn failure(code: StepErrorCode, message: impl Into<String>) -> Self {
        Self::fail(StepError::new(code, message))
    }

    /// Error code, if failed
    #[inline]
    #[must_use]
    pub fn error_code(&self) -> Option<StepErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}
