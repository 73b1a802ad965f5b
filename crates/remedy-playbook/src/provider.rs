//! External collaborators consumed by steps
//!
//! - [`WorkflowProvider`]: dispatch, poll and ingest CI workflow runs
//! - [`VerificationRunner`]: run post-deploy verification
//! - [`RepoAllowlist`]: authorize repositories before any dispatch

use crate::error::{AllowlistError, VerificationError};
use async_trait::async_trait;
use remedy_core::VerificationStatus;
use remedy_retry::ProviderError;
use serde::{Deserialize, Serialize};

/// Explicit revision to dispatch; there is no default-branch fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GitTarget {
    Sha(String),
    Ref(String),
}

impl GitTarget {
    /// The sha or ref string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sha(s) | Self::Ref(s) => s,
        }
    }
}

/// Workflow dispatch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub owner: String,
    pub repo: String,
    pub workflow: String,
    pub target: GitTarget,
    /// Ties the dispatch to its idempotency key on the provider side
    pub idempotency_key: String,
}

/// Provider response to a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub new_run_id: u64,
    pub run_url: String,
    pub record_id: String,
    /// The provider matched an earlier dispatch for the same key
    pub is_existing: bool,
}

/// Point-in-time status of a workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub run_id: u64,
    pub status: String,
    pub conclusion: Option<String>,
    pub completed: bool,
}

/// One job of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub name: String,
    pub conclusion: Option<String>,
}

/// Jobs and artifacts of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedRun {
    pub run_id: u64,
    pub conclusion: Option<String>,
    pub head_sha: Option<String>,
    pub jobs: Vec<JobSummary>,
    pub artifacts: Vec<String>,
}

/// CI provider
#[async_trait]
pub trait WorkflowProvider: Send + Sync {
    /// Trigger a workflow run at an explicit revision
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchOutcome, ProviderError>;

    /// Single status read of a run
    async fn run_status(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<RunSnapshot, ProviderError>;

    /// Collect jobs and artifacts of a completed run
    async fn ingest_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<IngestedRun, ProviderError>;
}

/// Verification report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub status: VerificationStatus,
    pub env: String,
    pub playbook_run_id: String,
    pub report_hash: String,
}

/// Post-deploy verification collaborator
#[async_trait]
pub trait VerificationRunner: Send + Sync {
    /// Run verification for `env`
    async fn verify(
        &self,
        env: &str,
        deploy_id: Option<&str>,
        idempotency_key: &str,
    ) -> Result<VerificationReport, VerificationError>;
}

/// Repository authorization
#[async_trait]
pub trait RepoAllowlist: Send + Sync {
    /// Whether `owner/repo` may be dispatched
    async fn is_allowed(&self, owner: &str, repo: &str) -> Result<bool, AllowlistError>;
}
