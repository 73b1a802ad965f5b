//! Provider failure classification
//!
//! Failures are sorted into retry classes by HTTP status, message phrasing
//! and rate-limit metadata. Rules are evaluated in a fixed order:
//! 1. secondary rate limit phrasing
//! 2. primary rate limit (429, "rate limit", exhausted quota)
//! 3. 5xx or server-error phrasing
//! 4. network phrasing
//! 5. other 4xx
//! 6. unknown

use crate::rate_limit::RateLimitInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Retry class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    RateLimitPrimary,
    RateLimitSecondary,
    ServerError,
    NetworkError,
    ClientError,
    Unknown,
}

impl ErrorType {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimitPrimary => "RATE_LIMIT_PRIMARY",
            Self::RateLimitSecondary => "RATE_LIMIT_SECONDARY",
            Self::ServerError => "SERVER_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ClientError => "CLIENT_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Transient classes worth retrying
    #[inline]
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimitPrimary | Self::RateLimitSecondary | Self::ServerError | Self::NetworkError
        )
    }

    /// Either rate-limit class
    #[inline]
    #[must_use]
    pub const fn is_rate_limit(self) -> bool {
        matches!(self, Self::RateLimitPrimary | Self::RateLimitSecondary)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure returned by an external provider call
pub trait ProviderFailure: std::error::Error {
    /// HTTP status, if the failure came from a response
    fn http_status(&self) -> Option<u16> {
        None
    }

    /// Rate-limit metadata, if the provider sent any
    fn rate_limit(&self) -> Option<&RateLimitInfo> {
        None
    }
}

/// Concrete provider failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
    pub rate_limit: Option<RateLimitInfo>,
}

impl ProviderError {
    /// Failure without a status (transport level)
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            rate_limit: None,
        }
    }

    /// Failure from an HTTP response
    #[inline]
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(message).with_status(status)
    }

    /// With HTTP status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// With rate-limit metadata
    #[inline]
    #[must_use]
    pub fn with_rate_limit(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit = Some(info);
        self
    }

    /// Retry class of this failure
    #[inline]
    #[must_use]
    pub fn error_type(&self) -> ErrorType {
        classify_error(self)
    }
}

impl ProviderFailure for ProviderError {
    fn http_status(&self) -> Option<u16> {
        self.status
    }

    fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }
}

const SECONDARY_PATTERNS: &[&str] = &["secondary rate limit", "abuse detection"];

const PRIMARY_PATTERNS: &[&str] = &["rate limit", "too many requests"];

const SERVER_PATTERNS: &[&str] = &[
    "internal server error",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
];

const NETWORK_PATTERNS: &[&str] = &[
    "econnreset",
    "connection reset",
    "econnrefused",
    "connection refused",
    "etimedout",
    "timed out",
    "timeout",
    "fetch failed",
    "socket hang up",
    "enotfound",
    "getaddrinfo",
    "dns lookup",
    "dns resolution",
    "network error",
];

fn matches_any(message: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| message.contains(p))
}

/// Classify a provider failure
#[must_use]
pub fn classify_error<E>(err: &E) -> ErrorType
where
    E: ProviderFailure + ?Sized,
{
    classify(err.http_status(), &err.to_string(), err.rate_limit())
}

/// Classify from raw parts; `classify(None, "", None)` is the no-error case
#[must_use]
pub fn classify(status: Option<u16>, message: &str, rate_limit: Option<&RateLimitInfo>) -> ErrorType {
    let message = message.to_lowercase();

    if matches_any(&message, SECONDARY_PATTERNS) {
        return ErrorType::RateLimitSecondary;
    }
    if status == Some(429)
        || matches_any(&message, PRIMARY_PATTERNS)
        || rate_limit.is_some_and(RateLimitInfo::is_exhausted)
    {
        return ErrorType::RateLimitPrimary;
    }
    if status.is_some_and(|s| (500..600).contains(&s)) || matches_any(&message, SERVER_PATTERNS) {
        return ErrorType::ServerError;
    }
    if matches_any(&message, NETWORK_PATTERNS) {
        return ErrorType::NetworkError;
    }
    if status.is_some_and(|s| (400..500).contains(&s)) {
        return ErrorType::ClientError;
    }
    ErrorType::Unknown
}
