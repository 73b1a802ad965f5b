//! Engine configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! lawbook_version = "2024-05"
//!
//! [retry]
//! max_retries = 3
//! base_delay_ms = 1000
//!
//! [allowlist]
//! repos = ["acme/api", "acme-infra/*"]
//!
//! [log]
//! format = "json"
//! ```

use crate::error::{AllowlistError, ConfigError};
use crate::provider::RepoAllowlist;
use async_trait::async_trait;
use regex::RegexSet;
use remedy_core::LogConfig;
use remedy_retry::{RetryConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Policy version stamped on runs and outcomes
    pub lawbook_version: String,
    pub retry: RetryConfig,
    pub allowlist: AllowlistConfig,
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lawbook_version: "v1".to_string(),
            retry: RetryConfig::default(),
            allowlist: AllowlistConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or fails validation
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or its content is invalid
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Check every section
    ///
    /// # Errors
    /// Returns the first invalid value found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lawbook_version.trim().is_empty() {
            return Err(ConfigError::Missing("lawbook_version"));
        }
        self.retry.validate()?;
        self.allowlist.compile()?;
        Ok(())
    }

    /// With lawbook version
    #[inline]
    #[must_use]
    pub fn with_lawbook_version(mut self, version: impl Into<String>) -> Self {
        self.lawbook_version = version.into();
        self
    }

    /// With retry settings
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// With an allowlisted repository entry
    #[inline]
    #[must_use]
    pub fn with_allowed_repo(mut self, entry: impl Into<String>) -> Self {
        self.allowlist.repos.push(entry.into());
        self
    }

    /// With log settings
    #[inline]
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Retry policy built from the retry section
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.clone())
    }

    /// Allowlist built from the allowlist section
    ///
    /// # Errors
    /// Returns error if an entry is malformed
    pub fn allowlist(&self) -> Result<StaticAllowlist, ConfigError> {
        self.allowlist.compile()
    }
}

/// Repositories permitted for dispatch
///
/// Entries are `owner/repo` or `owner/*`. An empty list allows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowlistConfig {
    pub repos: Vec<String>,
}

impl AllowlistConfig {
    /// Validate entries and build the matcher
    ///
    /// # Errors
    /// Returns error on the first malformed entry
    pub fn compile(&self) -> Result<StaticAllowlist, ConfigError> {
        let patterns = self
            .repos
            .iter()
            .map(|entry| entry_pattern(entry))
            .collect::<Result<Vec<_>, _>>()?;
        let set = RegexSet::new(&patterns).map_err(|e| ConfigError::InvalidAllowlistEntry {
            entry: self.repos.join(","),
            reason: e.to_string(),
        })?;
        Ok(StaticAllowlist {
            entries: self.repos.clone(),
            set,
        })
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn entry_pattern(entry: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidAllowlistEntry {
        entry: entry.to_string(),
        reason: reason.to_string(),
    };
    let Some((owner, repo)) = entry.trim().split_once('/') else {
        return Err(invalid("expected owner/repo"));
    };
    if !valid_name(owner) {
        return Err(invalid("owner must be a literal name"));
    }
    let repo_pattern = match repo {
        "*" => "[^/]+".to_string(),
        name if valid_name(name) => regex::escape(name),
        _ => return Err(invalid("repo must be a literal name or *")),
    };
    // Repository names are case-insensitive
    Ok(format!("(?i)^{}/{repo_pattern}$", regex::escape(owner)))
}

/// Config-backed [`RepoAllowlist`]
#[derive(Debug, Clone)]
pub struct StaticAllowlist {
    entries: Vec<String>,
    set: RegexSet,
}

impl StaticAllowlist {
    /// Build from `owner/repo` or `owner/*` entries
    ///
    /// # Errors
    /// Returns error if an entry is malformed
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowlistConfig {
            repos: entries.into_iter().map(Into::into).collect(),
        }
        .compile()
    }

    /// Configured entries
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Synchronous check
    #[must_use]
    pub fn permits(&self, owner: &str, repo: &str) -> bool {
        self.set.is_match(&format!("{owner}/{repo}"))
    }
}

#[async_trait]
impl RepoAllowlist for StaticAllowlist {
    async fn is_allowed(&self, owner: &str, repo: &str) -> Result<bool, AllowlistError> {
        Ok(self.permits(owner, repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_core::LogFormat;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.allowlist.repos.is_empty());
    }

    #[test]
    fn parses_all_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            lawbook_version = "2024-05"

            [retry]
            max_retries = 5
            base_delay_ms = 500

            [allowlist]
            repos = ["acme/api", "acme-infra/*"]

            [log]
            format = "json"
            filter = "remedy_playbook=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.lawbook_version, "2024-05");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.retry.max_delay_ms, 32_000);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.allowlist.repos.len(), 2);
    }

    #[test]
    fn rejects_bad_jitter() {
        let err = EngineConfig::from_toml_str("[retry]\njitter_factor = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Retry(_)));
    }

    #[test]
    fn rejects_empty_lawbook_version() {
        let err = EngineConfig::from_toml_str("lawbook_version = \" \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("lawbook_version")));
    }

    #[test]
    fn rejects_malformed_entries() {
        for entry in ["acme", "*/api", "acme/a b", "acme/", "acme/api/extra"] {
            let err = StaticAllowlist::from_entries([entry]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidAllowlistEntry { .. }),
                "{entry} should be rejected"
            );
        }
    }

    #[test]
    fn exact_and_wildcard_matching() {
        let allowlist = StaticAllowlist::from_entries(["acme/api", "infra/*"]).unwrap();
        assert!(allowlist.permits("acme", "api"));
        assert!(allowlist.permits("ACME", "Api"));
        assert!(!allowlist.permits("acme", "api-v2"));
        assert!(!allowlist.permits("acme", "web"));
        assert!(allowlist.permits("infra", "terraform"));
        assert!(!allowlist.permits("infra-eu", "terraform"));
    }

    #[test]
    fn empty_allowlist_denies_everything() {
        let allowlist = EngineConfig::new().allowlist().unwrap();
        assert!(!allowlist.permits("acme", "api"));
    }

    #[test]
    fn builders_compose() {
        let config = EngineConfig::new()
            .with_lawbook_version("v2")
            .with_retry(RetryConfig::deterministic())
            .with_allowed_repo("acme/api")
            .with_log(LogConfig::default().with_format(LogFormat::Json));
        assert!(config.validate().is_ok());
        assert!(config.retry_policy().config().jitter_factor.abs() < f64::EPSILON);
        assert!(config.allowlist().unwrap().permits("acme", "api"));
    }
}
