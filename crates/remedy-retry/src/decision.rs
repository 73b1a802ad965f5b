//! Retry decisions

use crate::backoff::{calculate_backoff_delay, RetryConfig};
use crate::error_type::{classify_error, ErrorType, ProviderFailure};
use crate::rate_limit::{rate_limit_delay, RateLimitInfo};
use serde::{Deserialize, Serialize};

/// Outcome of evaluating one failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryDecision {
    pub should_retry: bool,
    pub error_type: ErrorType,
    pub delay_ms: u64,
    pub reason: String,
}

impl RetryDecision {
    fn stop(error_type: ErrorType, reason: String) -> Self {
        Self {
            should_retry: false,
            error_type,
            delay_ms: 0,
            reason,
        }
    }
}

/// Decide whether to retry after `attempt` prior retries
#[must_use]
pub fn should_retry<E>(err: &E, attempt: u32, config: &RetryConfig) -> RetryDecision
where
    E: ProviderFailure + ?Sized,
{
    decide(
        classify_error(err),
        err.rate_limit(),
        attempt,
        config,
        chrono::Utc::now().timestamp(),
    )
}

/// Pure decision from classified parts
///
/// Rate-limit timing takes priority over the exponential schedule.
#[must_use]
pub fn decide(
    error_type: ErrorType,
    rate_limit: Option<&RateLimitInfo>,
    attempt: u32,
    config: &RetryConfig,
    now_epoch_secs: i64,
) -> RetryDecision {
    if !error_type.is_retryable() {
        return RetryDecision::stop(error_type, format!("Non-retryable error type: {error_type}"));
    }
    if attempt >= config.max_retries {
        return RetryDecision::stop(
            error_type,
            format!("Max retries ({}) exceeded", config.max_retries),
        );
    }

    let rate_limited = if error_type.is_rate_limit() {
        rate_limit.and_then(|info| rate_limit_delay(info, now_epoch_secs, config.max_delay_ms))
    } else {
        None
    };

    match rate_limited {
        Some(delay_ms) => RetryDecision {
            should_retry: true,
            error_type,
            delay_ms,
            reason: format!("Rate limited, waiting {delay_ms}ms per provider metadata"),
        },
        None => {
            let delay_ms = calculate_backoff_delay(attempt, config);
            RetryDecision {
                should_retry: true,
                error_type,
                delay_ms,
                reason: format!(
                    "{error_type}, retry {} of {} after {delay_ms}ms",
                    attempt + 1,
                    config.max_retries
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_type::ProviderError;

    #[test]
    fn client_errors_are_not_retried() {
        let d = should_retry(&ProviderError::http(404, "Not Found"), 0, &RetryConfig::default());
        assert!(!d.should_retry);
        assert_eq!(d.error_type, ErrorType::ClientError);
        assert_eq!(d.delay_ms, 0);
    }

    #[test]
    fn unknown_errors_are_not_retried() {
        let d = should_retry(&ProviderError::new("weird"), 0, &RetryConfig::default());
        assert!(!d.should_retry);
        assert_eq!(d.error_type, ErrorType::Unknown);
    }

    #[test]
    fn stops_at_max_retries() {
        let config = RetryConfig::default();
        let d = should_retry(&ProviderError::http(503, "unavailable"), 3, &config);
        assert!(!d.should_retry);
        assert!(d.reason.starts_with("Max retries"));
    }

    #[test]
    fn server_error_uses_backoff() {
        let config = RetryConfig::deterministic();
        let d = should_retry(&ProviderError::http(500, "boom"), 1, &config);
        assert!(d.should_retry);
        assert_eq!(d.delay_ms, 2_000);
    }

    #[test]
    fn rate_limit_metadata_overrides_backoff() {
        let config = RetryConfig::deterministic();
        let info = RateLimitInfo::default().with_window(0, 1_020);
        let d = decide(ErrorType::RateLimitPrimary, Some(&info), 0, &config, 1_000);
        assert!(d.should_retry);
        assert_eq!(d.delay_ms, 21_000);
    }

    #[test]
    fn rate_limit_without_timing_falls_back_to_backoff() {
        let config = RetryConfig::deterministic();
        let d = decide(ErrorType::RateLimitSecondary, None, 2, &config, 0);
        assert!(d.should_retry);
        assert_eq!(d.delay_ms, 4_000);
    }
}
