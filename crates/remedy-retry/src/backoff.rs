//! Retry configuration and exponential backoff

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry policy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Uniform perturbation as a fraction of the delay, in `[0, 1]`
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 32_000,
            jitter_factor: 0.25,
        }
    }
}

/// Invalid retry configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetryConfigError {
    #[error("jitter factor must be within [0, 1], got {0}")]
    JitterOutOfRange(f64),

    #[error("base delay {base}ms exceeds max delay {max}ms")]
    BaseExceedsMax { base: u64, max: u64 },
}

impl RetryConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Config without jitter, fully deterministic delays
    #[inline]
    #[must_use]
    pub fn deterministic() -> Self {
        Self::default().with_jitter(0.0)
    }

    /// With max retries
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// With base delay
    #[inline]
    #[must_use]
    pub fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    /// With delay cap
    #[inline]
    #[must_use]
    pub fn with_max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// With jitter factor
    #[inline]
    #[must_use]
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Validate parameter ranges
    ///
    /// # Errors
    /// Returns error if the jitter factor is outside `[0, 1]` or the base
    /// delay exceeds the cap
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(RetryConfigError::JitterOutOfRange(self.jitter_factor));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(RetryConfigError::BaseExceedsMax {
                base: self.base_delay_ms,
                max: self.max_delay_ms,
            });
        }
        Ok(())
    }

    /// Upper bound on total time spent waiting
    #[inline]
    #[must_use]
    pub fn worst_case_wait_ms(&self) -> u64 {
        u64::from(self.max_retries).saturating_mul(self.max_delay_ms)
    }
}

/// `base * 2^attempt`, capped at max, before jitter
#[must_use]
pub fn exponential_delay(attempt: u32, config: &RetryConfig) -> u64 {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    config
        .base_delay_ms
        .saturating_mul(factor)
        .min(config.max_delay_ms)
}

/// Backoff delay for a retry attempt using the thread-local RNG
#[must_use]
pub fn calculate_backoff_delay(attempt: u32, config: &RetryConfig) -> u64 {
    backoff_with_rng(attempt, config, &mut rand::rng())
}

/// Backoff delay with an explicit RNG
///
/// With `jitter_factor == 0` the RNG is never consulted.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn backoff_with_rng<R: Rng>(attempt: u32, config: &RetryConfig, rng: &mut R) -> u64 {
    let capped = exponential_delay(attempt, config);
    if config.jitter_factor <= 0.0 || capped == 0 {
        return capped;
    }
    let spread = capped as f64 * config.jitter_factor;
    let offset = rng.random_range(-spread..=spread);
    let jittered = (capped as f64 + offset).max(0.0).round() as u64;
    jittered.min(config.max_delay_ms)
}
