//! Provider rate-limit metadata

use serde::{Deserialize, Serialize};

/// Buffer added after a reset timestamp before retrying
pub const RESET_BUFFER_MS: u64 = 1_000;

/// Rate-limit metadata attached to a provider failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Epoch seconds at which the window resets
    pub reset: Option<i64>,
    /// Explicit wait requested by the provider, in seconds
    pub retry_after: Option<u64>,
}

impl RateLimitInfo {
    /// Parse from response headers (names compared case-insensitively)
    ///
    /// Recognizes `retry-after`, `x-ratelimit-limit`, `x-ratelimit-remaining`
    /// and `x-ratelimit-reset`. Unparseable values are ignored.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut info = Self::default();
        for (name, value) in headers {
            let value = value.as_ref().trim();
            match name.as_ref().to_ascii_lowercase().as_str() {
                "retry-after" => info.retry_after = value.parse().ok(),
                "x-ratelimit-limit" => info.limit = value.parse().ok(),
                "x-ratelimit-remaining" => info.remaining = value.parse().ok(),
                "x-ratelimit-reset" => info.reset = value.parse().ok(),
                _ => {}
            }
        }
        info
    }

    /// With explicit retry-after seconds
    #[inline]
    #[must_use]
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    /// With remaining quota and reset timestamp
    #[inline]
    #[must_use]
    pub fn with_window(mut self, remaining: u32, reset: i64) -> Self {
        self.remaining = Some(remaining);
        self.reset = Some(reset);
        self
    }

    /// Quota exhausted for the current window
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Whether any timing hint is present
    #[inline]
    #[must_use]
    pub fn has_timing(&self) -> bool {
        self.retry_after.is_some() || self.reset.is_some()
    }
}

/// Wait derived from rate-limit metadata
///
/// Explicit retry-after wins; otherwise `max(0, reset - now) + 1s`. Always
/// capped at `max_delay_ms`. `None` when the metadata carries no timing.
#[must_use]
pub fn rate_limit_delay(info: &RateLimitInfo, now_epoch_secs: i64, max_delay_ms: u64) -> Option<u64> {
    let delay = if let Some(secs) = info.retry_after {
        secs.saturating_mul(1_000)
    } else {
        let reset = info.reset?;
        let wait_secs = u64::try_from(reset.saturating_sub(now_epoch_secs)).unwrap_or(0);
        wait_secs.saturating_mul(1_000).saturating_add(RESET_BUFFER_MS)
    };
    Some(delay.min(max_delay_ms))
}
