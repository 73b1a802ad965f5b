//! Retry execution wrapper and observers

use crate::backoff::RetryConfig;
use crate::decision::{should_retry, RetryDecision};
use crate::error_type::ProviderFailure;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Notified before each retry wait
pub trait RetryObserver: Send + Sync {
    /// `attempt` is the 1-based number of the retry about to happen
    fn on_retry(&self, decision: &RetryDecision, attempt: u32);
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {
    fn on_retry(&self, _decision: &RetryDecision, _attempt: u32) {}
}

/// Observer that keeps every notification, for assertions
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(u32, RetryDecision)>>,
}

impl RecordingObserver {
    /// Create empty recorder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(attempt, decision)` pairs in order
    #[must_use]
    pub fn events(&self) -> Vec<(u32, RetryDecision)> {
        self.events.lock().clone()
    }

    /// Number of retries observed
    #[must_use]
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

impl RetryObserver for RecordingObserver {
    fn on_retry(&self, decision: &RetryDecision, attempt: u32) {
        self.events.lock().push((attempt, decision.clone()));
    }
}

/// Run `op`, retrying transient failures per `config`
///
/// The wait suspends only the calling task. On exhaustion or a
/// non-retryable failure the original error is returned unchanged.
///
/// # Errors
/// Returns the last error produced by `op`
pub async fn execute_with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    observer: &dyn RetryObserver,
    mut op: F,
) -> Result<T, E>
where
    E: ProviderFailure,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(retries = attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                let decision = should_retry(&err, attempt, config);
                if !decision.should_retry {
                    warn!(
                        error_type = %decision.error_type,
                        reason = %decision.reason,
                        "giving up on provider call"
                    );
                    return Err(err);
                }
                attempt += 1;
                debug!(
                    attempt,
                    error_type = %decision.error_type,
                    delay_ms = decision.delay_ms,
                    "retrying provider call"
                );
                observer.on_retry(&decision, attempt);
                tokio::time::sleep(Duration::from_millis(decision.delay_ms)).await;
            }
        }
    }
}

/// Retry config bundled with its observer
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    observer: Arc<dyn RetryObserver>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Policy with a no-op observer
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            observer: Arc::new(NoopObserver),
        }
    }

    /// With observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Underlying config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `op` under this policy
    ///
    /// # Errors
    /// Returns the last error produced by `op`
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        E: ProviderFailure,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        execute_with_retry(&self.config, self.observer.as_ref(), op).await
    }
}
