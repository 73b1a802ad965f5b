use proptest::prelude::*;
use remedy_retry::{
    backoff_with_rng, calculate_backoff_delay, execute_with_retry, should_retry, ErrorType,
    NoopObserver, ProviderError, RateLimitInfo, RecordingObserver, RetryConfig, RetryPolicy,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

proptest! {
    #[test]
    fn prop_backoff_within_jitter_band_and_cap(
        attempt in 0..12u32,
        base in 1..5_000u64,
        jitter in 0.0..=1.0f64,
        seed in any::<u64>()
    ) {
        use rand::SeedableRng;
        let config = RetryConfig::default()
            .with_base_delay_ms(base)
            .with_max_delay_ms(40_000)
            .with_jitter(jitter);
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let delay = backoff_with_rng(attempt, &config, &mut rng);
        let nominal = remedy_retry::exponential_delay(attempt, &config) as f64;

        prop_assert!(delay <= 40_000);
        prop_assert!(delay as f64 >= (nominal * (1.0 - jitter)).floor());
        prop_assert!(delay as f64 <= (nominal * (1.0 + jitter)).ceil());
    }

    #[test]
    fn prop_client_errors_never_retry(status in 400..500u16, attempt in 0..10u32) {
        prop_assume!(status != 429);
        let err = ProviderError::http(status, "bad request");
        let decision = should_retry(&err, attempt, &RetryConfig::default());
        prop_assert!(!decision.should_retry);
        prop_assert_eq!(decision.error_type, ErrorType::ClientError);
    }
}

#[test]
fn test_zero_jitter_schedule() {
    let config = RetryConfig::deterministic();
    let schedule: Vec<u64> = (0..7).map(|a| calculate_backoff_delay(a, &config)).collect();
    assert_eq!(schedule, vec![1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 32_000]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_retry_then_succeed() {
    let calls = AtomicU32::new(0);
    let observer = RecordingObserver::new();
    let config = RetryConfig::deterministic();

    let result = execute_with_retry(&config, &observer, || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                Err(ProviderError::http(502, "bad gateway"))
            } else {
                Ok(n)
            }
        }
    })
    .await;

    assert_eq!(result, Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let events = observer.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, 1);
    assert_eq!(events[0].1.delay_ms, 1_000);
    assert_eq!(events[1].0, 2);
    assert_eq!(events[1].1.delay_ms, 2_000);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_original_error() {
    let calls = AtomicU32::new(0);
    let config = RetryConfig::deterministic().with_max_retries(2);
    let start = tokio::time::Instant::now();

    let result: Result<(), ProviderError> = execute_with_retry(&config, &NoopObserver, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(ProviderError::new("read ECONNRESET")) }
    })
    .await;

    assert_eq!(result.unwrap_err().message, "read ECONNRESET");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= Duration::from_millis(3_000));
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_fails_immediately() {
    let calls = AtomicU32::new(0);
    let observer = RecordingObserver::new();

    let result: Result<(), ProviderError> =
        execute_with_retry(&RetryConfig::default(), &observer, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::http(404, "Not Found")) }
        })
        .await;

    assert_eq!(result.unwrap_err().status, Some(404));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(observer.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_policy_honors_retry_after() {
    let observer = Arc::new(RecordingObserver::new());
    let policy = RetryPolicy::new(RetryConfig::deterministic()).with_observer(observer.clone());
    let calls = AtomicU32::new(0);

    let result = policy
        .execute(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ProviderError::http(429, "Too Many Requests")
                        .with_rate_limit(RateLimitInfo::default().with_retry_after(7)))
                } else {
                    Ok("dispatched")
                }
            }
        })
        .await;

    assert_eq!(result, Ok("dispatched"));
    let events = observer.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.error_type, ErrorType::RateLimitPrimary);
    assert_eq!(events[0].1.delay_ms, 7_000);
}
