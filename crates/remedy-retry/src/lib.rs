//! Remedy Retry - bounded, rate-limit-aware retries
//!
//! Used by every playbook step that calls an external provider:
//! - Classifies failures into retry classes
//! - Exponential backoff with uniform jitter, capped
//! - Honors provider rate-limit metadata over the backoff schedule
//! - Async execution wrapper with an explicit observer
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_retry::{execute_with_retry, NoopObserver, RetryConfig};
//!
//! let run = execute_with_retry(&RetryConfig::default(), &NoopObserver, || {
//!     provider.dispatch(&request)
//! })
//! .await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backoff;
pub mod decision;
pub mod error_type;
pub mod executor;
pub mod rate_limit;

pub use backoff::{
    backoff_with_rng, calculate_backoff_delay, exponential_delay, RetryConfig, RetryConfigError,
};
pub use decision::{decide, should_retry, RetryDecision};
pub use error_type::{classify, classify_error, ErrorType, ProviderError, ProviderFailure};
pub use executor::{
    execute_with_retry, NoopObserver, RecordingObserver, RetryObserver, RetryPolicy,
};
pub use rate_limit::{rate_limit_delay, RateLimitInfo, RESET_BUFFER_MS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
