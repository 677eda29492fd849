//! Retry logic for transient listing failures
//!
//! This module classifies failures and wraps page fetches in a retry loop:
//! HTTP 429 waits until the endpoint's advertised reset time (capped), 5xx
//! and network-level failures wait a fixed delay, and everything else is
//! fatal and raised immediately. Retries are unbounded by default; a ceiling
//! can be configured per [`RetryConfig`].
//!
//! # Example
//!
//! ```no_run
//! use pagesweep::retry::with_retry;
//! use pagesweep::RetryConfig;
//! use pagesweep::Error;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! let page = with_retry(&config, &cancel, || async {
//!     // Your page fetch here
//!     Ok::<_, Error>("body".to_string())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use chrono::Utc;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a failure should be handled by the retry layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429: wait until the endpoint's reset time (capped), then retry
    RateLimited {
        /// Epoch second at which the endpoint allows the next request
        reset_epoch_s: Option<i64>,
    },
    /// HTTP 5xx or network-level failure: wait a fixed delay, then retry
    Transient,
    /// Raise immediately; retrying cannot help
    Fatal,
}

/// Trait classifying errors into the retry taxonomy
pub trait ClassifyFailure {
    /// How the retry layer should handle this failure
    fn failure_kind(&self) -> FailureKind;
}

impl ClassifyFailure for Error {
    fn failure_kind(&self) -> FailureKind {
        match self {
            Error::RateLimited { reset_epoch_s } => FailureKind::RateLimited {
                reset_epoch_s: *reset_epoch_s,
            },
            // Transient overload; the endpoint asks for nothing specific
            Error::Http { status, .. } if *status >= 500 => FailureKind::Transient,
            // Connect failures, timeouts, resets
            Error::Network(_) => FailureKind::Transient,
            // Everything else: auth failures, 4xx, malformed bodies, bad config
            _ => FailureKind::Fatal,
        }
    }
}

/// Execute an async operation, retrying transient failures per the config.
///
/// The same logical request is re-issued on every attempt. Fatal failures
/// return immediately. All waits race against the cancellation token, so an
/// abandoned sweep unblocks its workers without waiting out a delay.
///
/// # Arguments
///
/// * `config` - Retry configuration (ceiling, delays, jitter)
/// * `cancel` - Sweep-wide cancellation token
/// * `operation` - Async closure performing one attempt
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "listing call succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                let delay = match e.failure_kind() {
                    FailureKind::Fatal => {
                        tracing::error!(error = %e, "listing call failed with non-retryable error");
                        return Err(e);
                    }
                    FailureKind::RateLimited { reset_epoch_s } => {
                        rate_limit_wait(reset_epoch_s, config.rate_limit_wait_cap)
                    }
                    FailureKind::Transient => config.transient_delay,
                };

                attempt += 1;
                if let Some(max) = config.max_attempts
                    && attempt > max
                {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "listing call failed after all retry attempts exhausted"
                    );
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }

                let delay = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient listing failure, retrying"
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                }
            }
        }
    }
}

/// Wait derived from a rate-limit reset header: `min(reset - now, cap)`.
///
/// A reset in the past (or a clock ahead of the endpoint's) waits nothing;
/// a missing header falls back to the cap.
fn rate_limit_wait(reset_epoch_s: Option<i64>, cap: Duration) -> Duration {
    let Some(reset_s) = reset_epoch_s else {
        return cap;
    };
    let now_ms = Utc::now().timestamp_millis();
    let reset_ms = reset_s.saturating_mul(1000);
    let remaining_ms = reset_ms.saturating_sub(now_ms);
    if remaining_ms <= 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(remaining_ms as u64).min(cap)
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
