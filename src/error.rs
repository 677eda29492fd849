//! Error types for pagesweep
//!
//! This module provides the error taxonomy for the library:
//! - Transient failures (rate limiting, server overload, network glitches)
//!   that the retry layer absorbs
//! - Fatal failures (unexpected HTTP statuses, malformed response shapes,
//!   bad configuration) that terminate the sweep and surface to the caller

use thiserror::Error;

/// Result type alias for pagesweep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pagesweep
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues. Whether a variant is retried or
/// raised to the caller is decided by [`crate::retry::ClassifyFailure`].
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "page_size")
        key: Option<String>,
    },

    /// Network-level failure (connect, timeout, request transport)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint answered HTTP 429
    ///
    /// Carries the reset time from the rate-limit reset header (epoch seconds)
    /// when the endpoint supplied one.
    #[error("rate limited by endpoint (reset at epoch second {reset_epoch_s:?})")]
    RateLimited {
        /// Epoch second at which the endpoint allows the next request
        reset_epoch_s: Option<i64>,
    },

    /// Non-2xx HTTP status outside the rate-limit case
    ///
    /// 5xx statuses are treated as transient; everything else is fatal.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Response body (truncated) for diagnostics
        body: String,
    },

    /// Response body did not match the expected listing shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The sweep was cancelled before the operation could complete
    #[error("sweep cancelled")]
    Cancelled,

    /// A configured retry ceiling was reached on a transient failure
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total attempts made (initial call plus retries)
        attempts: u32,
        /// The last transient failure observed
        #[source]
        source: Box<Error>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
