//! Configuration types for pagesweep

use crate::error::{Error, Result};
use crate::types::FetchDomain;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Sweep behavior configuration (domain, pagination, concurrency, reporting)
///
/// All fields have serde defaults, so partial configurations deserialize
/// cleanly. The domain defaults to "all records from offset 0, total learned
/// via a count probe".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// The slice of the data domain to sweep (default: all records from offset 0)
    #[serde(default)]
    pub domain: FetchDomain,

    /// Endpoint filter expression, passed through verbatim (default: none)
    #[serde(default)]
    pub filter: Option<String>,

    /// Fields the endpoint should expand inline (default: none)
    #[serde(default)]
    pub expand: Vec<String>,

    /// Number of concurrent chunk workers (default: 4)
    ///
    /// The partitioner may shrink the effective concurrency when the domain
    /// holds fewer pages than workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum items requested per page (default: 200)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Cap on the number of unique records yielded (None = unlimited)
    ///
    /// For offset domains the cap clamps the domain before partitioning, so
    /// exactly the first `max_items` records past the starting offset are
    /// fetched. For time domains the cap is enforced as records arrive.
    #[serde(default)]
    pub max_items: Option<u64>,

    /// Emit a `Fetching` progress event every this many records per chunk (default: 50)
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,

    /// Capacity of the ingestion and output channels (default: 256)
    ///
    /// Workers block pushing into a full ingestion channel, so consumer speed
    /// backpressures the fetchers.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Record field holding the unique identifier used for dedup (default: "id")
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Retry behavior for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            domain: FetchDomain::default(),
            filter: None,
            expand: Vec::new(),
            concurrency: default_concurrency(),
            page_size: default_page_size(),
            max_items: None,
            report_interval: default_report_interval(),
            channel_capacity: default_channel_capacity(),
            id_field: default_id_field(),
            retry: RetryConfig::default(),
        }
    }
}

impl SweepConfig {
    /// Validate invariants that serde cannot enforce
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::config(
                "concurrency must be at least 1",
                "concurrency",
            ));
        }
        if self.page_size == 0 {
            return Err(Error::config("page_size must be at least 1", "page_size"));
        }
        if self.report_interval == 0 {
            return Err(Error::config(
                "report_interval must be at least 1",
                "report_interval",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(Error::config(
                "channel_capacity must be at least 1",
                "channel_capacity",
            ));
        }
        if self.id_field.is_empty() {
            return Err(Error::config("id_field must not be empty", "id_field"));
        }
        match self.domain {
            FetchDomain::Offset {
                start,
                end: Some(end),
            } if end < start => Err(Error::config(
                format!("offset domain end {end} precedes start {start}"),
                "domain",
            )),
            FetchDomain::Time { start_ms, end_ms } if end_ms < start_ms => Err(Error::config(
                format!("time domain end {end_ms} precedes start {start_ms}"),
                "domain",
            )),
            _ => Ok(()),
        }
    }
}

/// Listing endpoint connection configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the API host (e.g., `https://example.okta.com`)
    pub base_url: Url,

    /// Path of the listing endpoint relative to the base URL
    /// (e.g., `/api/v1/flags`)
    pub path: String,

    /// Static bearer-style credential sent with every request
    pub token: String,

    /// Authorization scheme prefix (default: "Bearer")
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    /// Response header carrying the rate-limit reset time in epoch seconds
    /// (default: "X-Rate-Limit-Reset")
    #[serde(default = "default_reset_header")]
    pub rate_limit_reset_header: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// User-Agent header value (default: "pagesweep/<version>")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl EndpointConfig {
    /// Endpoint configuration with library defaults for everything but the
    /// address and credential
    pub fn new(base_url: Url, path: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url,
            path: path.into(),
            token: token.into(),
            auth_scheme: default_auth_scheme(),
            rate_limit_reset_header: default_reset_header(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry behavior for transient listing failures
///
/// Transient failures are retried indefinitely by default. Set
/// `max_attempts` to bound the attempts instead; the final failure then
/// surfaces as [`Error::RetriesExhausted`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the initial attempt (None = unbounded)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Delay before retrying after a 5xx or network failure (default: 1000 ms)
    #[serde(default = "default_transient_delay", with = "duration_ms_serde")]
    pub transient_delay: Duration,

    /// Upper bound on the wait derived from a rate-limit reset header
    /// (default: 1000 ms)
    ///
    /// The actual wait is `min(reset_time - now, rate_limit_wait_cap)`.
    #[serde(default = "default_rate_limit_wait_cap", with = "duration_ms_serde")]
    pub rate_limit_wait_cap: Duration,

    /// Add random jitter to transient-failure delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            transient_delay: default_transient_delay(),
            rate_limit_wait_cap: default_rate_limit_wait_cap(),
            jitter: false,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_page_size() -> usize {
    200
}

fn default_report_interval() -> u64 {
    50
}

fn default_channel_capacity() -> usize {
    256
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_auth_scheme() -> String {
    "Bearer".to_string()
}

fn default_reset_header() -> String {
    "X-Rate-Limit-Reset".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("pagesweep/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_transient_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_rate_limit_wait_cap() -> Duration {
    Duration::from_millis(1000)
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
