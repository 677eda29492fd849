//! # pagesweep
//!
//! Concurrent exhaustive fetcher for paginated, rate-limited listing APIs.
//!
//! ## Design Philosophy
//!
//! pagesweep is designed to be:
//! - **Complete** - Fetches the entire result set of a listing endpoint, not a page of it
//! - **Concurrent** - Partitions the data domain across workers that each own a disjoint slice
//! - **Resilient** - Rides out rate limiting and transient server failures without losing records
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use pagesweep::{EndpointConfig, ListingSweeper, ProgressEvent, SweepConfig};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = EndpointConfig::new(
//!         Url::parse("https://example.okta.com")?,
//!         "/api/v1/flags",
//!         std::env::var("API_TOKEN")?,
//!     );
//!     let config = SweepConfig {
//!         concurrency: 10,
//!         ..Default::default()
//!     };
//!
//!     let sweeper = ListingSweeper::over_http(config, endpoint)?
//!         .with_progress(|event: ProgressEvent| tracing::info!(?event, "progress"));
//!
//!     let mut records = sweeper.sweep().await?;
//!     while let Some(record) = records.next().await {
//!         let record = record?;
//!         println!("{}", serde_json::to_string(record.fields())?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## How a sweep runs
//!
//! The configured domain (a record-offset interval or a time window) is split
//! into at most `concurrency` disjoint ranges. One worker per range pages
//! through its slice, every page wrapped in retry handling: HTTP 429 waits
//! for the endpoint's advertised reset (capped), 5xx and network failures
//! wait a fixed delay, anything else fails the sweep. Records flow through a
//! bounded channel into a merge loop that drops duplicate identifiers and
//! yields the rest to the caller as they arrive; there is no global order,
//! only arrival order. Progress events fire throughout, and a final
//! `Complete` event carries the unique and duplicate totals.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP listing client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Domain partitioning
pub mod partition;
/// Progress reporting sink
pub mod progress;
/// Retry logic for transient listing failures
pub mod retry;
/// Page source abstraction
pub mod source;
/// Core sweep engine (decomposed into focused submodules)
pub mod sweep;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::HttpListingSource;
pub use config::{EndpointConfig, RetryConfig, SweepConfig};
pub use error::{Error, Result};
pub use progress::ProgressSink;
pub use source::{PageSource, count_probe};
pub use sweep::{ListingSweeper, RecordStream};
pub use types::{
    FetchDomain, FetchRange, PageRequest, PageResult, ProgressEvent, RangeSpan, Record,
};
