//! Core sweep engine split into focused submodules.
//!
//! The [`ListingSweeper`] struct and the machinery behind it are organized
//! by concern:
//! - [`context`] - call-scoped shared state (counters, error slot, token)
//! - [`worker`] - chunk workers driving one range each
//! - [`merge`] - the dedup/merge loop feeding the output stream
//! - [`stream`] - the caller-facing record stream

mod context;
mod merge;
mod stream;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use stream::RecordStream;

use crate::client::HttpListingSource;
use crate::config::{EndpointConfig, SweepConfig};
use crate::error::Result;
use crate::partition::plan_ranges;
use crate::progress::ProgressSink;
use crate::source::{PageSource, count_probe};
use crate::types::{FetchDomain, ProgressEvent, RangeSpan};
use context::SweepContext;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Concurrent exhaustive fetcher for one paginated listing endpoint.
///
/// A sweeper partitions the configured domain across chunk workers, fetches
/// every page with retry and rate-limit handling, and merges the results
/// into a single deduplicated [`RecordStream`]. One sweeper can run multiple
/// sweeps; each call to [`sweep`](Self::sweep) is independent and shares no
/// state with previous calls.
///
/// # Example
///
/// ```no_run
/// use futures::StreamExt;
/// use pagesweep::{EndpointConfig, ListingSweeper, SweepConfig};
/// use url::Url;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let endpoint = EndpointConfig::new(
///         Url::parse("https://example.okta.com")?,
///         "/api/v1/flags",
///         std::env::var("API_TOKEN")?,
///     );
///     let sweeper = ListingSweeper::over_http(SweepConfig::default(), endpoint)?;
///
///     let mut records = sweeper.sweep().await?;
///     while let Some(record) = records.next().await {
///         println!("{}", serde_json::to_string(record?.fields())?);
///     }
///     Ok(())
/// }
/// ```
pub struct ListingSweeper {
    source: Arc<dyn PageSource>,
    config: SweepConfig,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl ListingSweeper {
    /// Create a sweeper over an arbitrary page source.
    ///
    /// # Errors
    /// Returns a configuration error if the sweep config is invalid.
    pub fn new(config: SweepConfig, source: Arc<dyn PageSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            progress: None,
        })
    }

    /// Create a sweeper over an HTTP listing endpoint.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the HTTP client cannot
    /// be constructed.
    pub fn over_http(config: SweepConfig, endpoint: EndpointConfig) -> Result<Self> {
        let source = HttpListingSource::new(endpoint)?;
        Self::new(config, Arc::new(source))
    }

    /// Install a progress sink receiving [`ProgressEvent`]s for every sweep
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// Run one sweep, returning the deduplicated record stream.
    ///
    /// Resolves the domain (issuing a count probe when the offset domain has
    /// no explicit end), partitions it, launches one worker per range, and
    /// returns immediately; records arrive on the stream as workers fetch
    /// them. Dropping the stream cancels all outstanding work.
    ///
    /// # Errors
    /// Returns an error if the count probe fails; errors after launch are
    /// delivered through the stream itself.
    pub async fn sweep(&self) -> Result<RecordStream> {
        let span = self.resolve_domain().await?;
        let ranges = plan_ranges(span, self.config.concurrency, self.config.page_size);
        let cancel_token = CancellationToken::new();

        let expected_items = match span {
            RangeSpan::Offset { start, end } => Some(end.saturating_sub(start)),
            RangeSpan::Time { .. } => self.config.max_items,
        };

        let ctx = Arc::new(SweepContext::new(
            Arc::clone(&self.source),
            self.config.clone(),
            ranges.len(),
            expected_items,
            cancel_token.clone(),
            self.progress.clone(),
        ));

        tracing::info!(
            chunks = ranges.len(),
            expected_items = ?expected_items,
            "starting sweep"
        );
        ctx.emit(ProgressEvent::Start {
            total_chunks: ranges.len(),
            expected_items,
        });

        if ranges.is_empty() {
            ctx.emit(ProgressEvent::Complete {
                unique_items: 0,
                duplicates_removed: 0,
            });
            return Ok(RecordStream::empty(cancel_token));
        }

        let (ingest_tx, ingest_rx) = mpsc::channel(self.config.channel_capacity);
        let (out_tx, out_rx) = mpsc::channel(self.config.channel_capacity);

        let mut workers = Vec::with_capacity(ranges.len());
        for range in ranges {
            workers.push(tokio::spawn(worker::run_chunk_worker(
                Arc::clone(&ctx),
                range,
                ingest_tx.clone(),
            )));
        }
        drop(ingest_tx);

        tokio::spawn(merge::run_merge_loop(ctx, ingest_rx, out_tx, workers));

        Ok(RecordStream::new(out_rx, cancel_token))
    }

    /// Resolve the configured domain into a concrete span.
    ///
    /// Offset domains without an explicit end probe the endpoint for its
    /// total count; the max-items cap then clamps the end so only the capped
    /// prefix is partitioned and fetched.
    async fn resolve_domain(&self) -> Result<RangeSpan> {
        match self.config.domain {
            FetchDomain::Offset { start, end } => {
                let end = match end {
                    Some(end) => end,
                    None => {
                        let total =
                            count_probe(self.source.as_ref(), start, self.config.filter.clone())
                                .await?;
                        tracing::debug!(total, "count probe resolved domain end");
                        total.max(start)
                    }
                };
                let end = match self.config.max_items {
                    Some(max) => end.min(start.saturating_add(max)),
                    None => end,
                };
                Ok(RangeSpan::Offset { start, end })
            }
            FetchDomain::Time { start_ms, end_ms } => Ok(RangeSpan::Time { start_ms, end_ms }),
        }
    }
}
