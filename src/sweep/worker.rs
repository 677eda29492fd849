//! Chunk worker: drives one fetch range to exhaustion
//!
//! Each worker pages sequentially through its range, pushing every record
//! into the shared ingestion channel. The channel is bounded, so a slow
//! consumer backpressures the fetch. Workers stop early when the sweep is
//! cancelled or the merge loop goes away.

use super::context::SweepContext;
use crate::error::Error;
use crate::retry::with_retry;
use crate::types::{FetchRange, PageRequest, ProgressEvent, RangeSpan, Record};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;

/// Fetch every record in `range`, pushing into the ingestion channel.
///
/// Terminates when the range's target item count is reached or a page comes
/// back empty (the range is exhausted even if the count probe promised more;
/// the backing dataset may have shrunk mid-sweep). A fatal fetch error is
/// recorded in the shared context, which cancels the sibling workers.
pub(crate) async fn run_chunk_worker(
    ctx: Arc<SweepContext>,
    range: FetchRange,
    ingest_tx: mpsc::Sender<Record>,
) {
    ctx.emit(ProgressEvent::ChunkStart {
        chunk: range.index,
        total_chunks: ctx.total_chunks,
    });

    let target = range.span.target_items();
    let page_size = ctx.config.page_size;
    let mut fetched: u64 = 0;
    let mut last_reported: u64 = 0;

    loop {
        if ctx.cancel_token.is_cancelled() {
            return;
        }

        let limit = match target {
            Some(target) => {
                let remaining = target.saturating_sub(fetched);
                if remaining == 0 {
                    break;
                }
                (page_size as u64).min(remaining) as usize
            }
            None => page_size,
        };

        let request = page_request(&ctx, &range.span, fetched, limit);
        let page = match with_retry(&ctx.config.retry, &ctx.cancel_token, || {
            ctx.source.fetch_page(&request)
        })
        .await
        {
            Ok(page) => page,
            Err(Error::Cancelled) => return,
            Err(e) => {
                tracing::error!(chunk = range.index, error = %e, "chunk worker failed");
                ctx.record_fatal(e);
                return;
            }
        };

        let count = page.items.len() as u64;
        if count == 0 {
            break;
        }

        for record in page.items {
            if ingest_tx.send(record).await.is_err() {
                // Merge loop is gone; nothing left to feed
                return;
            }
        }

        fetched += count;
        ctx.fetched_items.fetch_add(count, Ordering::Relaxed);

        if fetched - last_reported >= ctx.config.report_interval {
            last_reported = fetched;
            ctx.emit(ProgressEvent::Fetching {
                chunk: range.index,
                completed_chunks: ctx.completed_chunks.load(Ordering::Relaxed),
                total_chunks: ctx.total_chunks,
                fetched_items: ctx.fetched_items.load(Ordering::Relaxed),
                unique_items: ctx.unique_items.load(Ordering::Relaxed),
                percent: ctx.percent(),
            });
        }
    }

    let completed = ctx.completed_chunks.fetch_add(1, Ordering::Relaxed) + 1;
    tracing::debug!(chunk = range.index, fetched, "chunk exhausted");
    ctx.emit(ProgressEvent::ChunkComplete {
        chunk: range.index,
        completed_chunks: completed,
        total_chunks: ctx.total_chunks,
        percent: ctx.percent(),
    });
}

/// Build the request for the next page of a chunk.
///
/// Offset spans page by absolute record offset; time spans keep their window
/// as filter bounds and page by offset within the filtered result set.
fn page_request(ctx: &SweepContext, span: &RangeSpan, fetched: u64, limit: usize) -> PageRequest {
    let offset = match span {
        RangeSpan::Offset { start, .. } => start + fetched,
        RangeSpan::Time { .. } => fetched,
    };
    PageRequest {
        span: *span,
        offset,
        limit,
        filter: ctx.config.filter.clone(),
        expand: ctx.config.expand.clone(),
    }
}
