//! Merge loop: dedup and forward records as they arrive
//!
//! A single task drains the shared ingestion channel, drops records whose
//! identifier has already been yielded, and forwards the rest to the output
//! channel the caller's [`RecordStream`](super::stream::RecordStream) reads.
//! It is the only writer of the seen-identifier set, so no locking is needed
//! around dedup.

use super::context::SweepContext;
use crate::error::{Error, Result};
use crate::types::{ProgressEvent, Record};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How the merge loop ended
enum Outcome {
    /// All workers exhausted their ranges, or the max-items cap was reached
    Done,
    /// Cancelled mid-flight: fatal error or external cancellation
    Interrupted,
    /// The caller dropped the output stream
    Abandoned,
}

/// Drain the ingestion channel until all workers finish, forwarding unique
/// records and accounting for duplicates.
pub(crate) async fn run_merge_loop(
    ctx: Arc<SweepContext>,
    mut ingest_rx: mpsc::Receiver<Record>,
    out_tx: mpsc::Sender<Result<Record>>,
    workers: Vec<JoinHandle<()>>,
) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates: u64 = 0;

    let outcome = loop {
        tokio::select! {
            biased;
            _ = ctx.cancel_token.cancelled() => {
                break Outcome::Interrupted;
            }
            received = ingest_rx.recv() => {
                match received {
                    Some(record) => {
                        let Some(key) = record.identity(&ctx.config.id_field) else {
                            ctx.record_fatal(Error::InvalidResponse(format!(
                                "record has no usable identifier in field `{}`",
                                ctx.config.id_field
                            )));
                            break Outcome::Interrupted;
                        };
                        if !seen.insert(key) {
                            duplicates += 1;
                            continue;
                        }
                        let unique = ctx.unique_items.fetch_add(1, Ordering::Relaxed) + 1;
                        if out_tx.send(Ok(record)).await.is_err() {
                            tracing::debug!("caller dropped the record stream, cancelling sweep");
                            ctx.cancel_token.cancel();
                            break Outcome::Abandoned;
                        }
                        if let Some(max) = ctx.config.max_items
                            && unique >= max
                        {
                            tracing::debug!(max, "max-items cap reached, cancelling remaining work");
                            ctx.cancel_token.cancel();
                            break Outcome::Done;
                        }
                    }
                    // Every worker finished and dropped its sender
                    None => break Outcome::Done,
                }
            }
        }
    };

    // Close the ingestion channel so workers blocked on a full channel see a
    // send failure instead of waiting forever on a drained-by-nobody queue.
    drop(ingest_rx);

    match outcome {
        Outcome::Done => {
            // A fatal error can still land here if the last worker failed and
            // closed the channel before the cancellation branch was polled.
            if let Some(error) = ctx.take_error() {
                let _ = out_tx.send(Err(error)).await;
            } else {
                let unique = ctx.unique_items.load(Ordering::Relaxed);
                tracing::info!(unique, duplicates, "sweep complete");
                ctx.emit(ProgressEvent::Complete {
                    unique_items: unique,
                    duplicates_removed: duplicates,
                });
            }
        }
        Outcome::Interrupted => {
            if let Some(error) = ctx.take_error() {
                let _ = out_tx.send(Err(error)).await;
            }
        }
        Outcome::Abandoned => {}
    }

    for handle in workers {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "chunk worker panicked");
        }
    }
}
