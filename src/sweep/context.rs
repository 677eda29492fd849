//! Shared state for one sweep
//!
//! One [`SweepContext`] exists per engine call; workers and the merge loop
//! hold it behind an `Arc`. Counters are atomics, the first-error slot is a
//! mutex, and everything is discarded when the sweep's output stream ends.

use crate::config::SweepConfig;
use crate::error::Error;
use crate::progress::ProgressSink;
use crate::source::PageSource;
use crate::types::ProgressEvent;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Call-scoped shared state for one sweep
pub(crate) struct SweepContext {
    /// Page source all workers fetch through
    pub(crate) source: Arc<dyn PageSource>,
    /// The sweep's configuration
    pub(crate) config: SweepConfig,
    /// Number of chunks the domain was partitioned into
    pub(crate) total_chunks: usize,
    /// Expected total record count, when knowable up front
    pub(crate) expected_items: Option<u64>,
    /// Records fetched across all chunks, duplicates included
    pub(crate) fetched_items: AtomicU64,
    /// Unique records yielded to the caller (written by the merge loop)
    pub(crate) unique_items: AtomicU64,
    /// Chunks that have exhausted their range
    pub(crate) completed_chunks: AtomicUsize,
    /// First fatal error observed by any worker or the merge loop
    first_error: Mutex<Option<Error>>,
    /// Sweep-wide cancellation: set on fatal error, caller abandonment, or cap
    pub(crate) cancel_token: CancellationToken,
    /// Caller-supplied progress sink
    progress: Option<Arc<dyn ProgressSink>>,
}

impl SweepContext {
    pub(crate) fn new(
        source: Arc<dyn PageSource>,
        config: SweepConfig,
        total_chunks: usize,
        expected_items: Option<u64>,
        cancel_token: CancellationToken,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Self {
        Self {
            source,
            config,
            total_chunks,
            expected_items,
            fetched_items: AtomicU64::new(0),
            unique_items: AtomicU64::new(0),
            completed_chunks: AtomicUsize::new(0),
            first_error: Mutex::new(None),
            cancel_token,
            progress,
        }
    }

    /// Deliver a progress event to the caller's sink, if one is installed
    pub(crate) fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = &self.progress {
            sink.emit(event);
        }
    }

    /// Record a fatal error and cancel the sweep.
    ///
    /// Only the first error is kept; later ones are logged and dropped.
    pub(crate) fn record_fatal(&self, error: Error) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        } else {
            tracing::debug!(error = %error, "dropping fatal error observed after the first");
        }
        drop(slot);
        self.cancel_token.cancel();
    }

    /// Take the first recorded fatal error, leaving the slot empty
    pub(crate) fn take_error(&self) -> Option<Error> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Overall completion percentage.
    ///
    /// Item-based when the expected total is known, chunk-based otherwise.
    pub(crate) fn percent(&self) -> f32 {
        match self.expected_items {
            Some(total) if total > 0 => {
                let fetched = self.fetched_items.load(Ordering::Relaxed);
                ((fetched as f32 / total as f32) * 100.0).min(100.0)
            }
            _ => {
                let completed = self.completed_chunks.load(Ordering::Relaxed);
                (completed as f32 / self.total_chunks.max(1) as f32) * 100.0
            }
        }
    }
}
