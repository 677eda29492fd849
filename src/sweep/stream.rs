//! The sweep's output stream

use crate::error::Result;
use crate::types::Record;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Lazy, pull-driven sequence of unique records from one sweep.
///
/// Finite, single-pass, not restartable. Records arrive in whichever order
/// the chunk workers' pages resolved; within one chunk, endpoint order is
/// preserved. Dropping the stream cancels the sweep: workers stop before
/// their next HTTP call and any in-flight retry wait unblocks immediately.
pub struct RecordStream {
    inner: ReceiverStream<Result<Record>>,
    cancel_token: CancellationToken,
}

impl RecordStream {
    pub(crate) fn new(rx: mpsc::Receiver<Result<Record>>, cancel_token: CancellationToken) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            cancel_token,
        }
    }

    /// A stream that is already exhausted (zero-width domains)
    pub(crate) fn empty(cancel_token: CancellationToken) -> Self {
        let (_, rx) = mpsc::channel(1);
        Self::new(rx, cancel_token)
    }

    /// Cancel the sweep without dropping the stream.
    ///
    /// Records already queued may still be yielded; no new pages are fetched.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl Stream for RecordStream {
    type Item = Result<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
