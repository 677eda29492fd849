//! Progress reporting sink

use crate::types::ProgressEvent;

/// Sink for [`ProgressEvent`]s emitted during a sweep.
///
/// Supplied by the caller; the engine never blocks on it, so implementations
/// should be cheap (push to a channel, update a gauge, log). Any closure
/// `Fn(ProgressEvent) + Send + Sync` implements this trait.
///
/// # Example
///
/// ```
/// use pagesweep::{ProgressEvent, ProgressSink};
///
/// let sink = |event: ProgressEvent| {
///     if let ProgressEvent::Complete { unique_items, .. } = event {
///         println!("fetched {unique_items} records");
///     }
/// };
/// sink.emit(ProgressEvent::Complete {
///     unique_items: 42,
///     duplicates_removed: 0,
/// });
/// ```
pub trait ProgressSink: Send + Sync {
    /// Deliver one progress event
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}
