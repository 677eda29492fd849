//! Domain partitioning into per-worker fetch ranges
//!
//! Splits a resolved domain span into at most `concurrency` contiguous,
//! pairwise-disjoint sub-ranges whose union is exactly the input span.
//! Sub-range sizes differ by at most one unit, so no worker is starved.

use crate::types::{FetchRange, RangeSpan};

/// Split a resolved domain span into per-worker ranges.
///
/// Offset spans shrink the effective concurrency to the number of pages the
/// domain holds: splitting 100 records across 10 workers at a page size of
/// 50 would leave 8 workers idle, so only `ceil(100 / 50) = 2` ranges are
/// produced. Time spans shrink only when the span holds fewer milliseconds
/// than workers. A zero-width span yields no ranges at all.
pub fn plan_ranges(span: RangeSpan, concurrency: usize, page_size: usize) -> Vec<FetchRange> {
    match span {
        RangeSpan::Offset { start, end } => {
            let count = end.saturating_sub(start);
            if count == 0 {
                return Vec::new();
            }
            let pages = count.div_ceil(page_size.max(1) as u64);
            let workers = pages.min(concurrency as u64).max(1) as usize;
            split_interval(count, workers)
                .into_iter()
                .enumerate()
                .map(|(index, (lo, hi))| FetchRange {
                    index,
                    span: RangeSpan::Offset {
                        start: start + lo,
                        end: start + hi,
                    },
                })
                .collect()
        }
        RangeSpan::Time { start_ms, end_ms } => {
            let span_ms = end_ms.saturating_sub(start_ms).max(0) as u64;
            if span_ms == 0 {
                return Vec::new();
            }
            let workers = span_ms.min(concurrency as u64).max(1) as usize;
            split_interval(span_ms, workers)
                .into_iter()
                .enumerate()
                .map(|(index, (lo, hi))| FetchRange {
                    index,
                    span: RangeSpan::Time {
                        start_ms: start_ms + lo as i64,
                        end_ms: start_ms + hi as i64,
                    },
                })
                .collect()
        }
    }
}

/// Split `[0, count)` into `workers` contiguous near-equal intervals.
///
/// The first `count % workers` intervals receive one extra unit, so sizes
/// differ by at most one.
fn split_interval(count: u64, workers: usize) -> Vec<(u64, u64)> {
    let workers = workers as u64;
    let base = count / workers;
    let remainder = count % workers;
    let mut ranges = Vec::with_capacity(workers as usize);
    let mut cursor = 0u64;
    for i in 0..workers {
        let size = base + u64::from(i < remainder);
        if size == 0 {
            break;
        }
        ranges.push((cursor, cursor + size));
        cursor += size;
    }
    ranges
}
