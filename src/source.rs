//! Page source abstraction
//!
//! The engine fetches pages through the [`PageSource`] trait rather than a
//! concrete HTTP client, so tests can substitute an in-memory fixture and
//! alternative transports can be plugged in. The production implementation
//! is [`HttpListingSource`](crate::client::HttpListingSource).

use crate::error::{Error, Result};
use crate::types::{PageRequest, PageResult, RangeSpan};

/// Abstraction over one page fetch against a listing endpoint
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a single page.
    ///
    /// Implementations classify failures through [`crate::error::Error`]:
    /// `RateLimited` for HTTP 429, `Http` for other non-2xx statuses,
    /// `Network` for transport-level failures, and `InvalidResponse` for
    /// bodies that do not match the listing shape. They must not retry
    /// internally; the retry layer owns that.
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult>;
}

/// Issue a one-item count probe and return the endpoint's total record count.
///
/// The probe carries the same filter as the sweep so the reported total
/// reflects the filtered result set. An endpoint that omits `totalCount`
/// cannot be offset-partitioned without an explicit domain end, so that case
/// is an error.
pub async fn count_probe(
    source: &dyn PageSource,
    start: u64,
    filter: Option<String>,
) -> Result<u64> {
    let request = PageRequest {
        span: RangeSpan::Offset {
            start,
            end: start.saturating_add(1),
        },
        offset: start,
        limit: 1,
        filter,
        expand: Vec::new(),
    };
    let page = source.fetch_page(&request).await?;
    page.total_count.ok_or_else(|| {
        Error::InvalidResponse(
            "count probe response did not report totalCount; supply an explicit domain end"
                .to_string(),
        )
    })
}
