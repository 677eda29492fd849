//! Core types for pagesweep

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record returned by a listing endpoint.
///
/// Records are opaque to the engine: arbitrary JSON objects whose schema
/// differs per endpoint. The engine only ever interprets the one field
/// designated as the unique identifier, configured on
/// [`SweepConfig`](crate::config::SweepConfig).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap a JSON object as a record
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Look up a field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Borrow the underlying field map
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the record, returning the underlying field map
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// The record's identity under the given identifier field, rendered as a
    /// dedup key.
    ///
    /// String and numeric identifiers are supported; a missing field or a
    /// non-scalar value returns `None` (the engine treats that as a malformed
    /// response).
    pub fn identity(&self, id_field: &str) -> Option<String> {
        match self.0.get(id_field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// The overall slice of the data domain a sweep covers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchDomain {
    /// Contiguous record-offset interval `[start, end)`
    Offset {
        /// First record offset covered by the sweep
        start: u64,
        /// One past the last record offset; `None` means "learn the total
        /// record count via a one-item count probe before partitioning"
        #[serde(skip_serializing_if = "Option::is_none")]
        end: Option<u64>,
    },
    /// Time interval `[start_ms, end_ms)` in epoch milliseconds
    Time {
        /// Inclusive lower bound, epoch milliseconds
        start_ms: i64,
        /// Exclusive upper bound, epoch milliseconds
        end_ms: i64,
    },
}

impl FetchDomain {
    /// Offset interval `[start, end)` with a known end
    pub fn offset(start: u64, end: u64) -> Self {
        FetchDomain::Offset {
            start,
            end: Some(end),
        }
    }

    /// Offset interval starting at `start` whose end is learned from the
    /// endpoint's reported total count
    pub fn offset_from(start: u64) -> Self {
        FetchDomain::Offset { start, end: None }
    }

    /// Time interval `[start, end)` from UTC instants
    pub fn time(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        FetchDomain::Time {
            start_ms: start.timestamp_millis(),
            end_ms: end.timestamp_millis(),
        }
    }
}

impl Default for FetchDomain {
    fn default() -> Self {
        FetchDomain::offset_from(0)
    }
}

/// A contiguous sub-interval of the data domain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSpan {
    /// Record-offset interval `[start, end)`
    Offset {
        /// First record offset of the span
        start: u64,
        /// One past the last record offset of the span
        end: u64,
    },
    /// Time interval `[start_ms, end_ms)` in epoch milliseconds
    Time {
        /// Inclusive lower bound, epoch milliseconds
        start_ms: i64,
        /// Exclusive upper bound, epoch milliseconds
        end_ms: i64,
    },
}

impl RangeSpan {
    /// Number of records the span is expected to hold, when knowable.
    ///
    /// Offset spans have an exact target; time spans hold an unknown number
    /// of records and are driven to exhaustion instead.
    pub fn target_items(&self) -> Option<u64> {
        match self {
            RangeSpan::Offset { start, end } => Some(end.saturating_sub(*start)),
            RangeSpan::Time { .. } => None,
        }
    }
}

/// One partitioner-produced slice of the domain, assigned to one chunk worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchRange {
    /// Zero-based chunk index, stable for the lifetime of the sweep
    pub index: usize,
    /// The sub-interval this chunk covers
    pub span: RangeSpan,
}

/// Parameters for one page fetch against the listing endpoint.
///
/// Constructed once per HTTP call; the retry layer re-issues the same
/// request on transient failures.
#[derive(Clone, Debug)]
pub struct PageRequest {
    /// The chunk's sub-interval (bounds become query parameters)
    pub span: RangeSpan,
    /// Pagination position: the absolute record offset for offset spans, or
    /// the offset within the time-filtered result set for time spans
    pub offset: u64,
    /// Maximum number of items requested for this page
    pub limit: usize,
    /// Endpoint filter expression, passed through verbatim
    pub filter: Option<String>,
    /// Fields the endpoint should expand inline
    pub expand: Vec<String>,
}

/// One page of results from the listing endpoint
#[derive(Clone, Debug, Default)]
pub struct PageResult {
    /// Records in the order the endpoint returned them
    pub items: Vec<Record>,
    /// Opaque next-page link, when the endpoint supplied one
    pub next_cursor: Option<String>,
    /// Total matching record count, when the endpoint reported it
    pub total_count: Option<u64>,
}

/// Event emitted during a sweep's lifecycle
///
/// Delivered through the caller-supplied [`ProgressSink`](crate::progress::ProgressSink);
/// never interleaved with the primary record stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Sweep planned: workers are about to launch
    Start {
        /// Number of chunks the domain was partitioned into
        total_chunks: usize,
        /// Expected total record count, when knowable up front
        #[serde(skip_serializing_if = "Option::is_none")]
        expected_items: Option<u64>,
    },

    /// One chunk worker began fetching its range
    ChunkStart {
        /// Chunk index
        chunk: usize,
        /// Number of chunks in the sweep
        total_chunks: usize,
    },

    /// Periodic progress from a chunk worker
    Fetching {
        /// Chunk index reporting progress
        chunk: usize,
        /// Chunks finished so far
        completed_chunks: usize,
        /// Number of chunks in the sweep
        total_chunks: usize,
        /// Records fetched so far across all chunks (duplicates included)
        fetched_items: u64,
        /// Unique records yielded to the caller so far
        unique_items: u64,
        /// Overall completion percentage (0.0 to 100.0)
        percent: f32,
    },

    /// One chunk worker exhausted its range
    ChunkComplete {
        /// Chunk index that completed
        chunk: usize,
        /// Chunks finished so far, this one included
        completed_chunks: usize,
        /// Number of chunks in the sweep
        total_chunks: usize,
        /// Overall completion percentage (0.0 to 100.0)
        percent: f32,
    },

    /// All chunks exhausted and the output stream has ended
    Complete {
        /// Unique records yielded to the caller
        unique_items: u64,
        /// Records dropped because their identifier had already been yielded
        duplicates_removed: u64,
    },
}
