//! Shared fixtures for sweep engine tests

use crate::error::{Error, Result};
use crate::source::PageSource;
use crate::types::{PageRequest, PageResult, RangeSpan, Record};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// In-memory page source over a static, logically-ordered record set.
///
/// Serves offset pagination directly and time pagination by filtering on the
/// records' `updated` field. Failure scripting covers the retry paths: a
/// given offset can fail with 500 a fixed number of times before succeeding,
/// or return 403 forever.
pub(crate) struct FixtureSource {
    records: Vec<Record>,
    page_calls: AtomicU64,
    transient_failures: Mutex<HashMap<u64, u32>>,
    fatal_offset: Option<u64>,
    response_delay: Option<Duration>,
}

impl FixtureSource {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            page_calls: AtomicU64::new(0),
            transient_failures: Mutex::new(HashMap::new()),
            fatal_offset: None,
            response_delay: None,
        }
    }

    /// Fail requests at `offset` with HTTP 500, `failures` times, then succeed
    pub(crate) fn failing_at(self, offset: u64, failures: u32) -> Self {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(offset, failures);
        self
    }

    /// Requests at `offset` always fail with HTTP 403
    pub(crate) fn fatal_at(mut self, offset: u64) -> Self {
        self.fatal_offset = Some(offset);
        self
    }

    /// Delay every page response, simulating network latency
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.response_delay = Some(delay);
        self
    }

    /// Number of page fetches issued so far (count probe included)
    pub(crate) fn calls(&self) -> u64 {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PageSource for FixtureSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.response_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fatal_offset == Some(request.offset) {
            return Err(Error::Http {
                status: 403,
                body: "forbidden".to_string(),
            });
        }
        {
            let mut failures = self.transient_failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&request.offset)
                && *left > 0
            {
                *left -= 1;
                return Err(Error::Http {
                    status: 500,
                    body: "flaky".to_string(),
                });
            }
        }

        match request.span {
            RangeSpan::Offset { .. } => Ok(page_of(&self.records, request)),
            RangeSpan::Time { start_ms, end_ms } => {
                let filtered: Vec<Record> = self
                    .records
                    .iter()
                    .filter(|r| {
                        r.get("updated")
                            .and_then(Value::as_i64)
                            .is_some_and(|t| t >= start_ms && t < end_ms)
                    })
                    .cloned()
                    .collect();
                Ok(page_of(&filtered, request))
            }
        }
    }
}

fn page_of(records: &[Record], request: &PageRequest) -> PageResult {
    let start = (request.offset as usize).min(records.len());
    let end = (start + request.limit).min(records.len());
    PageResult {
        items: records[start..end].to_vec(),
        next_cursor: None,
        total_count: Some(records.len() as u64),
    }
}

/// `count` records with ids `rec-1` through `rec-count`
pub(crate) fn make_records(count: usize) -> Vec<Record> {
    (1..=count)
        .map(|i| {
            record(json!({
                "id": format!("rec-{i}"),
                "seq": i,
                "name": format!("record {i}"),
            }))
        })
        .collect()
}

/// `count` records with ids `rec-1..` and `updated` timestamps spaced
/// `step_ms` apart starting at `base_ms`
pub(crate) fn timed_records(count: usize, base_ms: i64, step_ms: i64) -> Vec<Record> {
    (1..=count)
        .map(|i| {
            record(json!({
                "id": format!("rec-{i}"),
                "updated": base_ms + (i as i64 - 1) * step_ms,
            }))
        })
        .collect()
}

pub(crate) fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => Record::new(map),
        _ => panic!("fixture must be a JSON object"),
    }
}
