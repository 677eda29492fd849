//! Engine tests over the in-memory fixture source

use super::ListingSweeper;
use super::test_helpers::{FixtureSource, make_records, record, timed_records};
use crate::config::{RetryConfig, SweepConfig};
use crate::error::{Error, Result};
use crate::types::{FetchDomain, ProgressEvent, Record};
use futures::StreamExt;
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn fast_retry() -> RetryConfig {
    RetryConfig {
        transient_delay: Duration::from_millis(10),
        rate_limit_wait_cap: Duration::from_millis(10),
        ..Default::default()
    }
}

fn config(domain: FetchDomain, concurrency: usize, page_size: usize) -> SweepConfig {
    SweepConfig {
        domain,
        concurrency,
        page_size,
        retry: fast_retry(),
        ..Default::default()
    }
}

fn event_log() -> (
    Arc<Mutex<Vec<ProgressEvent>>>,
    impl Fn(ProgressEvent) + Send + Sync + 'static,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    (events, move |event| {
        sink_events.lock().unwrap().push(event);
    })
}

async fn drain(sweeper: &ListingSweeper) -> Vec<Result<Record>> {
    let mut stream = sweeper.sweep().await.unwrap();
    let mut out = Vec::new();
    while let Some(item) = stream.next().await {
        out.push(item);
    }
    out
}

fn ids_of(results: &[Result<Record>]) -> Vec<String> {
    results
        .iter()
        .map(|r| r.as_ref().unwrap().identity("id").unwrap())
        .collect()
}

#[tokio::test]
async fn scenario_500_records_ten_workers_yields_all_unique() {
    let source = Arc::new(FixtureSource::new(make_records(500)));
    let (events, sink) = event_log();
    let sweeper = ListingSweeper::new(config(FetchDomain::offset_from(0), 10, 50), source.clone())
        .unwrap()
        .with_progress(sink);

    let results = drain(&sweeper).await;
    let ids = ids_of(&results);

    assert_eq!(ids.len(), 500);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 500);
    // One count probe plus one 50-item page per chunk
    assert_eq!(source.calls(), 11);

    let events = events.lock().unwrap();
    assert!(matches!(
        events.first(),
        Some(ProgressEvent::Start {
            total_chunks: 10,
            expected_items: Some(500)
        })
    ));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Complete {
            unique_items: 500,
            duplicates_removed: 0
        })
    ));
}

#[tokio::test]
async fn identifier_set_is_invariant_across_concurrency() {
    let records = make_records(333);

    let solo = ListingSweeper::new(
        config(FetchDomain::offset_from(0), 1, 40),
        Arc::new(FixtureSource::new(records.clone())),
    )
    .unwrap();
    let wide = ListingSweeper::new(
        config(FetchDomain::offset_from(0), 10, 40),
        Arc::new(FixtureSource::new(records)),
    )
    .unwrap();

    let solo_ids: HashSet<String> = ids_of(&drain(&solo).await).into_iter().collect();
    let wide_ids: HashSet<String> = ids_of(&drain(&wide).await).into_iter().collect();

    assert_eq!(solo_ids.len(), 333);
    assert_eq!(solo_ids, wide_ids);
}

#[tokio::test]
async fn max_items_with_starting_offset_yields_exact_slice() {
    let source = Arc::new(FixtureSource::new(make_records(500)));
    let sweep_config = SweepConfig {
        max_items: Some(25),
        ..config(FetchDomain::offset_from(100), 4, 50)
    };
    let sweeper = ListingSweeper::new(sweep_config, source).unwrap();

    let ids: HashSet<String> = ids_of(&drain(&sweeper).await).into_iter().collect();

    // The 101st through 125th logically-ordered records, exactly
    let expected: HashSet<String> = (101..=125).map(|i| format!("rec-{i}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn zero_width_domain_completes_immediately() {
    let source = Arc::new(FixtureSource::new(make_records(500)));
    let (events, sink) = event_log();
    let sweeper = ListingSweeper::new(config(FetchDomain::offset(42, 42), 10, 50), source.clone())
        .unwrap()
        .with_progress(sink);

    let results = drain(&sweeper).await;

    assert!(results.is_empty());
    assert_eq!(source.calls(), 0, "no pages should be fetched");
    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            ProgressEvent::Start {
                total_chunks: 0,
                expected_items: Some(0)
            },
            ProgressEvent::Complete {
                unique_items: 0,
                duplicates_removed: 0
            },
        ]
    );
}

#[tokio::test]
async fn duplicate_identifiers_are_yielded_once() {
    // 100 distinct ids; the last 20 records repeat rec-1 through rec-20,
    // simulating chunk-boundary drift on a shifting dataset
    let mut records = make_records(100);
    records.extend(make_records(20));
    let source = Arc::new(FixtureSource::new(records));
    let (events, sink) = event_log();
    let sweeper = ListingSweeper::new(config(FetchDomain::offset_from(0), 4, 30), source)
        .unwrap()
        .with_progress(sink);

    let results = drain(&sweeper).await;
    let ids = ids_of(&results);

    assert_eq!(ids.len(), 100, "each identifier exactly once");
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 100);
    assert!(matches!(
        events.lock().unwrap().last(),
        Some(ProgressEvent::Complete {
            unique_items: 100,
            duplicates_removed: 20
        })
    ));
}

#[tokio::test]
async fn transient_failures_lose_no_records() {
    // The chunk at offset 50 fails with 500 twice before succeeding
    let source = Arc::new(FixtureSource::new(make_records(200)).failing_at(50, 2));
    let sweeper =
        ListingSweeper::new(config(FetchDomain::offset(0, 200), 4, 50), source.clone()).unwrap();

    let results = drain(&sweeper).await;
    let ids = ids_of(&results);

    assert_eq!(ids.len(), 200, "zero lost items after recovery");
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 200);
    // Four pages plus the two failed attempts
    assert_eq!(source.calls(), 6);
}

#[tokio::test]
async fn retry_ceiling_surfaces_exhaustion_through_stream() {
    let source = Arc::new(FixtureSource::new(make_records(100)).failing_at(0, 5));
    let sweep_config = SweepConfig {
        retry: RetryConfig {
            max_attempts: Some(2),
            ..fast_retry()
        },
        ..config(FetchDomain::offset(0, 100), 1, 50)
    };
    let sweeper = ListingSweeper::new(sweep_config, source).unwrap();

    let results = drain(&sweeper).await;

    assert!(matches!(
        results.last(),
        Some(Err(Error::RetriesExhausted { attempts: 3, .. }))
    ));
}

#[tokio::test]
async fn fatal_error_terminates_stream_with_that_error() {
    let source = Arc::new(FixtureSource::new(make_records(500)).fatal_at(200));
    let (events, sink) = event_log();
    let sweeper = ListingSweeper::new(config(FetchDomain::offset(0, 500), 5, 100), source)
        .unwrap()
        .with_progress(sink);

    let results = drain(&sweeper).await;

    let last = results.last().unwrap();
    assert!(
        matches!(last, Err(Error::Http { status: 403, .. })),
        "the specific fatal error must surface, got {last:?}"
    );
    assert_eq!(
        results.iter().filter(|r| r.is_err()).count(),
        1,
        "only the first fatal error is surfaced"
    );
    assert!(
        !events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, ProgressEvent::Complete { .. })),
        "a failed sweep must not report completion"
    );
}

#[tokio::test]
async fn fatal_error_stops_sibling_workers() {
    let source = Arc::new(
        FixtureSource::new(make_records(500))
            .fatal_at(0)
            .with_delay(Duration::from_millis(20)),
    );
    let sweeper =
        ListingSweeper::new(config(FetchDomain::offset(0, 500), 5, 20), source.clone()).unwrap();

    let results = drain(&sweeper).await;
    assert!(matches!(
        results.last(),
        Some(Err(Error::Http { status: 403, .. }))
    ));

    // Siblings observed the cancellation; of the 25 pages the domain holds,
    // only the handful in flight at failure time were fetched
    tokio::time::sleep(Duration::from_millis(100)).await;
    let calls = source.calls();
    assert!(calls < 25, "siblings kept fetching: {calls} calls");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.calls(), calls, "workers still active after failure");
}

#[tokio::test]
async fn dropping_the_stream_cancels_outstanding_work() {
    let source = Arc::new(
        FixtureSource::new(make_records(10_000)).with_delay(Duration::from_millis(5)),
    );
    let sweep_config = SweepConfig {
        channel_capacity: 4,
        ..config(FetchDomain::offset(0, 10_000), 4, 10)
    };
    let sweeper = ListingSweeper::new(sweep_config, source.clone()).unwrap();

    let mut stream = sweeper.sweep().await.unwrap();
    for _ in 0..5 {
        assert!(stream.next().await.unwrap().is_ok());
    }
    drop(stream);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let calls = source.calls();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        source.calls(),
        calls,
        "workers kept fetching after the caller walked away"
    );
}

#[tokio::test]
async fn count_probe_resolves_unknown_domain_end() {
    let source = Arc::new(FixtureSource::new(make_records(230)));
    let sweeper =
        ListingSweeper::new(config(FetchDomain::offset_from(0), 4, 50), source.clone()).unwrap();

    let results = drain(&sweeper).await;

    assert_eq!(results.len(), 230);
    assert!(results.iter().all(|r| r.is_ok()));
}

#[tokio::test]
async fn progress_events_track_chunk_lifecycle() {
    let source = Arc::new(FixtureSource::new(make_records(500)));
    let (events, sink) = event_log();
    let sweep_config = SweepConfig {
        report_interval: 50,
        ..config(FetchDomain::offset(0, 500), 5, 25)
    };
    let sweeper = ListingSweeper::new(sweep_config, source)
        .unwrap()
        .with_progress(sink);

    let results = drain(&sweeper).await;
    assert_eq!(results.len(), 500);

    let events = events.lock().unwrap();
    let starts = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::ChunkStart { .. }))
        .count();
    let completes = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::ChunkComplete { .. }))
        .count();
    assert_eq!(starts, 5, "every chunk announces itself");
    assert_eq!(completes, 5, "every chunk reports exhaustion");

    // Each chunk holds 100 records at a 50-record reporting interval
    let fetching: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Fetching {
                chunk,
                total_chunks,
                percent,
                ..
            } => Some((*chunk, *total_chunks, *percent)),
            _ => None,
        })
        .collect();
    assert!(!fetching.is_empty());
    for (chunk, total_chunks, percent) in fetching {
        assert!(chunk < 5);
        assert_eq!(total_chunks, 5);
        assert!((0.0..=100.0).contains(&percent));
    }
}

#[tokio::test]
async fn complete_event_accounting_matches_stream() {
    let mut records = make_records(80);
    records.extend(make_records(40)); // 40 duplicate ids
    let source = Arc::new(FixtureSource::new(records));
    let (events, sink) = event_log();
    let sweeper = ListingSweeper::new(config(FetchDomain::offset(0, 120), 3, 20), source.clone())
        .unwrap()
        .with_progress(sink);

    let results = drain(&sweeper).await;
    let yielded = results.len() as u64;

    let events = events.lock().unwrap();
    let Some(ProgressEvent::Complete {
        unique_items,
        duplicates_removed,
    }) = events.last()
    else {
        panic!("sweep must end with a Complete event");
    };

    assert_eq!(*unique_items, yielded);
    // 120 records pushed by the workers, minus what reached the caller
    assert_eq!(*duplicates_removed, 120 - yielded);
    assert_eq!(yielded, 80);
}

#[tokio::test]
async fn record_missing_identifier_is_fatal() {
    let records = vec![
        record(json!({"id": "ok-1"})),
        record(json!({"name": "no identifier here"})),
    ];
    let source = Arc::new(FixtureSource::new(records));
    let sweeper = ListingSweeper::new(config(FetchDomain::offset(0, 2), 1, 10), source).unwrap();

    let results = drain(&sweeper).await;

    assert!(matches!(
        results.last(),
        Some(Err(Error::InvalidResponse(_)))
    ));
}

#[tokio::test]
async fn single_worker_preserves_endpoint_order() {
    let source = Arc::new(FixtureSource::new(make_records(120)));
    let sweeper = ListingSweeper::new(config(FetchDomain::offset(0, 120), 1, 40), source).unwrap();

    let ids = ids_of(&drain(&sweeper).await);

    let expected: Vec<String> = (1..=120).map(|i| format!("rec-{i}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn time_domain_yields_every_record_once() {
    let base = 1_700_000_000_000i64;
    let source = Arc::new(FixtureSource::new(timed_records(300, base, 1_000)));
    let (events, sink) = event_log();
    let domain = FetchDomain::Time {
        start_ms: base,
        end_ms: base + 300_000,
    };
    let sweeper = ListingSweeper::new(config(domain, 5, 200), source)
        .unwrap()
        .with_progress(sink);

    let ids: HashSet<String> = ids_of(&drain(&sweeper).await).into_iter().collect();

    assert_eq!(ids.len(), 300);
    assert!(matches!(
        events.lock().unwrap().last(),
        Some(ProgressEvent::Complete {
            unique_items: 300,
            duplicates_removed: 0
        })
    ));
}

#[tokio::test]
async fn time_domain_respects_window_bounds() {
    let base = 1_700_000_000_000i64;
    let source = Arc::new(FixtureSource::new(timed_records(300, base, 1_000)));
    // Records 101 through 200 fall inside [base+100s, base+200s)
    let domain = FetchDomain::Time {
        start_ms: base + 100_000,
        end_ms: base + 200_000,
    };
    let sweeper = ListingSweeper::new(config(domain, 4, 50), source).unwrap();

    let ids: HashSet<String> = ids_of(&drain(&sweeper).await).into_iter().collect();

    let expected: HashSet<String> = (101..=200).map(|i| format!("rec-{i}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn max_items_caps_time_domain_sweeps() {
    let base = 1_700_000_000_000i64;
    let source = Arc::new(FixtureSource::new(timed_records(300, base, 1_000)));
    let domain = FetchDomain::Time {
        start_ms: base,
        end_ms: base + 300_000,
    };
    let sweep_config = SweepConfig {
        max_items: Some(30),
        ..config(domain, 3, 50)
    };
    let (events, sink) = event_log();
    let sweeper = ListingSweeper::new(sweep_config, source)
        .unwrap()
        .with_progress(sink);

    let results = drain(&sweeper).await;

    assert_eq!(results.len(), 30);
    assert!(results.iter().all(|r| r.is_ok()));
    assert!(matches!(
        events.lock().unwrap().last(),
        Some(ProgressEvent::Complete {
            unique_items: 30,
            ..
        })
    ));
}
