// tests/ingest_adapter.rs
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde_json::{json, Value};
use tweet_insights::error::IngestError;
use tweet_insights::ingest::providers::fixture::FixtureSource;
use tweet_insights::ingest::types::SearchQuery;
use tweet_insights::ingest::{fetch, IngestOptions, SourceOrdering};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
}

fn cutoff() -> DateTime<Utc> {
    now() - Duration::days(182)
}

fn query() -> SearchQuery {
    SearchQuery {
        author: "someone".into(),
        since: cutoff().date_naive(),
    }
}

fn item(id: u64, ts: DateTime<Utc>) -> Value {
    json!({ "id": id, "date": ts.to_rfc3339(), "content": format!("post {id}"), "likeCount": id })
}

/// `n` items, newest first, one every `step_days`.
fn newest_first(n: u64, step_days: i64) -> Vec<Value> {
    (0..n)
        .map(|i| item(1000 - i, now() - Duration::days(i as i64 * step_days) - Duration::hours(1)))
        .collect()
}

fn opts(cap: usize, ordering: SourceOrdering) -> IngestOptions {
    IngestOptions {
        cap,
        cutoff: cutoff(),
        ordering,
        max_pages: 100,
    }
}

#[tokio::test]
async fn cap_and_cutoff_hold_and_output_is_ascending() {
    // 40 items across 80 days (all inside), then older ones
    let src = FixtureSource::from_items(newest_first(120, 2), 10);
    for cap in [1usize, 5, 17, 40, 500] {
        let out = fetch(&src, &query(), &opts(cap, SourceOrdering::ReverseChronological))
            .await
            .unwrap();
        assert!(out.len() <= cap);
        assert!(out.iter().all(|r| r.created_at >= cutoff()));
        assert!(out.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}

#[tokio::test]
async fn early_stop_avoids_fetching_later_pages() {
    // items every 10 days: 19 inside the window, then older
    let src = FixtureSource::from_items(newest_first(100, 10), 10);
    let out = fetch(&src, &query(), &opts(1000, SourceOrdering::ReverseChronological))
        .await
        .unwrap();
    assert_eq!(out.len(), 19);
    assert_eq!(src.pages_served(), 2);
}

#[tokio::test]
async fn cap_stops_paging() {
    let src = FixtureSource::from_items(newest_first(100, 1), 10);
    let out = fetch(&src, &query(), &opts(15, SourceOrdering::ReverseChronological))
        .await
        .unwrap();
    assert_eq!(out.len(), 15);
    assert_eq!(src.pages_served(), 2);
    // the newest 15, oldest first
    assert_eq!(out.last().map(|r| r.id), Some(1000));
    assert_eq!(out.first().map(|r| r.id), Some(986));
}

#[tokio::test]
async fn out_of_order_source_loses_records_in_early_stop_mode_only() {
    let mut items = newest_first(30, 3);
    // an old straggler near the top of the feed
    items.insert(2, item(1, cutoff() - Duration::days(5)));
    let early = FixtureSource::from_items(items.clone(), 50);
    let out = fetch(&early, &query(), &opts(1000, SourceOrdering::ReverseChronological))
        .await
        .unwrap();
    assert_eq!(out.len(), 2);

    let mut shuffled = items;
    shuffled.shuffle(&mut StdRng::seed_from_u64(3));
    let exhaustive = FixtureSource::from_items(shuffled, 7);
    let out = fetch(&exhaustive, &query(), &opts(1000, SourceOrdering::Unordered))
        .await
        .unwrap();
    // 3-day steps: 61 would fit, 30 generated, all inside
    assert_eq!(out.len(), 30);
    assert!(out.iter().all(|r| r.created_at >= cutoff()));
    assert!(out.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn unordered_mode_keeps_the_newest_cap() {
    let mut items = newest_first(50, 1);
    items.shuffle(&mut StdRng::seed_from_u64(9));
    let src = FixtureSource::from_items(items, 8);
    let out = fetch(&src, &query(), &opts(10, SourceOrdering::Unordered))
        .await
        .unwrap();
    let ids: Vec<u64> = out.iter().map(|r| r.id).collect();
    assert_eq!(ids, (991..=1000).collect::<Vec<u64>>());
}

#[tokio::test]
async fn malformed_and_duplicate_items_are_dropped() {
    let ts = now() - Duration::days(1);
    let items = vec![
        item(5, ts),
        json!({ "id": "not-a-number", "date": ts.to_rfc3339() }),
        json!({ "id": 6, "date": "sometime" }),
        item(5, ts),
        json!({ "id": 7, "date": (ts - Duration::hours(2)).to_rfc3339(), "content": "no counters" }),
    ];
    let src = FixtureSource::from_items(items, 10);
    let out = fetch(&src, &query(), &opts(100, SourceOrdering::ReverseChronological))
        .await
        .unwrap();
    let ids: Vec<u64> = out.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![7, 5]);
    assert_eq!(out[0].likes, 0);
}

#[tokio::test]
async fn empty_source_is_empty_result() {
    let src = FixtureSource::from_pages(vec![vec![]]);
    let err = fetch(&src, &query(), &opts(10, SourceOrdering::ReverseChronological))
        .await
        .unwrap_err();
    assert_eq!(err, IngestError::EmptyResult);

    let only_old = FixtureSource::from_items(vec![item(1, cutoff() - Duration::days(1))], 10);
    let err = fetch(&only_old, &query(), &opts(10, SourceOrdering::ReverseChronological))
        .await
        .unwrap_err();
    assert_eq!(err, IngestError::EmptyResult);
}

#[tokio::test]
async fn unreachable_source_is_source_unavailable() {
    let src = FixtureSource::failing("connection refused");
    let err = fetch(&src, &query(), &opts(10, SourceOrdering::ReverseChronological))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::SourceUnavailable(ref m) if m.contains("connection refused")));
}
