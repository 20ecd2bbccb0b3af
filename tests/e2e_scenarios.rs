// tests/e2e_scenarios.rs
//
// Whole-pipeline scenarios: fixture source → window → ingest → dataset,
// with a pinned clock so day/hour buckets are predictable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use tweet_insights::cache::DatasetCache;
use tweet_insights::config::InsightsConfig;
use tweet_insights::error::{CacheError, PipelineError};
use tweet_insights::ingest::providers::fixture::FixtureSource;
use tweet_insights::ingest::types::{Page, PostSource, SearchQuery};
use tweet_insights::topics::TopicStatus;
use tweet_insights::InsightsPipeline;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

fn post(id: u64, at: DateTime<Utc>, content: &str, likes: u64) -> Value {
    json!({ "id": id, "date": at.to_rfc3339(), "content": content, "likeCount": likes })
}

fn pipeline(items: Vec<Value>) -> InsightsPipeline {
    let source: Arc<dyn PostSource> = Arc::new(FixtureSource::from_items(items, 50));
    InsightsPipeline::from_config(&InsightsConfig::default(), source)
}

#[tokio::test]
async fn three_posts_over_two_days() {
    // newest first, as the search source returns them
    let items = vec![
        post(3, t0() + Duration::hours(25), &"z".repeat(30), 3),
        post(2, t0() + Duration::hours(1), &"y".repeat(20), 2),
        post(1, t0(), &"x".repeat(10), 1),
    ];
    let ds = pipeline(items)
        .build_at(1500, t0() + Duration::days(2))
        .await
        .unwrap();

    let s = &ds.views.summary;
    assert_eq!(s.tweet_count, 3);
    assert!((s.avg_length - 20.0).abs() < 1e-9);
    assert!((s.mean_engagement.likes - 2.0).abs() < 1e-9);
    assert_eq!((s.min_length, s.max_length), (10, 30));

    let daily: Vec<(String, usize)> = ds
        .views
        .daily
        .iter()
        .map(|d| (d.date.to_string(), d.stats.tweets))
        .collect();
    assert_eq!(
        daily,
        vec![("2024-03-01".to_string(), 2), ("2024-03-02".to_string(), 1)]
    );

    let ids: Vec<u64> = ds.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3], "records ascending by time");

    // three posts are below the topic threshold
    assert_eq!(ds.topics.summary.status, TopicStatus::InsufficientDocuments);
    assert!(ds.topics.summary.topics.is_empty());
}

#[tokio::test]
async fn posts_before_the_window_are_left_out() {
    let now = t0();
    let items = vec![
        post(3, now - Duration::days(1), "inside", 1),
        post(2, now - Duration::days(181), "still inside", 1),
        post(1, now - Duration::days(183), "too old", 1),
    ];
    let ds = pipeline(items).build_at(1500, now).await.unwrap();
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.window_start, now - Duration::days(182));
    assert!(ds.records.iter().all(|r| r.created_at >= ds.window_start));
}

#[tokio::test]
async fn identical_documents_yield_no_topics() {
    let items: Vec<Value> = (0..4)
        .map(|i| post(10 - i, t0() - Duration::hours(i as i64), "rocket launch today", 1))
        .collect();
    let ds = pipeline(items).build_at(1500, t0()).await.unwrap();
    assert_eq!(ds.len(), 4);
    assert!(ds.topics.summary.topics.is_empty());
    assert!(ds.topics.summary.assignments.iter().all(Option::is_none));
    assert!(ds.topics.rollup.is_empty());
}

#[tokio::test]
async fn varied_corpus_gets_topics_and_rollup() {
    let texts = [
        "rocket launch pad engines fire",
        "rocket engines static fire test",
        "launch pad rocket booster landing",
        "electric car battery factory output",
        "battery cells car factory expansion",
        "car battery charging network growth",
        "rocket booster landing success",
        "factory output electric car record",
    ];
    let items: Vec<Value> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| post(100 - i as u64, t0() - Duration::hours(i as i64 * 3), t, i as u64))
        .collect();
    let ds = pipeline(items).build_at(1500, t0()).await.unwrap();

    let topics = &ds.topics.summary;
    assert!(!topics.topics.is_empty());
    assert!(topics.topics.len() <= 5);
    assert_eq!(topics.assignments.len(), ds.len());
    let assigned: usize = ds.topics.rollup.iter().map(|r| r.stats.tweets).sum();
    assert_eq!(assigned, topics.assignments.iter().flatten().count());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn concurrent_builds_share_one_extractor() {
    let texts = [
        "rocket launch pad engines fire",
        "electric car battery factory output",
        "launch pad rocket booster landing",
        "battery cells car factory expansion",
        "rocket booster landing success",
    ];
    let items: Vec<Value> = (0..40u64)
        .map(|i| {
            let text = texts[i as usize % texts.len()];
            post(500 - i, t0() - Duration::hours(i as i64), text, i)
        })
        .collect();
    let p = Arc::new(pipeline(items));

    // The fit runs on the blocking pool, so the single worker stays free to
    // drive the second build and this ticker.
    let ticker = tokio::spawn(async { 7 });
    let (a, b) = tokio::join!(p.build_at(1500, t0()), p.build_at(1500, t0()));
    assert_eq!(ticker.await.unwrap(), 7);

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.len(), 40);
    assert_eq!(a.topics, b.topics, "seeded fits agree");
    assert!(!a.topics.summary.topics.is_empty());
}

#[tokio::test]
async fn no_posts_and_no_cache_is_unavailable() {
    let cache = DatasetCache::new(Arc::new(pipeline(Vec::new())), StdDuration::from_secs(1800));
    let err = cache.get(1500).await.unwrap_err();
    assert_eq!(err, CacheError::Unavailable(PipelineError::EmptyResult));
}

struct HangingSource;

#[async_trait]
impl PostSource for HangingSource {
    async fn fetch_page(&self, _query: &SearchQuery, _cursor: Option<&str>) -> Result<Page> {
        tokio::time::sleep(StdDuration::from_secs(3600)).await;
        Ok(Page {
            items: Vec::new(),
            next_cursor: None,
        })
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out() {
    let mut cfg = InsightsConfig::default();
    cfg.source.request_timeout_secs = 2;
    cfg.source.run_timeout_secs = 5;
    let p = InsightsPipeline::from_config(&cfg, Arc::new(HangingSource));
    let err = p.build_at(1500, t0()).await.unwrap_err();
    assert_eq!(err, PipelineError::Timeout(5));
}

/// Newest-first pages of 100 posts, each page taking 2s, never running dry.
struct SlowPages {
    served: AtomicUsize,
}

const SLOW_WORDS: &[&str] = &["rocket", "launch", "engine", "orbit", "tesla", "battery"];

#[async_trait]
impl PostSource for SlowPages {
    async fn fetch_page(&self, _q: &SearchQuery, cursor: Option<&str>) -> Result<Page> {
        tokio::time::sleep(StdDuration::from_secs(2)).await;
        self.served.fetch_add(1, Ordering::SeqCst);
        let page: u64 = cursor.map(|c| c.parse::<u64>()).transpose()?.unwrap_or(0);
        let items = (0..100u64)
            .map(|i| {
                let n = page * 100 + i;
                let text = format!(
                    "{} {} news",
                    SLOW_WORDS[(n % 6) as usize],
                    SLOW_WORDS[((n / 6) % 6) as usize]
                );
                post(1_000_000 - n, t0() - Duration::minutes(n as i64 + 1), &text, n % 17)
            })
            .collect();
        Ok(Page {
            items,
            next_cursor: Some((page + 1).to_string()),
        })
    }

    fn name(&self) -> &'static str {
        "slow-pages"
    }
}

#[tokio::test(start_paused = true)]
async fn default_cap_fits_within_the_run_timeout_on_a_slow_source() {
    let cfg = InsightsConfig::default().sanitized();
    let source = Arc::new(SlowPages {
        served: AtomicUsize::new(0),
    });
    let p = InsightsPipeline::from_config(&cfg, source.clone());

    let cap = cfg.cap.resolve(None);
    assert_eq!(cap, 1500);
    let ds = p.build_at(cap, t0()).await.unwrap();

    // 15 pages at 2s each is 30s, well past a single request timeout.
    assert_eq!(ds.records.len(), 1500);
    assert_eq!(source.served.load(Ordering::SeqCst), 15);
    assert!(ds.records.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}
