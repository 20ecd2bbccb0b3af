// src/ingest/mod.rs
pub mod fields;
pub mod providers;
pub mod types;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::ingest::types::{PostSource, Record, SearchQuery};

const ID_KEYS: &[&str] = &["id", "id_str", "tweet_id", "rest_id"];
const DATE_KEYS: &[&str] = &["date", "created_at", "timestamp"];
const BODY_KEYS: &[&str] = &["rawContent", "content", "full_text", "text"];
const LIKE_KEYS: &[&str] = &["likeCount", "like_count", "favorite_count", "public_metrics.like_count"];
const REPLY_KEYS: &[&str] = &["replyCount", "reply_count", "public_metrics.reply_count"];
const RETWEET_KEYS: &[&str] = &["retweetCount", "retweet_count", "public_metrics.retweet_count"];
const QUOTE_KEYS: &[&str] = &["quoteCount", "quote_count", "public_metrics.quote_count"];

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_metrics);
}

fn describe_metrics() {
    describe_counter!("ingest_pages_total", "Pages fetched from the search source.");
    describe_counter!("ingest_records_total", "Records kept by the ingest adapter.");
    describe_counter!("ingest_malformed_total", "Items dropped for a bad id or timestamp.");
    describe_counter!(
        "ingest_early_stop_total",
        "Runs stopped early by an item older than the cutoff."
    );
    describe_counter!("ingest_source_errors_total", "Source fetch errors.");
    describe_histogram!("ingest_page_ms", "Time to fetch and decode one search page, in ms.");
}

/// How far the adapter may trust the order in which the source delivers items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrdering {
    /// Newest first. The first item older than the cutoff ends the run, and
    /// the run ends once `cap` records are collected. Out-of-order sources
    /// can lose valid records in this mode.
    #[default]
    ReverseChronological,
    /// No ordering assumed: read every page (up to `max_pages`), filter by the
    /// cutoff, keep the newest `cap`.
    Unordered,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub cap: usize,
    pub cutoff: DateTime<Utc>,
    pub ordering: SourceOrdering,
    pub max_pages: usize,
}

/// Map one raw item into a `Record`. `None` when the id or timestamp is unusable.
/// Missing engagement counters default to 0.
pub fn parse_item(item: &serde_json::Value) -> Option<Record> {
    let id = fields::lookup_u64(item, ID_KEYS)?;
    let created_at = fields::lookup_datetime(item, DATE_KEYS)?;
    let content = fields::lookup_str(item, BODY_KEYS).unwrap_or_default();
    Some(Record::new(
        id,
        created_at,
        content,
        fields::lookup_u64(item, LIKE_KEYS).unwrap_or(0),
        fields::lookup_u64(item, REPLY_KEYS).unwrap_or(0),
        fields::lookup_u64(item, RETWEET_KEYS).unwrap_or(0),
        fields::lookup_u64(item, QUOTE_KEYS).unwrap_or(0),
    ))
}

/// Pull records for `query`, bounded by `opts.cap` and `opts.cutoff`.
///
/// Returns records sorted ascending by timestamp (ties by id). Items with a
/// bad id or timestamp are dropped, duplicates (same id) are skipped. A source
/// failure maps to `SourceUnavailable`; a run that keeps nothing is `EmptyResult`.
pub async fn fetch(
    source: &dyn PostSource,
    query: &SearchQuery,
    opts: &IngestOptions,
) -> Result<Vec<Record>, IngestError> {
    ensure_metrics_described();

    let cap = opts.cap.max(1);
    let early_stop = opts.ordering == SourceOrdering::ReverseChronological;

    let mut out: Vec<Record> = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;
    let mut malformed = 0usize;

    'pages: loop {
        if pages >= opts.max_pages.max(1) {
            tracing::debug!(target: "ingest", pages, "page limit reached");
            break;
        }

        let page = source
            .fetch_page(query, cursor.as_deref())
            .await
            .map_err(|e| {
                tracing::warn!(target: "ingest", error = ?e, provider = source.name(), "source error");
                counter!("ingest_source_errors_total").increment(1);
                IngestError::SourceUnavailable(format!("{e:#}"))
            })?;
        pages += 1;
        counter!("ingest_pages_total").increment(1);

        for item in &page.items {
            let Some(rec) = parse_item(item) else {
                malformed += 1;
                continue;
            };
            if rec.created_at < opts.cutoff {
                if early_stop {
                    counter!("ingest_early_stop_total").increment(1);
                    tracing::debug!(target: "ingest", id = rec.id, "item older than cutoff, stopping");
                    break 'pages;
                }
                continue;
            }
            if !seen.insert(rec.id) {
                continue;
            }
            out.push(rec);
            if early_stop && out.len() >= cap {
                break 'pages;
            }
        }

        match page.next_cursor {
            Some(c) if !c.is_empty() && !page.items.is_empty() => cursor = Some(c),
            _ => break,
        }
    }

    if !early_stop {
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out.truncate(cap);
    }

    if malformed > 0 {
        counter!("ingest_malformed_total").increment(malformed as u64);
        tracing::warn!(target: "ingest", malformed, "dropped malformed items");
    }

    if out.is_empty() {
        return Err(IngestError::EmptyResult);
    }

    out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    counter!("ingest_records_total").increment(out.len() as u64);
    tracing::info!(
        target: "ingest",
        provider = source.name(),
        kept = out.len(),
        pages,
        malformed,
        "ingest run finished"
    );
    Ok(out)
}
