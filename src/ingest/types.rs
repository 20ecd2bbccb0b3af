// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One ingested tweet. Immutable once built; ordered by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub likes: u64,
    pub replies: u64,
    pub retweets: u64,
    pub quotes: u64,
    /// Character count of the raw body.
    pub length: usize,
}

impl Record {
    pub fn new(
        id: u64,
        created_at: DateTime<Utc>,
        content: impl Into<String>,
        likes: u64,
        replies: u64,
        retweets: u64,
        quotes: u64,
    ) -> Self {
        let content = content.into();
        let length = content.chars().count();
        Self {
            id,
            created_at,
            content,
            likes,
            replies,
            retweets,
            quotes,
            length,
        }
    }

    /// Likes + replies + retweets + quotes.
    pub fn engagement(&self) -> u64 {
        self.likes
            .saturating_add(self.replies)
            .saturating_add(self.retweets)
            .saturating_add(self.quotes)
    }
}

/// Author-scoped, date-bounded search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub author: String,
    pub since: NaiveDate,
}

impl SearchQuery {
    /// Query string in the `from:<author> since:<yyyy-mm-dd>` form.
    pub fn to_query_string(&self) -> String {
        format!("from:{} since:{}", self.author, self.since.format("%Y-%m-%d"))
    }
}

/// One page of raw items, newest first as delivered by the source.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<serde_json::Value>,
    pub next_cursor: Option<String>,
}

/// External search-style source of raw posts.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch one page. `cursor` is `None` for the first page.
    async fn fetch_page(&self, query: &SearchQuery, cursor: Option<&str>) -> Result<Page>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn length_counts_chars_not_bytes() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let r = Record::new(1, ts, "héllo 🚀", 1, 2, 3, 4);
        assert_eq!(r.length, 7);
        assert_eq!(r.engagement(), 10);
    }

    #[test]
    fn query_string_is_author_scoped() {
        let q = SearchQuery {
            author: "elonmusk".into(),
            since: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        assert_eq!(q.to_query_string(), "from:elonmusk since:2024-01-05");
    }
}
