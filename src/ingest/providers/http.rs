// src/ingest/providers/http.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use serde_json::Value;

use crate::ingest::fields;
use crate::ingest::types::{Page, PostSource, SearchQuery};

const ITEM_KEYS: &[&str] = &["data", "tweets", "results", "items"];
const CURSOR_KEYS: &[&str] = &["next_cursor", "cursor", "meta.next_token", "next"];

/// Search-style HTTP source: `GET {base_url}/search?q=<query>[&cursor=<c>]`.
///
/// Accepts either a bare JSON array of items or an object carrying the items
/// under one of `data`/`tweets`/`results`/`items` plus an optional cursor.
pub struct HttpSearchSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSearchSource {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tweet-insights/0.1")
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()
            .context("building search http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// Split a decoded response body into items and the next cursor.
pub fn split_page(body: Value) -> Page {
    let next_cursor = fields::lookup_str(&body, CURSOR_KEYS).filter(|c| !c.is_empty());
    let items = match body {
        Value::Array(items) => items,
        other => match fields::first_present(&other, ITEM_KEYS) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
    };
    Page { items, next_cursor }
}

#[async_trait]
impl PostSource for HttpSearchSource {
    async fn fetch_page(&self, query: &SearchQuery, cursor: Option<&str>) -> Result<Page> {
        let t0 = std::time::Instant::now();
        let q = query.to_query_string();
        let mut params: Vec<(&str, &str)> = vec![("q", q.as_str())];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }

        let mut req = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&params);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let body: Value = req
            .send()
            .await
            .context("search http get()")?
            .error_for_status()
            .context("search http status")?
            .json()
            .await
            .context("search http .json()")?;

        histogram!("ingest_page_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(split_page(body))
    }

    fn name(&self) -> &'static str {
        "http-search"
    }
}
