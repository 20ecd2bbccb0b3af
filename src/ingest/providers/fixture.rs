// src/ingest/providers/fixture.rs
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::ingest::providers::http::split_page;
use crate::ingest::types::{Page, PostSource, SearchQuery};

/// Offline source serving pre-recorded pages (cursor = page index).
/// Also used to script an unreachable source in tests.
pub struct FixtureSource {
    mode: Mode,
    served: AtomicUsize,
}

enum Mode {
    Pages(Vec<Vec<Value>>),
    Fail(String),
}

impl FixtureSource {
    pub fn from_pages(pages: Vec<Vec<Value>>) -> Self {
        Self {
            mode: Mode::Pages(pages),
            served: AtomicUsize::new(0),
        }
    }

    /// Chunk a flat item list into pages of `page_size`.
    pub fn from_items(items: Vec<Value>, page_size: usize) -> Self {
        let pages = items
            .chunks(page_size.max(1))
            .map(|c| c.to_vec())
            .collect();
        Self::from_pages(pages)
    }

    /// Parse a JSON fixture (bare array or wrapped object, see `split_page`).
    pub fn from_json_str(s: &str, page_size: usize) -> Result<Self> {
        let body: Value = serde_json::from_str(s).context("parsing fixture json")?;
        Ok(Self::from_items(split_page(body).items, page_size))
    }

    pub fn from_path(path: &std::path::Path, page_size: usize) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture from {}", path.display()))?;
        Self::from_json_str(&s, page_size)
    }

    /// A source whose every fetch fails with `msg`.
    pub fn failing(msg: &str) -> Self {
        Self {
            mode: Mode::Fail(msg.to_string()),
            served: AtomicUsize::new(0),
        }
    }

    /// Number of `fetch_page` calls answered so far.
    pub fn pages_served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostSource for FixtureSource {
    async fn fetch_page(&self, _query: &SearchQuery, cursor: Option<&str>) -> Result<Page> {
        self.served.fetch_add(1, Ordering::SeqCst);
        let pages = match &self.mode {
            Mode::Pages(p) => p,
            Mode::Fail(msg) => return Err(anyhow!("{msg}")),
        };

        let idx = match cursor {
            None => 0,
            Some(c) => c.parse::<usize>().context("fixture cursor")?,
        };
        let items = pages.get(idx).cloned().unwrap_or_default();
        let next_cursor = (idx + 1 < pages.len()).then(|| (idx + 1).to_string());
        Ok(Page { items, next_cursor })
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
