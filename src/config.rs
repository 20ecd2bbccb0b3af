// src/config.rs
//! Service configuration: TOML or JSON file, env overrides, sanitizing.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::EngagementMetric;
use crate::dataset::AnalyticsSettings;
use crate::ingest::SourceOrdering;
use crate::topics::vectorize::VectorizerSettings;
use crate::topics::{TopicBackend, TopicExtractor};

pub const ENV_CONFIG_PATH: &str = "INSIGHTS_CONFIG_PATH";
pub const ENV_SOURCE_URL: &str = "INSIGHTS_SOURCE_URL";
pub const ENV_AUTHOR: &str = "INSIGHTS_AUTHOR";
pub const ENV_SOURCE_TOKEN: &str = "INSIGHTS_SOURCE_TOKEN";
pub const ENV_FRESHNESS_SECS: &str = "INSIGHTS_FRESHNESS_SECS";

/// Run timeout as a multiple of the request timeout when none is configured.
pub const RUN_TIMEOUT_FACTOR: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Http,
    Fixture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    pub author: String,
    /// Resolved from `INSIGHTS_SOURCE_TOKEN`; never read from the file.
    #[serde(skip)]
    pub token: Option<String>,
    pub ordering: SourceOrdering,
    /// Bound on a single page request.
    #[serde(alias = "timeout_secs")]
    pub request_timeout_secs: u64,
    /// Bound on a whole multi-page ingestion run.
    pub run_timeout_secs: u64,
    pub max_pages: usize,
    pub page_size: usize,
    pub fixture_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Http,
            base_url: "http://127.0.0.1:8090".into(),
            author: "elonmusk".into(),
            token: None,
            ordering: SourceOrdering::ReverseChronological,
            request_timeout_secs: 20,
            run_timeout_secs: 20 * RUN_TIMEOUT_FACTOR,
            max_pages: 50,
            page_size: 100,
            fixture_path: PathBuf::from("fixtures/sample_posts.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub lookback_days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_days: crate::window::LOOKBACK_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapConfig {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

impl Default for CapConfig {
    fn default() -> Self {
        Self {
            min: 200,
            max: 3000,
            default: 1500,
        }
    }
}

impl CapConfig {
    /// Requested cap clamped into `[min, max]`; `None` means the default.
    /// Swapped bounds are read in order rather than trusted.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        let lo = self.min.min(self.max).max(1);
        let hi = self.min.max(self.max).max(lo);
        requested.unwrap_or(self.default).max(lo).min(hi)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub freshness_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub histogram_bins: usize,
    pub top_n: usize,
    pub top_metric: EngagementMetric,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            histogram_bins: crate::aggregate::DEFAULT_HISTOGRAM_BINS,
            top_n: 10,
            top_metric: EngagementMetric::Likes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub backend: TopicBackend,
    pub topics: usize,
    pub keywords: usize,
    pub min_documents: usize,
    pub min_df: usize,
    /// Share of documents; values outside (0, 1] disable the bound.
    pub max_df: f64,
    pub max_iter: usize,
    pub seed: u64,
    pub extra_stopwords: Vec<String>,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            backend: TopicBackend::Nmf,
            topics: 5,
            keywords: 10,
            min_documents: crate::topics::MIN_DOCUMENTS,
            min_df: 2,
            max_df: 0.9,
            max_iter: 200,
            seed: 42,
            extra_stopwords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub source: SourceConfig,
    pub window: WindowConfig,
    pub cap: CapConfig,
    pub cache: CacheConfig,
    pub analytics: AnalyticsConfig,
    pub topics: TopicsConfig,
}

impl InsightsConfig {
    /// Load from an explicit path (TOML or JSON by extension, content sniffed otherwise).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse(&content, &ext)?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $INSIGHTS_CONFIG_PATH
    /// 2) config/insights.toml
    /// 3) config/insights.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let toml_p = PathBuf::from("config/insights.toml");
            let json_p = PathBuf::from("config/insights.json");
            if toml_p.exists() {
                Self::load_from(&toml_p)?
            } else if json_p.exists() {
                Self::load_from(&json_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg.sanitized())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_SOURCE_URL) {
            if !url.trim().is_empty() {
                self.source.base_url = url.trim().to_string();
            }
        }
        if let Ok(author) = std::env::var(ENV_AUTHOR) {
            if !author.trim().is_empty() {
                self.source.author = author.trim().to_string();
            }
        }
        self.source.token = std::env::var(ENV_SOURCE_TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if let Some(secs) = std::env::var(ENV_FRESHNESS_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.cache.freshness_secs = secs;
        }
    }

    /// Repair inconsistent values instead of failing on them.
    pub fn sanitized(mut self) -> Self {
        let author = self.source.author.trim().trim_start_matches('@').to_string();
        self.source.author = if author.is_empty() {
            SourceConfig::default().author
        } else {
            author
        };
        if self.source.request_timeout_secs == 0 {
            self.source.request_timeout_secs = SourceConfig::default().request_timeout_secs;
        }
        if self.source.run_timeout_secs < self.source.request_timeout_secs {
            self.source.run_timeout_secs =
                self.source.request_timeout_secs.saturating_mul(RUN_TIMEOUT_FACTOR);
        }
        if self.source.max_pages == 0 {
            self.source.max_pages = SourceConfig::default().max_pages;
        }
        if self.source.page_size == 0 {
            self.source.page_size = SourceConfig::default().page_size;
        }

        if self.cap.min == 0 {
            self.cap.min = 1;
        }
        if self.cap.min > self.cap.max {
            std::mem::swap(&mut self.cap.min, &mut self.cap.max);
        }
        self.cap.default = self.cap.default.clamp(self.cap.min, self.cap.max);

        if self.cache.freshness_secs == 0 {
            self.cache.freshness_secs = CacheConfig::default().freshness_secs;
        }
        if self.analytics.histogram_bins == 0 {
            self.analytics.histogram_bins = AnalyticsConfig::default().histogram_bins;
        }

        let td = TopicsConfig::default();
        if self.topics.topics == 0 {
            self.topics.topics = td.topics;
        }
        if self.topics.keywords == 0 {
            self.topics.keywords = td.keywords;
        }
        if self.topics.min_documents == 0 {
            self.topics.min_documents = td.min_documents;
        }
        if self.topics.max_iter == 0 {
            self.topics.max_iter = td.max_iter;
        }
        self
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.cache.freshness_secs)
    }

    /// Per-request bound handed to the HTTP client.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.request_timeout_secs)
    }

    /// Bound on the whole ingestion run, all pages included.
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.source.run_timeout_secs)
    }

    pub fn analytics_settings(&self) -> AnalyticsSettings {
        AnalyticsSettings {
            histogram_bins: self.analytics.histogram_bins,
            top_n: self.analytics.top_n,
            top_metric: self.analytics.top_metric,
            topics: self.topics.topics,
            keywords: self.topics.keywords,
        }
    }

    pub fn topic_extractor(&self) -> TopicExtractor {
        let t = &self.topics;
        let max_df = (t.max_df > 0.0 && t.max_df <= 1.0).then_some(t.max_df);
        TopicExtractor::with_settings(
            t.backend.model(t.max_iter, t.seed),
            t.min_documents,
            VectorizerSettings {
                min_df: t.min_df,
                max_df,
                extra_stopwords: t.extra_stopwords.clone(),
            },
        )
    }
}

fn parse(s: &str, hint_ext: &str) -> Result<InsightsConfig> {
    match hint_ext {
        "toml" => toml::from_str(s).context("parsing toml config"),
        "json" => serde_json::from_str(s).context("parsing json config"),
        _ => serde_json::from_str(s)
            .or_else(|_| toml::from_str(s))
            .map_err(|_| anyhow!("unsupported config format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = r#"
            [source]
            author = "@nasa"
            ordering = "unordered"

            [topics]
            backend = "lda"
        "#;
        let cfg = parse(s, "toml").unwrap().sanitized();
        assert_eq!(cfg.source.author, "nasa");
        assert_eq!(cfg.source.ordering, SourceOrdering::Unordered);
        assert_eq!(cfg.topics.backend, TopicBackend::Lda);
        assert_eq!(cfg.cap.default, 1500);
        assert_eq!(cfg.cache.freshness_secs, 1800);
        assert_eq!(cfg.window.lookback_days, 182);
    }

    #[test]
    fn swapped_cap_bounds_are_repaired() {
        let s = r#"{ "cap": { "min": 3000, "max": 200, "default": 9999 } }"#;
        let cfg = parse(s, "json").unwrap().sanitized();
        assert_eq!((cfg.cap.min, cfg.cap.max, cfg.cap.default), (200, 3000, 3000));
        assert_eq!(cfg.cap.resolve(Some(50)), 200);
        assert_eq!(cfg.cap.resolve(None), 3000);
    }

    #[test]
    fn resolve_tolerates_unsanitized_bounds() {
        let caps = CapConfig {
            min: 3000,
            max: 200,
            default: 1500,
        };
        assert_eq!(caps.resolve(Some(50)), 200);
        assert_eq!(caps.resolve(Some(9999)), 3000);
        assert_eq!(caps.resolve(None), 1500);

        let zero = CapConfig {
            min: 0,
            max: 0,
            default: 0,
        };
        assert_eq!(zero.resolve(None), 1);
    }

    #[test]
    fn run_timeout_covers_many_pages() {
        let cfg = InsightsConfig::default().sanitized();
        assert_eq!(cfg.request_timeout(), Duration::from_secs(20));
        assert_eq!(cfg.run_timeout(), Duration::from_secs(300));

        let s = r#"
            [source]
            timeout_secs = 8
            run_timeout_secs = 3
        "#;
        let cfg = parse(s, "toml").unwrap().sanitized();
        assert_eq!(cfg.source.request_timeout_secs, 8);
        assert_eq!(cfg.source.run_timeout_secs, 8 * RUN_TIMEOUT_FACTOR);

        let s = r#"{ "source": { "request_timeout_secs": 5, "run_timeout_secs": 90 } }"#;
        let cfg = parse(s, "json").unwrap().sanitized();
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.run_timeout(), Duration::from_secs(90));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_AUTHOR);
        env::remove_var(ENV_FRESHNESS_SECS);

        let v = InsightsConfig::load_default().unwrap();
        assert_eq!(v.source.author, "elonmusk");

        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[cache]\nfreshness_secs = 60\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_AUTHOR, "spacex");
        let v2 = InsightsConfig::load_default().unwrap();
        assert_eq!(v2.cache.freshness_secs, 60);
        assert_eq!(v2.source.author, "spacex");

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_AUTHOR);
        env::set_current_dir(&old).unwrap();
    }
}
