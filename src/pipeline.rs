//! Window → ingest → dataset, as one `DatasetBuilder`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cache::DatasetBuilder;
use crate::config::InsightsConfig;
use crate::dataset::{AnalyticsSettings, Dataset};
use crate::error::PipelineError;
use crate::ingest::types::{PostSource, SearchQuery};
use crate::ingest::{self, IngestOptions, SourceOrdering};
use crate::topics::TopicExtractor;
use crate::window;

pub struct InsightsPipeline {
    source: Arc<dyn PostSource>,
    author: String,
    lookback: chrono::Duration,
    ordering: SourceOrdering,
    max_pages: usize,
    run_timeout: Duration,
    analytics: AnalyticsSettings,
    extractor: Arc<TopicExtractor>,
}

impl InsightsPipeline {
    pub fn from_config(cfg: &InsightsConfig, source: Arc<dyn PostSource>) -> Self {
        Self {
            source,
            author: cfg.source.author.clone(),
            lookback: window::lookback(cfg.window.lookback_days),
            ordering: cfg.source.ordering,
            max_pages: cfg.source.max_pages,
            run_timeout: cfg.run_timeout(),
            analytics: cfg.analytics_settings(),
            extractor: Arc::new(cfg.topic_extractor()),
        }
    }

    /// Build the dataset as of `now`. The whole ingestion run (every page) is
    /// bounded by the run timeout; running out of time counts as an unavailable
    /// source. Normalizing and topic fitting run on the blocking pool.
    pub async fn build_at(&self, cap: usize, now: DateTime<Utc>) -> Result<Dataset, PipelineError> {
        let cutoff = window::cutoff(now, self.lookback);
        let query = SearchQuery {
            author: self.author.clone(),
            since: window::since_date(cutoff),
        };
        let opts = IngestOptions {
            cap,
            cutoff,
            ordering: self.ordering,
            max_pages: self.max_pages,
        };

        let records = tokio::time::timeout(
            self.run_timeout,
            ingest::fetch(self.source.as_ref(), &query, &opts),
        )
        .await
        .map_err(|_| {
            let secs = self.run_timeout.as_secs();
            tracing::warn!(target: "ingest", timeout_secs = secs, "ingest timed out");
            PipelineError::Timeout(secs)
        })??;

        let author = self.author.clone();
        let analytics = self.analytics.clone();
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || {
            Dataset::build(&author, cutoff, records, &analytics, &extractor)
        })
        .await
        .map_err(|e| {
            tracing::error!(target: "pipeline", error = %e, "dataset build task failed");
            PipelineError::Aborted(e.to_string())
        })
    }
}

#[async_trait]
impl DatasetBuilder for InsightsPipeline {
    async fn build(&self, cap: usize) -> Result<Dataset, PipelineError> {
        self.build_at(cap, Utc::now()).await
    }
}
