// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod topics;
pub mod window;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::cache::{DatasetBuilder, DatasetCache, ServeStatus};
pub use crate::dataset::Dataset;
pub use crate::error::{CacheError, PipelineError};
pub use crate::ingest::types::Record;
pub use crate::pipeline::InsightsPipeline;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{InsightsConfig, SourceKind};
use crate::ingest::providers::{fixture::FixtureSource, http::HttpSearchSource};
use crate::ingest::types::PostSource;

/// Build the configured upstream source.
pub fn build_source(cfg: &InsightsConfig) -> Result<Arc<dyn PostSource>> {
    Ok(match cfg.source.kind {
        SourceKind::Http => Arc::new(HttpSearchSource::new(
            &cfg.source.base_url,
            cfg.source.token.clone(),
            cfg.request_timeout(),
        )?),
        SourceKind::Fixture => Arc::new(FixtureSource::from_path(
            &cfg.source.fixture_path,
            cfg.source.page_size,
        )?),
    })
}

/// Assemble the API router (without `/metrics`) around `source`.
/// The config is sanitized here too, so hand-built values are safe to pass.
pub fn app_with_source(cfg: &InsightsConfig, source: Arc<dyn PostSource>) -> axum::Router {
    let cfg = &cfg.clone().sanitized();
    let pipeline = InsightsPipeline::from_config(cfg, source);
    let cache = DatasetCache::new(Arc::new(pipeline), cfg.freshness());
    api::router(api::AppState {
        cache: Arc::new(cache),
        caps: cfg.cap.clone(),
        top_n: cfg.analytics.top_n,
    })
}
