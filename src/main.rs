//! Tweet insights service binary entrypoint.
//! Boots the Axum HTTP server with the configured source, pipeline and cache.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tweet_insights::config::InsightsConfig;
use tweet_insights::metrics::Metrics;

/// Compact logs by default, JSON when `INSIGHTS_LOG_JSON=1`.
/// A subscriber installed by the runtime takes precedence.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tweet_insights=info,warn"));
    let json = std::env::var("INSIGHTS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = InsightsConfig::load_default()?;
    tracing::info!(
        author = %cfg.source.author,
        source = ?cfg.source.kind,
        ordering = ?cfg.source.ordering,
        backend = ?cfg.topics.backend,
        freshness_secs = cfg.cache.freshness_secs,
        "config loaded"
    );

    let source = tweet_insights::build_source(&cfg)?;
    let metrics = Metrics::init(cfg.cache.freshness_secs)?;
    let router = tweet_insights::app_with_source(&cfg, source).merge(metrics.router());

    Ok(router.into())
}
