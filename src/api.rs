use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregate::{self, EngagementMetric};
use crate::cache::{CacheStatus, DatasetCache, Served, ServeStatus};
use crate::config::CapConfig;
use crate::dataset::Dataset;
use crate::error::CacheError;
use crate::ingest::types::Record;

pub const DATA_STATUS_HEADER: &str = "x-data-status";

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<DatasetCache>,
    pub caps: CapConfig,
    pub top_n: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/insights", get(insights))
        .route("/api/refresh", post(force_refresh))
        .route("/api/status", get(status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct InsightsQuery {
    max_tweets: Option<usize>,
    #[serde(default)]
    refresh: bool,
    top_by: Option<String>,
    top_n: Option<usize>,
}

#[derive(Serialize)]
struct InsightsResp<'a> {
    last_updated: DateTime<Utc>,
    status: ServeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    degraded_reason: Option<String>,
    cap: usize,
    top_by: EngagementMetric,
    top: Vec<Record>,
    dataset: &'a Dataset,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

enum ApiError {
    Unavailable(CacheError),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, body) = match self {
            ApiError::Unavailable(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error: "unavailable",
                    message: e.to_string(),
                },
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_parameter",
                    message,
                },
            ),
        };
        (code, Json(body)).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl InsightsQuery {
    fn metric(&self) -> Result<Option<EngagementMetric>, ApiError> {
        self.top_by
            .as_deref()
            .map(|s| {
                EngagementMetric::parse(s)
                    .ok_or_else(|| ApiError::BadRequest(format!("unknown top_by metric '{s}'")))
            })
            .transpose()
    }
}

fn render(
    served: Served,
    metric: Option<EngagementMetric>,
    q: &InsightsQuery,
    state: &AppState,
) -> Response {
    let metric = metric.unwrap_or(served.dataset.top_metric);
    let n = q.top_n.unwrap_or(state.top_n);
    let top = aggregate::top_n(&served.dataset.records, metric, n);

    let body = InsightsResp {
        last_updated: served.last_updated,
        status: served.status,
        degraded_reason: served.degraded_reason.clone(),
        cap: served.cap,
        top_by: metric,
        top,
        dataset: &served.dataset,
    };
    let mut resp = Json(body).into_response();
    resp.headers_mut().insert(
        DATA_STATUS_HEADER,
        HeaderValue::from_static(served.status.as_header()),
    );
    resp
}

async fn insights(
    State(state): State<AppState>,
    query: Result<Query<InsightsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let metric = q.metric()?;
    let cap = state.caps.resolve(q.max_tweets);
    let served = if q.refresh {
        state.cache.force_refresh(cap).await
    } else {
        state.cache.get(cap).await
    }
    .map_err(ApiError::Unavailable)?;
    Ok(render(served, metric, &q, &state))
}

async fn force_refresh(
    State(state): State<AppState>,
    query: Result<Query<InsightsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let metric = q.metric()?;
    let cap = state.caps.resolve(q.max_tweets);
    let served = state
        .cache
        .force_refresh(cap)
        .await
        .map_err(ApiError::Unavailable)?;
    Ok(render(served, metric, &q, &state))
}

async fn status(State(state): State<AppState>) -> Json<CacheStatus> {
    Json(state.cache.status().await)
}
