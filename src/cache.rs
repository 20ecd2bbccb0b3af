//! # Dataset cache
//! Single-slot, process-wide cache of the last successfully built dataset.
//!
//! States: EMPTY → FRESH → STALE → FRESH, plus a forced refresh from any
//! state. The slot sits behind one async mutex that is held across the
//! whole "check age → rebuild → replace" sequence, so concurrent requests
//! never trigger duplicate rebuilds. Replacement is a whole-entry swap.
//!
//! A failed rebuild never discards an existing entry: the old dataset is
//! served as a degraded response. Only an empty slot surfaces the failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::error::{CacheError, PipelineError};

/// Freshness window used when none is configured.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(30 * 60);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("insights_cache_hits_total", "Requests served from a fresh entry.");
        describe_counter!("insights_rebuilds_total", "Dataset rebuild attempts.");
        describe_counter!("insights_rebuild_failures_total", "Failed rebuild attempts.");
        describe_counter!(
            "insights_degraded_total",
            "Stale entries served after a failed rebuild."
        );
        describe_histogram!("insights_build_ms", "Dataset build time in milliseconds.");
        describe_gauge!("insights_dataset_records", "Records in the cached dataset.");
    });
}

/// Anything that can produce a complete dataset for a cap.
#[async_trait]
pub trait DatasetBuilder: Send + Sync {
    async fn build(&self, cap: usize) -> Result<Dataset, PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServeStatus {
    /// Fresh entry, no rebuild.
    Cached,
    /// Rebuilt for this request.
    Rebuilt,
    /// Rebuild failed; previous entry served.
    Degraded,
}

impl ServeStatus {
    pub fn as_header(&self) -> &'static str {
        match self {
            ServeStatus::Cached => "cached",
            ServeStatus::Rebuilt => "rebuilt",
            ServeStatus::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Served {
    pub dataset: Arc<Dataset>,
    pub last_updated: DateTime<Utc>,
    pub cap: usize,
    pub status: ServeStatus,
    pub degraded_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub state: CacheState,
    pub last_updated: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
    pub records: Option<usize>,
    pub cap: Option<usize>,
}

struct CacheEntry {
    dataset: Arc<Dataset>,
    built_at: DateTime<Utc>,
    built_instant: Instant,
    cap: usize,
}

impl CacheEntry {
    fn serve(&self, status: ServeStatus, degraded_reason: Option<String>) -> Served {
        Served {
            dataset: Arc::clone(&self.dataset),
            last_updated: self.built_at,
            cap: self.cap,
            status,
            degraded_reason,
        }
    }
}

pub struct DatasetCache {
    builder: Arc<dyn DatasetBuilder>,
    freshness: Duration,
    slot: Mutex<Option<CacheEntry>>,
}

impl DatasetCache {
    pub fn new(builder: Arc<dyn DatasetBuilder>, freshness: Duration) -> Self {
        ensure_metrics_described();
        Self {
            builder,
            freshness,
            slot: Mutex::new(None),
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    fn is_fresh(&self, e: &CacheEntry) -> bool {
        e.built_instant.elapsed() < self.freshness
    }

    /// Normal request. A fresh entry built for the same cap is returned
    /// as-is; otherwise a rebuild is attempted, falling back to the old entry.
    pub async fn get(&self, cap: usize) -> Result<Served, CacheError> {
        let mut slot = self.slot.lock().await;
        if let Some(e) = slot.as_ref() {
            if e.cap == cap && self.is_fresh(e) {
                counter!("insights_cache_hits_total").increment(1);
                return Ok(e.serve(ServeStatus::Cached, None));
            }
        }
        let res = self.rebuild_locked(&mut slot, cap).await;
        Self::with_fallback(&slot, res)
    }

    /// Rebuild regardless of age and report the raw outcome. The existing
    /// entry is kept on failure.
    pub async fn refresh(&self, cap: usize) -> Result<Served, PipelineError> {
        let mut slot = self.slot.lock().await;
        self.rebuild_locked(&mut slot, cap).await
    }

    /// Operator-forced rebuild; degrades to the old entry on failure.
    pub async fn force_refresh(&self, cap: usize) -> Result<Served, CacheError> {
        let mut slot = self.slot.lock().await;
        info!(target: "cache", cap, "forced refresh");
        let res = self.rebuild_locked(&mut slot, cap).await;
        Self::with_fallback(&slot, res)
    }

    pub async fn status(&self) -> CacheStatus {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            None => CacheStatus {
                state: CacheState::Empty,
                last_updated: None,
                age_secs: None,
                records: None,
                cap: None,
            },
            Some(e) => CacheStatus {
                state: if self.is_fresh(e) {
                    CacheState::Fresh
                } else {
                    CacheState::Stale
                },
                last_updated: Some(e.built_at),
                age_secs: Some(e.built_instant.elapsed().as_secs()),
                records: Some(e.dataset.len()),
                cap: Some(e.cap),
            },
        }
    }

    pub async fn state(&self) -> CacheState {
        self.status().await.state
    }

    async fn rebuild_locked(
        &self,
        slot: &mut Option<CacheEntry>,
        cap: usize,
    ) -> Result<Served, PipelineError> {
        counter!("insights_rebuilds_total").increment(1);
        let t0 = std::time::Instant::now();

        let res = match self.builder.build(cap).await {
            Ok(ds) if ds.is_empty() => Err(PipelineError::EmptyResult),
            other => other,
        };

        match res {
            Ok(ds) => {
                let records = ds.len();
                let entry = CacheEntry {
                    dataset: Arc::new(ds),
                    built_at: Utc::now(),
                    built_instant: Instant::now(),
                    cap,
                };
                let served = entry.serve(ServeStatus::Rebuilt, None);
                *slot = Some(entry);

                histogram!("insights_build_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                gauge!("insights_dataset_records").set(records as f64);
                info!(target: "cache", cap, records, "dataset rebuilt");
                Ok(served)
            }
            Err(e) => {
                counter!("insights_rebuild_failures_total").increment(1);
                warn!(target: "cache", cap, error = %e, has_entry = slot.is_some(), "rebuild failed");
                Err(e)
            }
        }
    }

    fn with_fallback(
        slot: &Option<CacheEntry>,
        res: Result<Served, PipelineError>,
    ) -> Result<Served, CacheError> {
        match res {
            Ok(s) => Ok(s),
            Err(e) => match slot.as_ref() {
                Some(old) => {
                    counter!("insights_degraded_total").increment(1);
                    warn!(target: "cache", error = %e, "serving stale dataset");
                    Ok(old.serve(ServeStatus::Degraded, Some(e.to_string())))
                }
                None => Err(CacheError::Unavailable(e)),
            },
        }
    }
}
