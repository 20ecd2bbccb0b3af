//! Dataset: the records of one window plus every view derived from them.
//! Built in one go and never mutated afterwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{self, EngagementMetric, GroupStats, Views};
use crate::ingest::types::Record;
use crate::normalize::normalize;
use crate::topics::{TopicExtractor, TopicStatus, TopicSummary};

/// Number of most recent records exposed as the recent table.
pub const RECENT_ROWS: usize = 25;

#[derive(Debug, Clone)]
pub struct AnalyticsSettings {
    pub histogram_bins: usize,
    pub top_n: usize,
    pub top_metric: EngagementMetric,
    pub topics: usize,
    pub keywords: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            histogram_bins: aggregate::DEFAULT_HISTOGRAM_BINS,
            top_n: 10,
            top_metric: EngagementMetric::Likes,
            topics: 5,
            keywords: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRollup {
    pub topic: usize,
    #[serde(flatten)]
    pub stats: GroupStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicView {
    #[serde(flatten)]
    pub summary: TopicSummary,
    pub rollup: Vec<TopicRollup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub author: String,
    pub window_start: DateTime<Utc>,
    /// Ascending by timestamp.
    pub records: Vec<Record>,
    #[serde(flatten)]
    pub views: Views,
    pub top_metric: EngagementMetric,
    pub top: Vec<Record>,
    pub recent: Vec<Record>,
    pub topics: TopicView,
}

impl Dataset {
    pub fn build(
        author: &str,
        window_start: DateTime<Utc>,
        records: Vec<Record>,
        settings: &AnalyticsSettings,
        extractor: &TopicExtractor,
    ) -> Self {
        let views = aggregate::aggregate(&records, settings.histogram_bins);
        let top = aggregate::top_n(&records, settings.top_metric, settings.top_n);
        let recent = records[records.len().saturating_sub(RECENT_ROWS)..].to_vec();

        let docs: Vec<String> = records.iter().map(|r| normalize(&r.content)).collect();
        let summary = match extractor.extract(&docs, settings.topics, settings.keywords) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "topics", backend = extractor.backend(), error = %e, "topic extraction failed");
                TopicSummary::empty(
                    extractor.backend(),
                    TopicStatus::DecompositionFailed {
                        message: e.to_string(),
                    },
                    docs.len(),
                )
            }
        };
        let rollup = topic_rollup(&records, &summary.assignments);

        Self {
            author: author.to_string(),
            window_start,
            records,
            views,
            top_metric: settings.top_metric,
            top,
            recent,
            topics: TopicView { summary, rollup },
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-topic count, mean length and mean likes over assigned records.
pub fn topic_rollup(records: &[Record], assignments: &[Option<usize>]) -> Vec<TopicRollup> {
    let mut groups: BTreeMap<usize, Vec<&Record>> = BTreeMap::new();
    for (r, a) in records.iter().zip(assignments) {
        if let Some(t) = a {
            groups.entry(*t).or_default().push(r);
        }
    }
    groups
        .into_iter()
        .map(|(topic, rs)| TopicRollup {
            topic,
            stats: aggregate::group_stats(rs),
        })
        .collect()
}
