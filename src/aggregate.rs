//! # Aggregate
//! Descriptive views over an ordered slice of records:
//!
//! - summary scalars (count, length stats, mean engagement, date range)
//! - scatter series (one point per record)
//! - daily / hourly / time-of-day rollups, keyed in UTC
//! - fixed-bin length histogram (bin centers)
//! - top-N by an engagement metric
//!
//! Everything is pure and deterministic for a given input order. An empty
//! slice yields zero/empty views; nothing here panics on degenerate input.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::Record;

/// Default number of histogram bins.
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Engagement counter used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementMetric {
    #[default]
    Likes,
    Retweets,
    Replies,
    Quotes,
    /// Sum of all four counters.
    Engagement,
}

impl EngagementMetric {
    pub fn value(&self, r: &Record) -> u64 {
        match self {
            EngagementMetric::Likes => r.likes,
            EngagementMetric::Retweets => r.retweets,
            EngagementMetric::Replies => r.replies,
            EngagementMetric::Quotes => r.quotes,
            EngagementMetric::Engagement => r.engagement(),
        }
    }

    /// Case-insensitive parse (`likes`, `retweets`, `replies`, `quotes`, `engagement`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "likes" | "like" => Some(Self::Likes),
            "retweets" | "retweet" => Some(Self::Retweets),
            "replies" | "reply" => Some(Self::Replies),
            "quotes" | "quote" => Some(Self::Quotes),
            "engagement" | "total" => Some(Self::Engagement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMeans {
    pub likes: f64,
    pub replies: f64,
    pub retweets: f64,
    pub quotes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub tweet_count: usize,
    pub avg_length: f64,
    pub median_length: f64,
    pub min_length: usize,
    pub max_length: usize,
    pub mean_engagement: EngagementMeans,
    pub first_at: Option<DateTime<Utc>>,
    pub last_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub created_at: DateTime<Utc>,
    pub length: usize,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
}

/// Count, mean length, summed and mean engagement of one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub tweets: usize,
    pub avg_length: f64,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
    pub mean_likes: f64,
    pub mean_engagement: f64,
}

#[derive(Debug, Clone, Default)]
struct Acc {
    n: usize,
    length: u64,
    likes: u64,
    retweets: u64,
    replies: u64,
    quotes: u64,
}

impl Acc {
    fn push(&mut self, r: &Record) {
        self.n += 1;
        self.length += r.length as u64;
        self.likes = self.likes.saturating_add(r.likes);
        self.retweets = self.retweets.saturating_add(r.retweets);
        self.replies = self.replies.saturating_add(r.replies);
        self.quotes = self.quotes.saturating_add(r.quotes);
    }

    fn stats(&self) -> GroupStats {
        let mean = |x: u64| if self.n > 0 { x as f64 / self.n as f64 } else { 0.0 };
        let total = self
            .likes
            .saturating_add(self.retweets)
            .saturating_add(self.replies)
            .saturating_add(self.quotes);
        GroupStats {
            tweets: self.n,
            avg_length: mean(self.length),
            likes: self.likes,
            retweets: self.retweets,
            replies: self.replies,
            quotes: self.quotes,
            mean_likes: mean(self.likes),
            mean_engagement: mean(total),
        }
    }
}

/// Summarize an arbitrary group of records.
pub fn group_stats<'a>(records: impl IntoIterator<Item = &'a Record>) -> GroupStats {
    let mut acc = Acc::default();
    for r in records {
        acc.push(r);
    }
    acc.stats()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRollup {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stats: GroupStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRollup {
    pub hour: u32,
    #[serde(flatten)]
    pub stats: GroupStats,
}

/// Fixed time-of-day buckets over half-open UTC hour ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayPart {
    /// [0, 6)
    #[serde(rename = "Late-Night")]
    LateNight,
    /// [6, 12)
    Morning,
    /// [12, 18)
    Afternoon,
    /// [18, 24)
    Evening,
}

impl DayPart {
    pub const ALL: [DayPart; 4] = [
        DayPart::LateNight,
        DayPart::Morning,
        DayPart::Afternoon,
        DayPart::Evening,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => DayPart::LateNight,
            6..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayPart::LateNight => "Late-Night",
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayRollup {
    pub bucket: DayPart,
    #[serde(flatten)]
    pub stats: GroupStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub center: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bin_width: f64,
    pub bins: Vec<HistogramBin>,
}

/// All descriptive views of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Views {
    pub summary: Summary,
    pub scatter: Vec<ScatterPoint>,
    pub daily: Vec<DailyRollup>,
    pub hourly: Vec<HourlyRollup>,
    pub time_of_day: Vec<TimeOfDayRollup>,
    pub histogram: Histogram,
}

pub fn aggregate(records: &[Record], histogram_bins: usize) -> Views {
    Views {
        summary: summary(records),
        scatter: scatter(records),
        daily: daily(records),
        hourly: hourly(records),
        time_of_day: time_of_day(records),
        histogram: length_histogram(records, histogram_bins),
    }
}

pub fn summary(records: &[Record]) -> Summary {
    if records.is_empty() {
        return Summary::default();
    }
    let n = records.len();
    let mut lengths: Vec<usize> = records.iter().map(|r| r.length).collect();
    lengths.sort_unstable();
    let median = if n % 2 == 1 {
        lengths[n / 2] as f64
    } else {
        (lengths[n / 2 - 1] + lengths[n / 2]) as f64 / 2.0
    };
    let stats = group_stats(records);
    let mean = |x: u64| x as f64 / n as f64;

    Summary {
        tweet_count: n,
        avg_length: stats.avg_length,
        median_length: median,
        min_length: lengths[0],
        max_length: lengths[n - 1],
        mean_engagement: EngagementMeans {
            likes: mean(stats.likes),
            replies: mean(stats.replies),
            retweets: mean(stats.retweets),
            quotes: mean(stats.quotes),
        },
        first_at: records.iter().map(|r| r.created_at).min(),
        last_at: records.iter().map(|r| r.created_at).max(),
    }
}

pub fn scatter(records: &[Record]) -> Vec<ScatterPoint> {
    records
        .iter()
        .map(|r| ScatterPoint {
            created_at: r.created_at,
            length: r.length,
            likes: r.likes,
            retweets: r.retweets,
            replies: r.replies,
            quotes: r.quotes,
        })
        .collect()
}

pub fn daily(records: &[Record]) -> Vec<DailyRollup> {
    let mut groups: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for r in records {
        groups.entry(r.created_at.date_naive()).or_default().push(r);
    }
    groups
        .into_iter()
        .map(|(date, acc)| DailyRollup {
            date,
            stats: acc.stats(),
        })
        .collect()
}

/// Observed hours only, ascending.
pub fn hourly(records: &[Record]) -> Vec<HourlyRollup> {
    let mut groups: BTreeMap<u32, Acc> = BTreeMap::new();
    for r in records {
        groups.entry(r.created_at.hour()).or_default().push(r);
    }
    groups
        .into_iter()
        .map(|(hour, acc)| HourlyRollup {
            hour,
            stats: acc.stats(),
        })
        .collect()
}

/// Always four buckets in day order, zero-filled when unobserved.
pub fn time_of_day(records: &[Record]) -> Vec<TimeOfDayRollup> {
    let mut groups: BTreeMap<DayPart, Acc> =
        DayPart::ALL.iter().map(|p| (*p, Acc::default())).collect();
    for r in records {
        groups
            .entry(DayPart::from_hour(r.created_at.hour()))
            .or_default()
            .push(r);
    }
    groups
        .into_iter()
        .map(|(bucket, acc)| TimeOfDayRollup {
            bucket,
            stats: acc.stats(),
        })
        .collect()
}

/// `bins` equal-width bins spanning the observed [min, max] length.
/// A single distinct length gets a unit-wide span centred on it.
pub fn length_histogram(records: &[Record], bins: usize) -> Histogram {
    let Some(min) = records.iter().map(|r| r.length).min() else {
        return Histogram::default();
    };
    let max = records.iter().map(|r| r.length).max().unwrap_or(min);
    let bins = if bins == 0 { DEFAULT_HISTOGRAM_BINS } else { bins };

    let (lo, hi) = if min == max {
        (min as f64 - 0.5, max as f64 + 0.5)
    } else {
        (min as f64, max as f64)
    };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for r in records {
        let idx = ((r.length as f64 - lo) / width).floor() as usize;
        counts[idx.min(bins - 1)] += 1;
    }

    Histogram {
        bin_width: width,
        bins: counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                center: lo + (i as f64 + 0.5) * width,
                count,
            })
            .collect(),
    }
}

/// Top `n` records by `metric`, descending. Stable: ties keep input
/// (chronological) order.
pub fn top_n(records: &[Record], metric: EngagementMetric, n: usize) -> Vec<Record> {
    let mut ranked: Vec<&Record> = records.iter().collect();
    ranked.sort_by(|a, b| metric.value(b).cmp(&metric.value(a)));
    ranked.into_iter().take(n).cloned().collect()
}
