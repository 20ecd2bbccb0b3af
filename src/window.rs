//! # Window
//! Fixed lookback boundary for ingestion (default 182 days, roughly six months).
//!
//! The cutoff is used twice: as the `since:` filter of the upstream query and
//! as the early-stop condition while paging through results.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Default lookback in days.
pub const LOOKBACK_DAYS: i64 = 182;

/// Lookback duration for a number of days (non-positive values fall back to the default).
pub fn lookback(days: i64) -> Duration {
    let d = if days > 0 { days } else { LOOKBACK_DAYS };
    Duration::days(d)
}

/// Inclusive lower bound of the window: `now - lookback`.
pub fn cutoff(now: DateTime<Utc>, lookback: Duration) -> DateTime<Utc> {
    now - lookback
}

/// Calendar date used in the `since:` part of the upstream query.
pub fn since_date(cutoff: DateTime<Utc>) -> NaiveDate {
    cutoff.date_naive()
}
