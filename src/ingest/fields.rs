//! # Field lookup
//!
//! Upstream payloads are not consistent about field names (`likeCount`,
//! `like_count`, `public_metrics.like_count`, ...). These helpers take an
//! ordered list of candidate keys and return the first present, non-null
//! value, coerced to the expected type. A value that is present but fails
//! coercion yields `None` rather than falling through to later candidates.
//!
//! Candidate keys may be dotted paths into nested objects.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Resolve a dotted path (`a.b.c`) inside `v`.
fn resolve<'a>(v: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = v;
    for part in path.split('.') {
        cur = cur.get(part)?;
    }
    Some(cur)
}

/// First candidate that is present and not `null`.
pub fn first_present<'a>(v: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|c| resolve(v, c))
        .find(|x| !x.is_null())
}

/// Unsigned integer from a JSON number or numeric string.
pub fn lookup_u64(v: &Value, candidates: &[&str]) -> Option<u64> {
    match first_present(v, candidates)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// String value; numbers are rendered, other shapes are rejected.
pub fn lookup_str(v: &Value, candidates: &[&str]) -> Option<String> {
    match first_present(v, candidates)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Timestamp from RFC 3339, the classic Twitter `created_at` format,
/// a naive `YYYY-MM-DD HH:MM:SS` (taken as UTC) or unix seconds.
pub fn lookup_datetime(v: &Value, candidates: &[&str]) -> Option<DateTime<Utc>> {
    match first_present(v, candidates)? {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // "Wed Oct 10 20:19:24 +0000 2018"
    if let Ok(dt) = DateTime::parse_from_str(s, "%a %b %d %H:%M:%S %z %Y") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|n| Utc.from_utc_datetime(&n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn takes_first_non_null_candidate() {
        let v = json!({ "likeCount": null, "like_count": 7, "favorite_count": 9 });
        assert_eq!(
            lookup_u64(&v, &["likeCount", "like_count", "favorite_count"]),
            Some(7)
        );
    }

    #[test]
    fn dotted_paths_and_numeric_strings() {
        let v = json!({ "id_str": "1234", "public_metrics": { "like_count": 3 } });
        assert_eq!(lookup_u64(&v, &["id", "id_str"]), Some(1234));
        assert_eq!(lookup_u64(&v, &["public_metrics.like_count"]), Some(3));
    }

    #[test]
    fn coercion_failure_is_none() {
        let v = json!({ "id": "abc", "id_str": "5" });
        // present-but-bad does not fall through
        assert_eq!(lookup_u64(&v, &["id", "id_str"]), None);
        assert_eq!(lookup_u64(&json!({ "n": -4 }), &["n"]), None);
        assert_eq!(lookup_str(&json!({ "s": [1] }), &["s"]), None);
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let want = Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap();
        for raw in [
            "2018-10-10T20:19:24Z",
            "2018-10-10T22:19:24+02:00",
            "Wed Oct 10 20:19:24 +0000 2018",
            "2018-10-10 20:19:24+00:00",
            "2018-10-10 20:19:24",
        ] {
            assert_eq!(parse_timestamp(raw), Some(want), "{raw}");
        }
        let v = json!({ "timestamp": 1539202764 });
        assert_eq!(lookup_datetime(&v, &["date", "timestamp"]), Some(want));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
