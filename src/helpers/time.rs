use chrono::{DateTime, Utc};

pub fn now_u64() -> u64 {
    now_i64().max(0) as u64
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// RFC3339 rendering of a unix timestamp, `None` when out of range.
pub fn unix_to_rfc3339(ts: u64) -> Option<String> {
    i64::try_from(ts)
        .ok()
        .and_then(DateTime::from_timestamp_secs)
        .map(|dt| dt.to_rfc3339())
}
