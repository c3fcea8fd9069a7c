//! Event id and timestamp generation
//!
//! Ids are derived from the wall clock in milliseconds. When the clock has not
//! moved past the last issued value (two events in the same millisecond, or a
//! backwards clock step) the value is bumped to `last + 1`, so ids are strictly
//! increasing for the lifetime of the process. Under a burst the id value can
//! run ahead of the clock, so it need not match the event's `timestamp`.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Prefix identifying ids minted by this client
pub const ID_PREFIX: &str = "rs";

static LAST_ID: AtomicI64 = AtomicI64::new(0);
static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Identity and creation time assigned to one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub id: String,
    pub timestamp: String,
}

impl Stamp {
    /// Stamp an event at the current time
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Stamp an event at `now`, keeping ids unique and timestamps non-decreasing
    pub fn at(now: DateTime<Utc>) -> Self {
        let now_ms = now.timestamp_millis();

        let previous = LAST_ID
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next_id_value(last, now_ms)))
            .unwrap_or_else(|last| last);
        let id_value = next_id_value(previous, now_ms);

        let timestamp_ms = LAST_TIMESTAMP.fetch_max(now_ms, Ordering::SeqCst).max(now_ms);

        Self {
            id: format!("{}-{}", ID_PREFIX, id_value),
            timestamp: format_timestamp(timestamp_ms),
        }
    }
}

fn next_id_value(last: i64, now_ms: i64) -> i64 {
    if now_ms > last { now_ms } else { last + 1 }
}

/// RFC 3339 with milliseconds and a `Z` designator, e.g. `2025-01-01T00:00:00.000Z`
fn format_timestamp(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
