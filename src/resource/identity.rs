//! Identity & Timestamp Policy
//!
//! Resource IDs have the form `<kind>-<name>-<unix seconds>`. Two creates for
//! the same kind and name inside the same second collide; this is an accepted
//! limitation of the ID format.
//!
//! `last_updated` values are RFC 3339 UTC timestamps with a fixed nanosecond
//! fraction, so string order equals time order for values produced here.

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Highest unix second handed out for an ID in this process
static LAST_ID_SECS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Highest timestamp (nanoseconds since epoch) handed out in this process
static LAST_STAMP_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Fallback used when the instance name sanitizes to nothing
const UNNAMED: &str = "unnamed";

/// Generate a resource ID for a new instance of `kind`
pub fn generate_id(kind: &str, name: &str) -> String {
    format!("{}-{}-{}", kind, sanitize_name(name), next_id_seconds())
}

/// Replace characters that are unsafe in an ID segment with `-`
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if sanitized.is_empty() {
        UNNAMED.to_string()
    } else {
        sanitized
    }
}

/// Current unix second, never lower than a value returned earlier
fn next_id_seconds() -> i64 {
    let now = Utc::now().timestamp();
    let prev = LAST_ID_SECS.fetch_max(now, Ordering::SeqCst);
    prev.max(now)
}

/// Current time as a `last_updated` string. Strictly increasing per process.
pub fn timestamp() -> String {
    format_nanos(next_stamp_nanos())
}

/// A timestamp strictly later than `prev`.
///
/// `prev` may come from stored state written by another process; if it does
/// not parse, this is the same as [`timestamp`]. A `prev` ahead of the local
/// clock only affects the returned value, never later calls.
pub fn timestamp_after(prev: Option<&str>) -> String {
    let now = Utc.timestamp_nanos(next_stamp_nanos());
    let stamp = match prev.and_then(parse_timestamp) {
        Some(prev) if prev >= now => prev
            .checked_add_signed(Duration::nanoseconds(1))
            .unwrap_or(prev),
        _ => now,
    };
    stamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a `last_updated` value
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Current time in nanoseconds, strictly above anything issued before
fn next_stamp_nanos() -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let mut issued = now;
    let _ = LAST_STAMP_NANOS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        issued = now.max(last.saturating_add(1));
        Some(issued)
    });
    issued
}

fn format_nanos(nanos: i64) -> String {
    Utc.timestamp_nanos(nanos).to_rfc3339_opts(SecondsFormat::Nanos, true)
}
