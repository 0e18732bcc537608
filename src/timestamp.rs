//! Timestamp parsing (C2).
//!
//! Three input shapes are accepted: an ISO-8601 instant (optionally with a
//! `+0000` offset, normalised to `Z`), a decimal string of Unix
//! milliseconds, and the bracketed range literal produced by the historic
//! store: `[Thu Jul 10 22:25:00 UTC 2025,Fri Jul 11 00:00:00 UTC 2025]`.
//! Everything is interpreted in UTC.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

/// Parses an ISO-8601 instant or a decimal Unix-millis string.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(millis) = trimmed.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| anyhow::anyhow!("INVALID_TIMESTAMP: millis out of range: {millis}"));
    }

    // Normalise a bare `+0000` offset the historic store sometimes emits
    // into something `DateTime::parse_from_rfc3339` accepts.
    let normalized = trimmed.replace("+0000", "Z");

    DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow::anyhow!("INVALID_TIMESTAMP: {e}: {raw}"))
}

/// Parses the bracketed range literal `[<departure>,<arrival>]` and returns
/// the duration `arrival - departure` in milliseconds.
///
/// Each half uses the fixed pattern `EEE MMM dd HH:mm:ss zzz yyyy`, e.g.
/// `Thu Jul 10 22:25:00 UTC 2025`. A negative or unparseable result fails
/// with `INVALID_TIMESTAMP`.
pub fn parse_range_duration_ms(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| anyhow::anyhow!("INVALID_TIMESTAMP: missing brackets: {raw}"))?;

    let (departure_raw, arrival_raw) = inner
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("INVALID_TIMESTAMP: missing comma: {raw}"))?;

    let departure = parse_legacy_datetime(departure_raw.trim())?;
    let arrival = parse_legacy_datetime(arrival_raw.trim())?;

    let duration_ms = (arrival - departure).num_milliseconds();
    if duration_ms < 0 {
        bail!("INVALID_TIMESTAMP: arrival precedes departure: {raw}");
    }
    Ok(duration_ms)
}

/// Parses one half of the range literal, e.g. `Thu Jul 10 22:25:00 UTC 2025`.
fn parse_legacy_datetime(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %Z %Y")
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // chrono's %Z only round-trips "UTC" reliably on some builds;
            // fall back to stripping the zone name and assuming UTC.
            let parts: Vec<&str> = raw.split_whitespace().collect();
            if parts.len() == 6 {
                let without_zone = format!(
                    "{} {} {} {} {}",
                    parts[0], parts[1], parts[2], parts[3], parts[5]
                );
                chrono::NaiveDateTime::parse_from_str(&without_zone, "%a %b %d %H:%M:%S %Y")
                    .map(|naive| naive.and_utc())
                    .map_err(|e| anyhow::anyhow!("INVALID_TIMESTAMP: {e}: {raw}"))
            } else {
                Err(anyhow::anyhow!("INVALID_TIMESTAMP: unparseable: {raw}"))
            }
        })
}
