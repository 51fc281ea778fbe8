// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! Report paths, bookmarks and displayed reading times use unpadded
//! `Y-M-D` / `Y-M-D H:M:S` forms so they line up with files already in the
//! bucket.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};

/// Format a calendar day as `Y-M-D` without zero padding (e.g. `2024-1-5`).
pub fn format_report_date(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}

/// Parse a bookmark/report date. Accepts `2024-01-05` and `2024-1-5`.
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.trim().splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Format an instant as `Y-M-D H:M:S` (unpadded) in the given offset.
pub fn format_reading_datetime(instant: DateTime<Utc>, offset: &FixedOffset) -> String {
    let local = instant.with_timezone(offset);
    format!(
        "{}-{}-{} {}:{}:{}",
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute(),
        local.second()
    )
}

/// The calendar day `instant` falls on in the given offset.
pub fn local_date(instant: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    instant.with_timezone(offset).date_naive()
}

/// Inclusive `[00:00:00, 23:59:59]` bounds of a local day, as UTC instants.
pub fn day_bounds(date: NaiveDate, offset: &FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default();
    let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
    (
        local_to_utc(date.and_time(start), offset),
        local_to_utc(date.and_time(end), offset),
    )
}

/// Parse a client-supplied activity datetime.
///
/// Accepts RFC 3339, or a naive `Y-M-D H:M:S` / `Y-M-DTH:M:S` interpreted in
/// the given offset.
pub fn parse_client_datetime(raw: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| local_to_utc(naive, offset))
}

fn local_to_utc(naive: NaiveDateTime, offset: &FixedOffset) -> DateTime<Utc> {
    // Fixed offsets have no gaps or folds, so the mapping is always single.
    match offset.from_local_datetime(&naive).single() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}
