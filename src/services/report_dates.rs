// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Watermark arithmetic for incremental report runs.

use crate::error::AppError;
use crate::time_utils::parse_report_date;
use chrono::NaiveDate;

/// Calendar days still to be reported, oldest first.
///
/// An empty bookmark starts at yesterday, otherwise at the day after the
/// bookmark. `today` is never included since its data is still incomplete.
pub fn pending_report_dates(bookmark: &str, today: NaiveDate) -> Result<Vec<NaiveDate>, AppError> {
    let bookmark = bookmark.trim();

    let start = if bookmark.is_empty() {
        today.pred_opt()
    } else {
        let last = parse_report_date(bookmark)
            .ok_or_else(|| AppError::Report(format!("Invalid report bookmark: {bookmark:?}")))?;
        last.succ_opt()
    };

    let Some(start) = start else {
        return Ok(Vec::new());
    };

    Ok(start
        .iter_days()
        .take_while(|date| *date < today)
        .collect())
}

/// Last date of the contiguous successful prefix of `dates`.
///
/// `dates` and `succeeded` are parallel slices. Returns `None` when the first
/// date failed (or there are no dates), leaving the bookmark where it was.
pub fn advance_watermark(dates: &[NaiveDate], succeeded: &[bool]) -> Option<NaiveDate> {
    dates
        .iter()
        .zip(succeeded)
        .take_while(|(_, ok)| **ok)
        .map(|(date, _)| *date)
        .last()
}

/// Calendar days spanned by a pending range, for logging.
pub fn backlog_days(dates: &[NaiveDate]) -> u64 {
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (*last - *first).num_days().unsigned_abs() + 1,
        _ => 0,
    }
}
