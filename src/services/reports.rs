// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental report generation.
//!
//! Every job follows the same shape:
//! 1. Read the bookmark and compute the pending dates
//! 2. Render and upload each date's files (dates run concurrently)
//! 3. Advance the bookmark across the contiguous successful prefix

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{ReportKind, ReportRunSummary, SensorDay, SensorKind};
use crate::services::report_dates::{advance_watermark, backlog_days, pending_report_dates};
use crate::services::report_pdf::{
    render_min_max_report, render_tables, sensor_table, user_log_table,
};
use crate::services::storage::{StorageService, PDF_CONTENT_TYPE};
use crate::time_utils::{day_bounds, format_report_date};
use chrono::{FixedOffset, NaiveDate};
use futures_util::stream::{self, StreamExt};
use std::future::Future;

/// Maximum number of dates processed at once.
const MAX_CONCURRENT_DATES: usize = 8;

const DAILY_REPORTS_DIR: &str = "daily-reports";
const USER_LOGS_DIR: &str = "user-logs";

/// `daily-reports/<sensor>/<date>.pdf`
pub fn sensor_report_path(kind: SensorKind, date: NaiveDate) -> String {
    format!(
        "{}/{}/{}.pdf",
        DAILY_REPORTS_DIR,
        kind.collection(),
        format_report_date(date)
    )
}

/// `daily-reports/<date>.pdf`
pub fn combined_report_path(date: NaiveDate) -> String {
    format!("{}/{}.pdf", DAILY_REPORTS_DIR, format_report_date(date))
}

/// `user-logs/<date>.pdf`
pub fn user_log_report_path(date: NaiveDate) -> String {
    format!("{}/{}.pdf", USER_LOGS_DIR, format_report_date(date))
}

/// Runs report jobs against Firestore and Cloud Storage.
#[derive(Clone)]
pub struct ReportGenerator {
    db: FirestoreDb,
    storage: StorageService,
    offset: FixedOffset,
}

impl ReportGenerator {
    pub fn new(db: FirestoreDb, storage: StorageService, offset: FixedOffset) -> Self {
        Self {
            db,
            storage,
            offset,
        }
    }

    /// Per-sensor min/max reports for the six daily-reported kinds.
    pub async fn run_daily_min_max(&self, today: NaiveDate) -> Result<ReportRunSummary, AppError> {
        self.run(ReportKind::Daily, today, |date| self.min_max_reports_for(date))
            .await
    }

    /// Per-sensor value tables for every kind, plus the combined file.
    pub async fn run_daily_tables(&self, today: NaiveDate) -> Result<ReportRunSummary, AppError> {
        self.run(ReportKind::Daily, today, |date| self.table_reports_for(date))
            .await
    }

    /// One activity-log report per day.
    pub async fn run_user_logs(&self, today: NaiveDate) -> Result<ReportRunSummary, AppError> {
        self.run(ReportKind::UserLogs, today, |date| {
            self.user_log_report_for(date)
        })
        .await
    }

    async fn run<F, Fut>(
        &self,
        kind: ReportKind,
        today: NaiveDate,
        job: F,
    ) -> Result<ReportRunSummary, AppError>
    where
        F: Fn(NaiveDate) -> Fut,
        Fut: Future<Output = Result<Vec<String>, AppError>>,
    {
        let bookmark = self.db.get_report_bookmark(kind).await?;
        let dates = pending_report_dates(&bookmark.last_file_uploaded, today)?;
        let previous = Some(bookmark.last_file_uploaded).filter(|b| !b.is_empty());

        if dates.is_empty() {
            tracing::info!(
                kind = kind.bookmark_id(),
                bookmark = previous.as_deref().unwrap_or("<none>"),
                "Reports up to date"
            );
            return Ok(ReportRunSummary {
                kind,
                dates: Vec::new(),
                files: Vec::new(),
                failed_dates: Vec::new(),
                bookmark: previous,
            });
        }

        tracing::info!(
            kind = kind.bookmark_id(),
            days = backlog_days(&dates),
            first = %format_report_date(dates[0]),
            "Generating reports"
        );

        let job = &job;
        let outcomes: Vec<(NaiveDate, Result<Vec<String>, AppError>)> =
            stream::iter(dates.iter().copied())
                .map(|date| async move { (date, job(date).await) })
                .buffer_unordered(MAX_CONCURRENT_DATES)
                .collect()
                .await;

        let (mut summary, watermark) = summarize(kind, &dates, outcomes);
        summary.bookmark = previous;

        if let Some(date) = watermark {
            if self.db.advance_report_bookmark(kind, date).await? {
                summary.bookmark = Some(format_report_date(date));
            }
        }

        if summary.is_complete_success() {
            tracing::info!(
                kind = kind.bookmark_id(),
                files = summary.files.len(),
                "Report run complete"
            );
        } else {
            tracing::warn!(
                kind = kind.bookmark_id(),
                failed = ?summary.failed_dates,
                "Report run finished with failures"
            );
        }

        Ok(summary)
    }

    async fn sensor_day(&self, kind: SensorKind, date: NaiveDate) -> Result<SensorDay, AppError> {
        let (start, end) = day_bounds(date, &self.offset);
        let readings = self.db.readings_between(kind, start, end).await?;
        Ok(SensorDay { kind, readings })
    }

    async fn min_max_reports_for(&self, date: NaiveDate) -> Result<Vec<String>, AppError> {
        let label = format_report_date(date);
        let mut files = Vec::new();

        for kind in SensorKind::DAILY_REPORTED {
            let day = self.sensor_day(kind, date).await?;
            if day.readings.is_empty() {
                tracing::debug!(sensor = kind.collection(), date = %label, "No readings");
                continue;
            }

            let bytes = render_min_max_report(&day, &label, &self.offset)?;
            let path = sensor_report_path(kind, date);
            self.storage.upload(&path, PDF_CONTENT_TYPE, bytes).await?;
            files.push(path);
        }

        Ok(files)
    }

    async fn table_reports_for(&self, date: NaiveDate) -> Result<Vec<String>, AppError> {
        let label = format_report_date(date);
        let mut files = Vec::new();
        let mut tables = Vec::with_capacity(SensorKind::ALL.len());

        for kind in SensorKind::ALL {
            let day = self.sensor_day(kind, date).await?;
            let table = sensor_table(&day, &label, &self.offset);

            if !day.readings.is_empty() {
                let bytes = render_tables(kind.label(), &label, std::slice::from_ref(&table))?;
                let path = sensor_report_path(kind, date);
                self.storage.upload(&path, PDF_CONTENT_TYPE, bytes).await?;
                files.push(path);
            }
            tables.push(table);
        }

        // The combined file lists every kind, but only for days with any data.
        if !files.is_empty() {
            let bytes = render_tables(&format!("Daily Report {label}"), &label, &tables)?;
            let path = combined_report_path(date);
            self.storage.upload(&path, PDF_CONTENT_TYPE, bytes).await?;
            files.push(path);
        }

        Ok(files)
    }

    async fn user_log_report_for(&self, date: NaiveDate) -> Result<Vec<String>, AppError> {
        let (start, end) = day_bounds(date, &self.offset);
        let entries = self.db.user_logs_between(start, end).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let label = format_report_date(date);
        let table = user_log_table(&entries, &label);
        let bytes = render_tables(&format!("User Logs {label}"), &label, &[table])?;
        let path = user_log_report_path(date);
        self.storage.upload(&path, PDF_CONTENT_TYPE, bytes).await?;
        Ok(vec![path])
    }
}

/// Fold per-date outcomes (in completion order) into a summary and the date
/// the bookmark may advance to.
fn summarize(
    kind: ReportKind,
    dates: &[NaiveDate],
    mut outcomes: Vec<(NaiveDate, Result<Vec<String>, AppError>)>,
) -> (ReportRunSummary, Option<NaiveDate>) {
    outcomes.sort_by_key(|(date, _)| *date);

    let mut files = Vec::new();
    let mut failed_dates = Vec::new();
    let mut succeeded = Vec::with_capacity(dates.len());

    for date in dates {
        match outcomes.iter_mut().find(|(d, _)| d == date) {
            Some((_, Ok(written))) => {
                files.append(written);
                succeeded.push(true);
            }
            Some((_, Err(e))) => {
                tracing::error!(
                    kind = kind.bookmark_id(),
                    date = %format_report_date(*date),
                    error = %e,
                    "Report date failed"
                );
                failed_dates.push(format_report_date(*date));
                succeeded.push(false);
            }
            None => {
                failed_dates.push(format_report_date(*date));
                succeeded.push(false);
            }
        }
    }

    let summary = ReportRunSummary {
        kind,
        dates: dates.iter().map(|d| format_report_date(*d)).collect(),
        files,
        failed_dates,
        bookmark: None,
    };

    (summary, advance_watermark(dates, &succeeded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn report_paths_use_unpadded_dates() {
        assert_eq!(
            sensor_report_path(SensorKind::PhLevel, d(5)),
            "daily-reports/ph_level/2024-1-5.pdf"
        );
        assert_eq!(combined_report_path(d(5)), "daily-reports/2024-1-5.pdf");
        assert_eq!(user_log_report_path(d(12)), "user-logs/2024-1-12.pdf");
    }

    #[test]
    fn summarize_orders_by_date_and_stops_watermark() {
        let dates = [d(1), d(2), d(3)];
        let outcomes = vec![
            (d(3), Ok(vec!["c.pdf".to_string()])),
            (d(1), Ok(vec!["a.pdf".to_string()])),
            (d(2), Err(AppError::Storage("boom".to_string()))),
        ];

        let (summary, watermark) = summarize(ReportKind::Daily, &dates, outcomes);

        assert_eq!(watermark, Some(d(1)));
        assert_eq!(summary.files, vec!["a.pdf", "c.pdf"]);
        assert_eq!(summary.failed_dates, vec!["2024-1-2"]);
        assert_eq!(summary.dates, vec!["2024-1-1", "2024-1-2", "2024-1-3"]);
        assert!(!summary.is_complete_success());
    }

    #[test]
    fn summarize_full_success_advances_to_last_date() {
        let dates = [d(1), d(2)];
        let outcomes = vec![(d(2), Ok(Vec::new())), (d(1), Ok(Vec::new()))];

        let (summary, watermark) = summarize(ReportKind::UserLogs, &dates, outcomes);

        assert_eq!(watermark, Some(d(2)));
        assert!(summary.is_complete_success());
        assert!(summary.files.is_empty());
    }

    #[tokio::test]
    async fn offline_run_fails_before_rendering() {
        let storage = StorageService::new_mock("bucket");
        let generator = ReportGenerator::new(
            FirestoreDb::new_mock(),
            storage.clone(),
            FixedOffset::east_opt(0).unwrap(),
        );

        let result = generator.run_user_logs(d(10)).await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(storage.mock_paths().is_empty());
    }
}
