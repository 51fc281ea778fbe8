// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running, e.g.
//! `firebase emulators:start --only firestore` with
//! `FIRESTORE_EMULATOR_HOST=localhost:8080`.
//!
//! The emulator may keep state between runs, so every test uses unique
//! document IDs or reads the current state first. Report bookmarks are
//! shared, so tests touching them hold `REPORT_LOCK`.

use aqua_backend::db::FirestoreDb;
use aqua_backend::models::{
    ReportKind, SensorKind, SensorReading, UserLevel, UserLogEntry, UserProfile,
};
use aqua_backend::services::reports::{
    combined_report_path, sensor_report_path, user_log_report_path,
};
use aqua_backend::services::{ReportGenerator, StorageService};
use aqua_backend::time_utils::{format_report_date, parse_report_date};
use chrono::{Days, FixedOffset, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

mod common;
use common::test_db;

/// Unique ID for test isolation.
fn unique_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

static REPORT_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// Latest of the stored bookmark and a floor past any real data.
async fn report_base(db: &FirestoreDb, kind: ReportKind) -> NaiveDate {
    let floor = NaiveDate::from_ymd_opt(2031, 1, 1).unwrap();
    let stored = db.get_report_bookmark(kind).await.unwrap();
    parse_report_date(&stored.last_file_uploaded).map_or(floor, |date| date.max(floor))
}

async fn stored_bookmark(db: &FirestoreDb, kind: ReportKind) -> String {
    db.get_report_bookmark(kind).await.unwrap().last_file_uploaded
}

async fn seed_reading(db: &FirestoreDb, kind: SensorKind, date: NaiveDate, value: &str) {
    let reading = SensorReading {
        value: value.to_string(),
        datetime: Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap()),
    };
    db.add_reading(kind, &reading).await.unwrap();
}

async fn seed_user_log(db: &FirestoreDb, date: NaiveDate) {
    let timestamp = Utc.from_utc_datetime(&date.and_hms_opt(9, 30, 0).unwrap());
    let entry = UserLogEntry {
        user_id: "uid-reports".to_string(),
        email: "grower@example.com".to_string(),
        activity: unique_id("Checked tank"),
        datetime: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        timestamp,
        details: BTreeMap::new(),
    };
    db.add_user_log(&entry).await.unwrap();
}

#[tokio::test]
async fn test_profile_lifecycle() {
    require_emulator!();
    let db = test_db().await;
    let uid = unique_id("uid");

    assert!(db.get_profile(&uid).await.unwrap().is_none());

    let profile = UserProfile {
        name: "Grower".to_string(),
        user_level: UserLevel::Member,
    };
    db.set_profile(&uid, &profile).await.unwrap();

    let promoted = UserProfile {
        name: "ignored".to_string(),
        user_level: UserLevel::Admin,
    };
    db.update_profile_fields(&uid, &promoted, &["userLevel"])
        .await
        .unwrap();

    let stored = db.get_profile(&uid).await.unwrap().unwrap();
    assert_eq!(stored.name, "Grower");
    assert_eq!(stored.user_level, UserLevel::Admin);

    let listed = db.list_profiles().await.unwrap();
    assert!(listed.iter().any(|(id, _)| id == &uid));

    db.delete_profile(&uid).await.unwrap();
    assert!(db.get_profile(&uid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bookmark_only_moves_forward() {
    require_emulator!();
    let _guard = REPORT_LOCK.lock().await;
    let db = test_db().await;
    let kind = ReportKind::Daily;

    let base = report_base(&db, kind).await;
    let next = base + Days::new(2);

    assert!(db.advance_report_bookmark(kind, next).await.unwrap());
    assert!(!db
        .advance_report_bookmark(kind, next - Days::new(1))
        .await
        .unwrap());
    assert!(!db.advance_report_bookmark(kind, next).await.unwrap());

    assert_eq!(stored_bookmark(&db, kind).await, format_report_date(next));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookmark_advances_keep_latest() {
    require_emulator!();
    let _guard = REPORT_LOCK.lock().await;
    let db = test_db().await;
    let kind = ReportKind::UserLogs;

    let mut base = report_base(&db, kind).await;
    for _ in 0..10 {
        let late = base + Days::new(10);
        let early = base + Days::new(5);

        let (late_db, early_db) = (db.clone(), db.clone());
        let late_task =
            tokio::spawn(async move { late_db.advance_report_bookmark(kind, late).await });
        let early_task =
            tokio::spawn(async move { early_db.advance_report_bookmark(kind, early).await });

        assert!(late_task.await.unwrap().unwrap());
        early_task.await.unwrap().unwrap();

        assert_eq!(stored_bookmark(&db, kind).await, format_report_date(late));
        base = late;
    }
}

#[tokio::test]
async fn test_user_logs_by_day() {
    require_emulator!();
    let db = test_db().await;
    let activity = unique_id("Adjusted pH");

    let entry = UserLogEntry {
        user_id: "uid-logs".to_string(),
        email: "grower@example.com".to_string(),
        activity: activity.clone(),
        datetime: "2023-6-1 9:15:00".to_string(),
        timestamp: Utc.with_ymd_and_hms(2023, 6, 1, 9, 15, 0).unwrap(),
        details: BTreeMap::from([("pump".to_string(), serde_json::json!("B"))]),
    };
    db.add_user_log(&entry).await.unwrap();

    let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2023, 6, 1, 23, 59, 59).unwrap();
    let day = db.user_logs_between(start, end).await.unwrap();
    let found = day.iter().find(|e| e.activity == activity).unwrap();
    assert_eq!(found.details["pump"], "B");

    let next_day = db
        .user_logs_between(start + Days::new(1), end + Days::new(1))
        .await
        .unwrap();
    assert!(next_day.iter().all(|e| e.activity != activity));

    let all = db.list_user_logs().await.unwrap();
    assert!(all.iter().any(|e| e.activity == activity));
}

#[tokio::test]
async fn test_reading_queries() {
    require_emulator!();
    let db = test_db().await;

    let count = db.count_readings(SensorKind::SnapA).await.unwrap();
    let page = db.readings_page(SensorKind::SnapA, 0, 5).await.unwrap();
    assert!(page.len() <= 5);
    assert!(page.len() <= count);
    assert!(page.windows(2).all(|w| w[0].datetime >= w[1].datetime));
}

#[tokio::test]
async fn test_scheduler_merge() {
    require_emulator!();
    let db = test_db().await;

    let fields = serde_json::json!({"pumpOn": true, "intervalMinutes": 15});
    let fields = fields.as_object().unwrap();
    db.update_scheduler(&unique_id("pump"), fields).await.unwrap();
}

#[tokio::test]
async fn test_user_log_report_run() {
    require_emulator!();
    let _guard = REPORT_LOCK.lock().await;
    let db = test_db().await;
    let storage = StorageService::new_mock("test-bucket");

    let generator = ReportGenerator::new(db.clone(), storage.clone(), utc());
    let today = Utc::now().date_naive();
    let summary = generator.run_user_logs(today).await.unwrap();

    assert!(summary.is_complete_success());
    assert!(summary.dates.iter().all(|d| d != &format_report_date(today)));
    for path in &summary.files {
        let bytes = storage.mock_object(path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    // Nothing is pending right after a successful run.
    let again = generator.run_user_logs(today).await.unwrap();
    assert!(again.dates.is_empty());
    assert!(again.files.is_empty());
}

#[tokio::test]
async fn test_daily_report_runs_write_files_and_advance() {
    require_emulator!();
    let _guard = REPORT_LOCK.lock().await;
    let db = test_db().await;
    let storage = StorageService::new_mock("test-bucket");
    let generator = ReportGenerator::new(db.clone(), storage.clone(), utc());
    let kind = ReportKind::Daily;

    let day = report_base(&db, kind).await + Days::new(1);
    seed_reading(&db, SensorKind::PhLevel, day, "6.2").await;
    seed_reading(&db, SensorKind::PhLevel, day, "6.8").await;

    let summary = generator.run_daily_min_max(day + Days::new(1)).await.unwrap();

    let label = format_report_date(day);
    assert!(summary.is_complete_success());
    assert_eq!(summary.dates, vec![label.clone()]);
    let min_max = sensor_report_path(SensorKind::PhLevel, day);
    assert!(summary.files.contains(&min_max));
    assert!(storage.mock_object(&min_max).unwrap().starts_with(b"%PDF"));
    assert_eq!(summary.bookmark.as_deref(), Some(label.as_str()));
    assert_eq!(stored_bookmark(&db, kind).await, label);

    // Tables for the next day: the per-sensor file plus the combined file.
    let next = day + Days::new(1);
    seed_reading(&db, SensorKind::SnapA, next, "1").await;

    let summary = generator.run_daily_tables(next + Days::new(1)).await.unwrap();

    let label = format_report_date(next);
    assert!(summary.is_complete_success());
    assert_eq!(summary.dates, vec![label.clone()]);
    for path in [
        sensor_report_path(SensorKind::SnapA, next),
        combined_report_path(next),
    ] {
        assert!(summary.files.contains(&path), "{path}");
        assert!(storage.mock_object(&path).unwrap().starts_with(b"%PDF"));
    }
    assert_eq!(stored_bookmark(&db, kind).await, label);
}

#[tokio::test]
async fn test_failed_upload_holds_bookmark_until_retry() {
    require_emulator!();
    let _guard = REPORT_LOCK.lock().await;
    let db = test_db().await;
    let storage = StorageService::new_mock("test-bucket");
    let generator = ReportGenerator::new(db.clone(), storage.clone(), utc());
    let kind = ReportKind::UserLogs;

    let base = report_base(&db, kind).await;
    let days: Vec<NaiveDate> = (1..=3).map(|n| base + Days::new(n)).collect();
    for day in &days {
        seed_user_log(&db, *day).await;
    }
    let today = base + Days::new(4);
    storage.reject_uploads_to(&user_log_report_path(days[1]));

    let summary = generator.run_user_logs(today).await.unwrap();

    assert_eq!(summary.failed_dates, vec![format_report_date(days[1])]);
    assert!(summary.files.contains(&user_log_report_path(days[0])));
    assert!(summary.files.contains(&user_log_report_path(days[2])));
    assert!(storage.mock_object(&user_log_report_path(days[1])).is_none());
    assert_eq!(stored_bookmark(&db, kind).await, format_report_date(days[0]));

    storage.accept_all_uploads();
    let retry = generator.run_user_logs(today).await.unwrap();

    assert!(retry.is_complete_success());
    assert_eq!(
        retry.dates,
        vec![format_report_date(days[1]), format_report_date(days[2])]
    );
    assert!(storage.mock_object(&user_log_report_path(days[1])).is_some());
    assert_eq!(stored_bookmark(&db, kind).await, format_report_date(days[2]));
}
