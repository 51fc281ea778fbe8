use aqua_backend::models::{SensorDay, SensorKind, SensorReading, UserLogEntry};
use aqua_backend::services::report_pdf::{
    render_min_max_report, render_tables, sensor_table, user_log_table,
};
use chrono::{Duration, FixedOffset, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use std::hint::black_box;

/// A day of readings every five minutes, newest first.
fn sensor_day(kind: SensorKind) -> SensorDay {
    let end = Utc.with_ymd_and_hms(2024, 3, 9, 23, 55, 0).unwrap();
    let readings = (0..288)
        .map(|i| SensorReading {
            value: format!("{:.2}", 6.0 + (i % 17) as f64 * 0.05),
            datetime: end - Duration::minutes(5 * i),
        })
        .collect();
    SensorDay { kind, readings }
}

fn user_logs() -> Vec<UserLogEntry> {
    let start = Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
    (0..200)
        .map(|i| UserLogEntry {
            user_id: format!("uid-{}", i % 7),
            email: format!("grower{}@example.com", i % 7),
            activity: format!("Adjusted nutrient pump {} to setting {}", i % 3, i),
            datetime: "2024-3-9 8:00:00".to_string(),
            timestamp: start + Duration::minutes(i),
            details: BTreeMap::new(),
        })
        .collect()
}

fn benchmark_report_rendering(c: &mut Criterion) {
    let offset = FixedOffset::east_opt(0).unwrap();
    let day = sensor_day(SensorKind::PhLevel);
    let all_kinds: Vec<SensorDay> = SensorKind::ALL.iter().map(|&k| sensor_day(k)).collect();
    let logs = user_logs();

    let mut group = c.benchmark_group("report_rendering");

    group.bench_function("min_max_single_sensor", |b| {
        b.iter(|| render_min_max_report(black_box(&day), "2024-3-9", &offset))
    });

    group.bench_function("combined_daily_tables", |b| {
        b.iter(|| {
            let tables: Vec<_> = all_kinds
                .iter()
                .map(|d| sensor_table(black_box(d), "2024-3-9", &offset))
                .collect();
            render_tables("Daily Reports 2024-3-9", "2024-3-9", &tables)
        })
    });

    group.bench_function("user_log_table", |b| {
        b.iter(|| {
            let table = user_log_table(black_box(&logs), "2024-3-9");
            render_tables("User Logs 2024-3-9", "2024-3-9", std::slice::from_ref(&table))
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_report_rendering);
criterion_main!(benches);
