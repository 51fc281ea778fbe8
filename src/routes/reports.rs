// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report generation triggers.

use super::{callable, CallResult};
use crate::error::Result;
use crate::middleware::auth::AuthPolicy;
use crate::models::ReportRunSummary;
use crate::services::ReportGenerator;
use crate::time_utils::local_date;
use crate::AppState;
use axum::{extract::State, Router};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/generateAllReports",
            callable(generate_all_reports, AuthPolicy::AdminOnly),
        )
        .route(
            "/generateAllReportsV2",
            callable(generate_all_reports_v2, AuthPolicy::AdminOnly),
        )
        .route(
            "/userLogsReportsGeneration",
            callable(generate_user_log_reports, AuthPolicy::AdminOnly),
        )
}

fn generator(state: &AppState) -> (ReportGenerator, NaiveDate) {
    let offset = state.config.report_utc_offset;
    let today = local_date(Utc::now(), &offset);
    (
        ReportGenerator::new(state.db.clone(), state.storage.clone(), offset),
        today,
    )
}

/// Daily tables: one file per sensor with data plus a combined file.
async fn generate_all_reports(
    State(state): State<Arc<AppState>>,
) -> Result<CallResult<ReportRunSummary>> {
    let (generator, today) = generator(&state);
    Ok(CallResult(generator.run_daily_tables(today).await?))
}

/// Daily min/max reports for the six daily-reported sensors.
async fn generate_all_reports_v2(
    State(state): State<Arc<AppState>>,
) -> Result<CallResult<ReportRunSummary>> {
    let (generator, today) = generator(&state);
    Ok(CallResult(generator.run_daily_min_max(today).await?))
}

async fn generate_user_log_reports(
    State(state): State<Arc<AppState>>,
) -> Result<CallResult<ReportRunSummary>> {
    let (generator, today) = generator(&state);
    Ok(CallResult(generator.run_user_logs(today).await?))
}
