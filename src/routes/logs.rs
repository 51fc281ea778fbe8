// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User activity log handlers.

use super::{callable, CallResult, Callable};
use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthPolicy, CallerContext};
use crate::models::{UserLogEntry, UserLogResponse};
use crate::services::Caller;
use crate::time_utils::parse_client_datetime;
use crate::AppState;
use axum::{extract::State, Extension, Router};
use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Payload keys stored as entry fields rather than under `details`.
const RESERVED_KEYS: [&str; 5] = ["userId", "email", "activity", "datetime", "timestamp"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/logUserActivity",
            callable(log_user_activity, AuthPolicy::Authenticated),
        )
        .route(
            "/getAllUserLogs",
            callable(get_all_user_logs, AuthPolicy::AdminOnly),
        )
}

/// Build a log entry from a free-form payload.
///
/// `datetime` must parse and `activity` must be a non-empty string; other
/// keys land in `details`. Identity always comes from the caller, never the
/// payload.
fn entry_from_payload(
    caller: &Caller,
    mut payload: Map<String, Value>,
    offset: &FixedOffset,
) -> Result<UserLogEntry> {
    let datetime = match payload.get("datetime") {
        Some(Value::String(raw)) => raw.trim().to_string(),
        _ => return Err(AppError::invalid_payload()),
    };
    let timestamp = parse_client_datetime(&datetime, offset).ok_or_else(|| {
        AppError::InvalidArgument(format!("Unrecognized datetime: {datetime}"))
    })?;

    let activity = match payload.get("activity") {
        Some(Value::String(activity)) if !activity.trim().is_empty() => activity.clone(),
        _ => return Err(AppError::invalid_payload()),
    };

    payload.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));

    Ok(UserLogEntry {
        user_id: caller.uid.clone(),
        email: caller.email.clone().unwrap_or_default(),
        activity,
        datetime,
        timestamp,
        details: payload.into_iter().collect(),
    })
}

/// Append an entry to the activity log.
async fn log_user_activity(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<CallerContext>,
    Callable(payload): Callable<Map<String, Value>>,
) -> Result<CallResult<()>> {
    let caller = context.caller()?;
    let entry = entry_from_payload(caller, payload, &state.config.report_utc_offset)?;

    state.db.add_user_log(&entry).await?;

    tracing::info!(uid = %entry.user_id, activity = %entry.activity, "Activity logged");
    Ok(CallResult(()))
}

#[derive(Debug, Deserialize)]
pub struct LogFilter {
    pub keyword: Option<String>,
    pub date: Option<String>,
}

/// Every log entry, newest first, filtered by `activity` / `datetime` substrings.
async fn get_all_user_logs(
    State(state): State<Arc<AppState>>,
    Callable(filter): Callable<LogFilter>,
) -> Result<CallResult<Vec<UserLogResponse>>> {
    let entries = state.db.list_user_logs().await?;

    let logs: Vec<UserLogResponse> = entries
        .into_iter()
        .filter(|e| e.matches(filter.keyword.as_deref(), filter.date.as_deref()))
        .map(UserLogResponse::from)
        .collect();

    tracing::debug!(count = logs.len(), "Listed user logs");
    Ok(CallResult(logs))
}
