// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account management handlers.
//!
//! Handlers that touch both the auth record and the profile document write
//! them in two calls; if the second call fails the first is undone.

use super::{callable, CallResult, Callable};
use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthPolicy, CallerContext};
use crate::models::{AuthRecordUpdate, UserLevel, UserProfile, UserSummary};
use crate::AppState;
use axum::{extract::State, Extension, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signUp", callable(sign_up, AuthPolicy::AdminOnly))
        .route("/listUsers", callable(list_users, AuthPolicy::AdminOnly))
        .route("/updateUser", callable(update_user, AuthPolicy::AdminOnly))
        .route(
            "/activationAndDeactivationOfUser",
            callable(set_user_disabled, AuthPolicy::AdminOnly),
        )
        .route("/getProfile", callable(get_profile, AuthPolicy::Authenticated))
        .route(
            "/updateUserInfo",
            callable(update_user_info, AuthPolicy::Authenticated),
        )
}

fn validate_payload<T: Validate>(payload: &T) -> Result<()> {
    payload.validate().map_err(|e| {
        tracing::debug!(errors = %e, "Payload failed validation");
        AppError::invalid_payload()
    })
}

/// Treat blank optional strings as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ─── Sign Up ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub user_level: UserLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignUpResponse {
    pub id: String,
    pub email: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub user_level: UserLevel,
    pub name: String,
}

/// Create an auth account and its profile document.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Callable(mut payload): Callable<SignUpRequest>,
) -> Result<CallResult<SignUpResponse>> {
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_string();
    validate_payload(&payload)?;

    let record = state
        .identity
        .create_user(&payload.email, &payload.password)
        .await?;

    let profile = UserProfile {
        name: payload.name,
        user_level: payload.user_level,
    };

    if let Err(e) = state.db.set_profile(&record.uid, &profile).await {
        tracing::error!(uid = %record.uid, error = %e, "Profile write failed, removing auth account");
        if let Err(cleanup) = state.identity.delete_user(&record.uid).await {
            tracing::error!(uid = %record.uid, error = %cleanup, "Failed to remove orphaned auth account");
        }
        return Err(e);
    }

    tracing::info!(uid = %record.uid, level = ?profile.user_level, "User signed up");

    Ok(CallResult(SignUpResponse {
        id: record.uid,
        email: payload.email,
        user_level: profile.user_level,
        name: profile.name,
    }))
}

// ─── List Users ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserSummary>,
}

/// Every auth account joined with its profile.
async fn list_users(State(state): State<Arc<AppState>>) -> Result<CallResult<ListUsersResponse>> {
    let (records, profiles) =
        tokio::try_join!(state.identity.list_users(), state.db.list_profiles())?;

    let profiles: HashMap<String, UserProfile> = profiles.into_iter().collect();
    let users = records
        .into_iter()
        .map(|record| {
            let profile = profiles.get(&record.uid);
            UserSummary::join(record, profile)
        })
        .collect();

    Ok(CallResult(ListUsersResponse { users }))
}

// ─── Update User ─────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
    pub name: Option<String>,
    pub user_level: Option<UserLevel>,
}

/// Admin update of another user's profile and credentials.
async fn update_user(
    State(state): State<Arc<AppState>>,
    Callable(payload): Callable<UpdateUserRequest>,
) -> Result<CallResult<&'static str>> {
    let id = non_blank(payload.id.clone()).ok_or_else(AppError::invalid_payload)?;
    validate_payload(&payload)?;

    let name = non_blank(payload.name);
    let mut fields = Vec::new();
    if name.is_some() {
        fields.push("name");
    }
    if payload.user_level.is_some() {
        fields.push("userLevel");
    }

    // Profile first; remember what was there so it can be put back.
    let previous = if fields.is_empty() {
        None
    } else {
        let previous = state.db.get_profile(&id).await?;
        let updated = UserProfile {
            name: name.unwrap_or_default(),
            user_level: payload.user_level.unwrap_or_default(),
        };
        state.db.update_profile_fields(&id, &updated, &fields).await?;
        Some(previous)
    };

    let mut credentials = AuthRecordUpdate {
        password: payload.password,
        ..Default::default()
    };
    if let Some(email) = non_blank(payload.email) {
        credentials = credentials.with_email(email);
    }

    if let Err(e) = state.identity.update_user(&id, &credentials).await {
        if let Some(previous) = previous {
            restore_profile(&state, &id, previous).await;
        }
        return Err(e);
    }

    tracing::info!(uid = %id, profile_fields = ?fields, "User updated");
    Ok(CallResult("Update user completed!"))
}

async fn restore_profile(state: &AppState, uid: &str, previous: Option<UserProfile>) {
    let restored = match &previous {
        Some(profile) => state.db.set_profile(uid, profile).await,
        None => state.db.delete_profile(uid).await,
    };

    match restored {
        Ok(()) => tracing::warn!(uid = uid, "Credentials update failed, profile restored"),
        Err(e) => tracing::error!(uid = uid, error = %e, "Failed to restore profile"),
    }
}

// ─── Activation ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActivationRequest {
    pub id: Option<String>,
    #[serde(default)]
    pub disable: bool,
}

/// Enable or disable an auth account.
async fn set_user_disabled(
    State(state): State<Arc<AppState>>,
    Callable(payload): Callable<ActivationRequest>,
) -> Result<CallResult<&'static str>> {
    let id = non_blank(payload.id).ok_or_else(AppError::invalid_payload)?;

    let update = AuthRecordUpdate {
        disabled: Some(payload.disable),
        ..Default::default()
    };
    state.identity.update_user(&id, &update).await?;

    tracing::info!(uid = %id, disabled = payload.disable, "User activation changed");

    Ok(CallResult(if payload.disable {
        "User Deactivated!"
    } else {
        "User Activated!"
    }))
}

// ─── Own Profile ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub email: Option<String>,
    pub is_email_verified: bool,
    pub name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub user_level: UserLevel,
}

async fn load_profile(state: &AppState, uid: &str) -> Result<ProfileResponse> {
    let (record, profile) =
        tokio::try_join!(state.identity.get_user(uid), state.db.get_profile(uid))?;

    let record = record.ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
    let profile = profile.unwrap_or(UserProfile {
        name: String::new(),
        user_level: UserLevel::Member,
    });

    Ok(ProfileResponse {
        email: record.email,
        is_email_verified: record.email_verified,
        name: profile.name,
        user_level: profile.user_level,
    })
}

/// The caller's own profile.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<CallerContext>,
) -> Result<CallResult<ProfileResponse>> {
    let caller = context.caller()?;
    Ok(CallResult(load_profile(&state, &caller.uid).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserInfoRequest {
    #[validate(email)]
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Update the caller's own email and/or name.
async fn update_user_info(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<CallerContext>,
    Callable(payload): Callable<UpdateUserInfoRequest>,
) -> Result<CallResult<ProfileResponse>> {
    let caller = context.caller()?;
    validate_payload(&payload)?;

    // Email first: a rejected address leaves the profile untouched.
    if let Some(email) = non_blank(payload.email) {
        let update = AuthRecordUpdate::default().with_email(email);
        state.identity.update_user(&caller.uid, &update).await?;
    }

    if let Some(name) = non_blank(payload.name) {
        // Only `name` is written; the level placeholder is ignored.
        let profile = UserProfile {
            name,
            user_level: UserLevel::Member,
        };
        state
            .db
            .update_profile_fields(&caller.uid, &profile, &["name"])
            .await?;
    }

    Ok(CallResult(load_profile(&state, &caller.uid).await?))
}
