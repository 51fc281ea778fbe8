// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity Platform blocking functions.
//!
//! `beforeSignIn` receives `{"data": {"jwt": ...}}` signed by the
//! `securetoken` service account and answers with the custom claims to stamp
//! onto the user's ID token. Callers are not authenticated by bearer token;
//! the event JWT itself is the credential.

use super::Callable;
use crate::error::{AppError, Result};
use crate::services::TokenError;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/beforeSignIn", post(before_sign_in))
}

#[derive(Debug, Deserialize)]
pub struct BlockingRequest {
    #[serde(default)]
    pub jwt: String,
}

/// Blocking response setting `customClaims` from the profile level.
fn claims_response(claims: Value) -> Value {
    json!({
        "userRecord": {
            "customClaims": claims,
            "updateMask": "customClaims",
        }
    })
}

async fn before_sign_in(
    State(state): State<Arc<AppState>>,
    Callable(payload): Callable<BlockingRequest>,
) -> Result<Json<Value>> {
    if payload.jwt.is_empty() {
        return Err(AppError::invalid_payload());
    }

    let event = match state.token_verifier.verify_blocking_event(&payload.jwt).await {
        Ok(event) => event,
        Err(TokenError::Invalid(reason)) => {
            tracing::warn!(reason = %reason, "Rejected blocking event");
            return Err(AppError::InvalidToken);
        }
        Err(TokenError::Transient(reason)) => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Blocking event verification unavailable: {}",
                reason
            )));
        }
    };

    let uid = event.user_record.uid;
    match state.db.get_profile(&uid).await? {
        Some(profile) => {
            tracing::info!(uid = %uid, level = ?profile.user_level, "Stamping custom claims");
            Ok(Json(claims_response(profile.user_level.custom_claims())))
        }
        None => {
            tracing::debug!(uid = %uid, "No profile, sign-in left unchanged");
            Ok(Json(json!({})))
        }
    }
}
