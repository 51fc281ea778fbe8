// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.
//!
//! Every handler except `/health` and `/beforeSignIn` speaks the Firebase
//! callable protocol: `POST /<name>` with `{"data": ...}`, answered with
//! `{"result": ...}` or an `{"error": ...}` envelope.

pub mod accounts;
pub mod hooks;
pub mod logs;
pub mod reports;
pub mod sensors;

use crate::error::AppError;
use crate::middleware::auth::{enforce_policy, identify_caller, AuthPolicy};
use crate::AppState;
use axum::extract::{FromRequest, Request};
use axum::handler::Handler;
use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, MethodRouter};
use axum::{middleware, routing::get, Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Raw callable request envelope.
#[derive(Deserialize)]
struct CallableRequest {
    #[serde(default)]
    data: serde_json::Value,
}

/// Extractor for the `data` member of a callable request.
///
/// A `null` or absent `data` is treated as `{}` so payload types made of
/// optional fields accept it. Malformed JSON or a payload of the wrong shape
/// is rejected with `INVALID_ARGUMENT`.
pub struct Callable<T>(pub T);

impl<S, T> FromRequest<S> for Callable<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(envelope) = Json::<CallableRequest>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(error = %rejection, "Rejected callable envelope");
                AppError::invalid_payload()
            })?;

        let data = match envelope.data {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other,
        };

        serde_json::from_value(data).map(Callable).map_err(|e| {
            tracing::debug!(error = %e, "Rejected callable payload");
            AppError::invalid_payload()
        })
    }
}

/// Successful callable response: `{"result": ...}`.
pub struct CallResult<T>(pub T);

#[derive(Serialize)]
struct ResultEnvelope<T> {
    result: T,
}

impl<T: Serialize> IntoResponse for CallResult<T> {
    fn into_response(self) -> Response {
        Json(ResultEnvelope { result: self.0 }).into_response()
    }
}

/// `POST` route guarded by `policy`.
///
/// The policy runs as a route layer, so unauthorized callers are rejected
/// before the payload is parsed.
pub(crate) fn callable<H, T>(handler: H, policy: AuthPolicy) -> MethodRouter<Arc<AppState>>
where
    H: Handler<T, Arc<AppState>>,
    T: 'static,
{
    post(handler).route_layer(middleware::from_fn_with_state(policy, enforce_policy))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Callable routes; each declares its own AuthPolicy
    let callable_routes = Router::new()
        .merge(accounts::routes())
        .merge(sensors::routes())
        .merge(logs::routes())
        .merge(reports::routes())
        .layer(middleware::from_fn_with_state(state.clone(), identify_caller));

    Router::new()
        .route("/health", get(health_check))
        .merge(hooks::routes())
        .merge(callable_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
