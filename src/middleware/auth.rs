// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Caller identification and per-route authorization policies.

use crate::error::AppError;
use crate::services::firebase_auth::{extract_bearer_token, Caller, TokenError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Identity of the request's caller, if it presented a valid ID token.
#[derive(Debug, Clone, Default)]
pub struct CallerContext(pub Option<Caller>);

impl CallerContext {
    /// The authenticated caller, or `UNAUTHENTICATED`.
    pub fn caller(&self) -> Result<&Caller, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthenticated)
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(|c| c.admin)
    }
}

/// Who may invoke a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    Public,
    Authenticated,
    AdminOnly,
}

impl AuthPolicy {
    pub fn authorize(self, context: &CallerContext) -> Result<(), AppError> {
        match self {
            AuthPolicy::Public => Ok(()),
            AuthPolicy::Authenticated => context.caller().map(|_| ()),
            AuthPolicy::AdminOnly if context.is_admin() => Ok(()),
            AuthPolicy::AdminOnly => Err(AppError::admin_only()),
        }
    }
}

/// Middleware that verifies an optional Bearer ID token.
///
/// Requests without an Authorization header continue anonymously; a header
/// carrying an invalid token is rejected with `UNAUTHENTICATED`.
pub async fn identify_caller(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|h| h.to_str().map(str::to_string));

    let context = match auth_header {
        None => CallerContext(None),
        Some(Err(_)) => return Err(AppError::InvalidToken),
        Some(Ok(value)) => {
            let caller = async {
                let token = extract_bearer_token(&value)?;
                state.token_verifier.verify_id_token(token).await
            }
            .await;

            match caller {
                Ok(caller) => CallerContext(Some(caller)),
                Err(TokenError::Invalid(reason)) => {
                    tracing::warn!(reason = %reason, "Rejected ID token");
                    return Err(AppError::InvalidToken);
                }
                Err(TokenError::Transient(reason)) => {
                    return Err(AppError::Internal(anyhow::anyhow!(
                        "ID token verification unavailable: {}",
                        reason
                    )));
                }
            }
        }
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Route-level middleware enforcing an [`AuthPolicy`] before the handler
/// (and its payload extractors) run.
pub async fn enforce_policy(
    State(policy): State<AuthPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let context = request
        .extensions()
        .get::<CallerContext>()
        .cloned()
        .unwrap_or_default();

    match policy.authorize(&context) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::debug!(
                policy = ?policy,
                uid = context.0.as_ref().map(|c| c.uid.as_str()).unwrap_or("<anonymous>"),
                "Caller rejected by policy"
            );
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(admin: Option<bool>) -> CallerContext {
        CallerContext(admin.map(|admin| Caller {
            uid: "uid-1".to_string(),
            email: None,
            admin,
        }))
    }

    #[test]
    fn public_allows_everyone() {
        assert!(AuthPolicy::Public.authorize(&context(None)).is_ok());
        assert!(AuthPolicy::Public.authorize(&context(Some(false))).is_ok());
    }

    #[test]
    fn authenticated_requires_a_caller() {
        assert!(matches!(
            AuthPolicy::Authenticated.authorize(&context(None)),
            Err(AppError::Unauthenticated)
        ));
        assert!(AuthPolicy::Authenticated
            .authorize(&context(Some(false)))
            .is_ok());
    }

    #[test]
    fn admin_only_requires_admin_claim() {
        for ctx in [context(None), context(Some(false))] {
            match AuthPolicy::AdminOnly.authorize(&ctx) {
                Err(AppError::PermissionDenied(msg)) => assert_eq!(msg, "Admin only access!"),
                other => panic!("expected permission denied, got {other:?}"),
            }
        }
        assert!(AuthPolicy::AdminOnly.authorize(&context(Some(true))).is_ok());
    }
}
