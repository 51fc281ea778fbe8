// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use aqua_backend::config::Config;
use aqua_backend::db::FirestoreDb;
use aqua_backend::routes::create_router;
use aqua_backend::services::{FirebaseTokenVerifier, IdentityService, StorageService};
use aqua_backend::AppState;
use axum::body::Body;
use axum::http::{header, Request};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[allow(dead_code)]
const PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/test_signing_key.pem");
#[allow(dead_code)]
const PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/test_signing_key.pub.pem");
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Verifier that trusts only the fixture key.
#[allow(dead_code)]
pub fn test_verifier(config: &Config) -> FirebaseTokenVerifier {
    FirebaseTokenVerifier::new_with_static_key(
        config,
        TEST_KID,
        DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap(),
    )
    .unwrap()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let token_verifier = Arc::new(test_verifier(&config));
    let storage = StorageService::new_mock(&config.storage_bucket);

    let state = Arc::new(AppState {
        config,
        db: test_db_offline(),
        identity: IdentityService::new_mock(),
        storage,
        token_verifier,
    });

    (create_router(state.clone()), state)
}

#[allow(dead_code)]
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Sign claims with the fixture key.
#[allow(dead_code)]
pub fn sign_test_token(claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap(),
    )
    .unwrap()
}

/// ID token for `uid`, optionally carrying the `admin` claim.
#[allow(dead_code)]
pub fn create_test_id_token(uid: &str, admin: Option<bool>) -> String {
    let now = now_secs();
    let mut claims = serde_json::json!({
        "iss": "https://securetoken.google.com/test-project",
        "aud": "test-project",
        "sub": uid,
        "email": format!("{uid}@example.com"),
        "iat": now,
        "exp": now + 3600,
    });
    if let Some(admin) = admin {
        claims["admin"] = serde_json::json!(admin);
    }
    sign_test_token(&claims)
}

/// Blocking-function event token for `uid`.
#[allow(dead_code)]
pub fn create_test_blocking_token(uid: &str) -> String {
    let now = now_secs();
    sign_test_token(&serde_json::json!({
        "iss": "https://securetoken.google.com/test-project",
        "aud": "http://localhost:8080/beforeSignIn",
        "sub": uid,
        "iat": now,
        "exp": now + 300,
        "event_type": "providers/cloud.auth/eventTypes/user.beforeSignIn:password",
        "user_record": {"uid": uid},
    }))
}

/// `POST /<name>` with `{"data": data}` and an optional bearer token.
#[allow(dead_code)]
pub fn callable_request(name: &str, token: Option<&str>, data: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/{name}"))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::json!({ "data": data }).to_string()))
        .unwrap()
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
