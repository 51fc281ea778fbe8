// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AQUA API Server
//!
//! Serves the callable endpoints and the `beforeSignIn` blocking hook for
//! the AQUA hydroponics monitoring system.

use aqua_backend::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseTokenVerifier, IdentityService, StorageService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        project = %config.gcp_project_id,
        "Starting AQUA API"
    );

    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    let identity = IdentityService::new(&config.gcp_project_id).await?;
    tracing::info!("Identity Toolkit client initialized");

    let storage = StorageService::new(&config.storage_bucket).await?;
    tracing::info!(bucket = %config.storage_bucket, "Cloud Storage client initialized");

    let token_verifier = Arc::new(FirebaseTokenVerifier::new(&config)?);

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        storage,
        token_verifier,
    });

    let app = aqua_backend::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aqua_backend=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
