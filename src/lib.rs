// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! AQUA: backend for a hydroponics monitoring system
//!
//! This crate provides the callable API used by the AQUA web and mobile
//! clients: account management, sensor readings, user activity logs and
//! daily PDF reports written to Cloud Storage.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{FirebaseTokenVerifier, IdentityService, StorageService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityService,
    pub storage: StorageService,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
}
