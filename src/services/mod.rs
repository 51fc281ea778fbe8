// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod firebase_auth;
pub mod google_auth;
pub mod identity;
pub mod report_dates;
pub mod report_pdf;
pub mod reports;
pub mod storage;

pub use firebase_auth::{BlockingEvent, Caller, FirebaseTokenVerifier, TokenError};
pub use identity::IdentityService;
pub use reports::ReportGenerator;
pub use storage::StorageService;
