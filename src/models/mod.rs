// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod report;
pub mod sensor;
pub mod user;
pub mod user_log;

pub use report::{ReportBookmark, ReportKind, ReportRunSummary};
pub use sensor::{SensorDay, SensorKind, SensorReading, SensorReadingResponse, WireTimestamp};
pub use user::{AuthRecord, AuthRecordUpdate, UserLevel, UserProfile, UserSummary};
pub use user_log::{UserLogEntry, UserLogResponse};
