//! Application configuration loaded from environment variables.
//!
//! Emulator hosts (`FIRESTORE_EMULATOR_HOST`, `FIREBASE_AUTH_EMULATOR_HOST`,
//! `STORAGE_EMULATOR_HOST`) are read by the individual clients, not here.

use chrono::{FixedOffset, Offset, Utc};
use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP / Firebase project ID (also the expected ID-token audience)
    pub gcp_project_id: String,
    /// Cloud Storage bucket receiving generated reports
    pub storage_bucket: String,
    /// Public URL of this service (blocking-hook audience is derived from it)
    pub api_url: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Timezone used for report day boundaries and displayed datetimes
    pub report_utc_offset: FixedOffset,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-project.appspot.com".to_string(),
            api_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            report_utc_offset: utc(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?;

        let storage_bucket = env::var("STORAGE_BUCKET")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| format!("{}.appspot.com", gcp_project_id));

        let report_utc_offset = match env::var("REPORT_UTC_OFFSET_MINUTES") {
            Ok(raw) => parse_utc_offset_minutes(&raw)?,
            Err(_) => utc(),
        };

        Ok(Self {
            gcp_project_id,
            storage_bucket,
            api_url: env::var("API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            report_utc_offset,
        })
    }

    /// Audience expected on blocking-hook event tokens.
    pub fn before_sign_in_audience(&self) -> String {
        format!("{}/beforeSignIn", self.api_url)
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn parse_utc_offset_minutes(raw: &str) -> Result<FixedOffset, ConfigError> {
    let minutes: i32 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("REPORT_UTC_OFFSET_MINUTES", raw.to_string()))?;

    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| ConfigError::Invalid("REPORT_UTC_OFFSET_MINUTES", raw.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
