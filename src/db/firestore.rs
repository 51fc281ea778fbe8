// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - User profiles (`users/{uid}`)
//! - Sensor readings (one collection per sensor kind)
//! - User activity logs (append-only)
//! - Report bookmarks and scheduler documents

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    ReportBookmark, ReportKind, SensorKind, SensorReading, UserLevel, UserLogEntry, UserProfile,
};
use crate::time_utils::{format_report_date, parse_report_date};
use chrono::{DateTime, NaiveDate, Utc};
use firestore::errors::{BackoffError, FirestoreError};
use firestore::{FirestoreQueryDirection, FirestoreTimestamp};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

/// Readings and log entries are ordered by these timestamp fields.
const READING_TIME_FIELD: &str = "datetime";
const LOG_TIME_FIELD: &str = "timestamp";

/// Profile document with its Firestore document ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRecord {
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    user_level: UserLevel,
}

/// Aggregation result for `count()` queries.
#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator does not check credentials; skip the ADC lookup entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a user profile by auth uid.
    pub async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        let record: Option<ProfileRecord> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(record.map(|r| UserProfile {
            name: r.name,
            user_level: r.user_level,
        }))
    }

    /// Create or replace a user profile.
    pub async fn set_profile(&self, uid: &str, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Write only the named fields of a profile, leaving the rest untouched.
    pub async fn update_profile_fields(
        &self,
        uid: &str,
        profile: &UserProfile,
        fields: &[&str],
    ) -> Result<(), AppError> {
        if fields.is_empty() {
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields.iter().copied())
            .in_col(collections::USERS)
            .document_id(uid)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a profile document (no-op if absent).
    pub async fn delete_profile(&self, uid: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All profiles, keyed by uid.
    pub async fn list_profiles(&self) -> Result<Vec<(String, UserProfile)>, AppError> {
        let records: Vec<ProfileRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(records
            .into_iter()
            .filter_map(|r| {
                let id = r.id?;
                Some((
                    id,
                    UserProfile {
                        name: r.name,
                        user_level: r.user_level,
                    },
                ))
            })
            .collect())
    }

    // ─── Sensor Operations ───────────────────────────────────────

    /// Most recent reading of a sensor kind.
    pub async fn latest_reading(&self, kind: SensorKind) -> Result<Option<SensorReading>, AppError> {
        let mut readings = self.readings_page(kind, 0, 1).await?;
        Ok(readings.pop())
    }

    /// Total number of readings of a sensor kind.
    pub async fn count_readings(&self, kind: SensorKind) -> Result<usize, AppError> {
        let results: Vec<CountResult> = self
            .get_client()?
            .fluent()
            .select()
            .from(kind.collection())
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(results.first().map(|r| r.count).unwrap_or(0))
    }

    /// One page of readings, newest first.
    pub async fn readings_page(
        &self,
        kind: SensorKind,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<SensorReading>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(kind.collection())
            .order_by([(READING_TIME_FIELD, FirestoreQueryDirection::Descending)])
            .offset(offset)
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Readings within `[start, end]`, newest first.
    pub async fn readings_between(
        &self,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(kind.collection())
            .filter(|q| {
                q.for_all([
                    q.field(READING_TIME_FIELD)
                        .greater_than_or_equal(FirestoreTimestamp(start)),
                    q.field(READING_TIME_FIELD)
                        .less_than_or_equal(FirestoreTimestamp(end)),
                ])
            })
            .order_by([(READING_TIME_FIELD, FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── User Log Operations ─────────────────────────────────────

    /// Append a log entry under a generated document ID.
    pub async fn add_user_log(&self, entry: &UserLogEntry) -> Result<(), AppError> {
        let _: UserLogEntry = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USER_LOGS)
            .generate_document_id()
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Every log entry, newest first.
    pub async fn list_user_logs(&self) -> Result<Vec<UserLogEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_LOGS)
            .order_by([(LOG_TIME_FIELD, FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Log entries within `[start, end]`, newest first.
    pub async fn user_logs_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UserLogEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_LOGS)
            .filter(|q| {
                q.for_all([
                    q.field(LOG_TIME_FIELD)
                        .greater_than_or_equal(FirestoreTimestamp(start)),
                    q.field(LOG_TIME_FIELD)
                        .less_than_or_equal(FirestoreTimestamp(end)),
                ])
            })
            .order_by([(LOG_TIME_FIELD, FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Report Bookmark Operations ──────────────────────────────

    /// Read the bookmark document for a report kind (empty if absent).
    pub async fn get_report_bookmark(&self, kind: ReportKind) -> Result<ReportBookmark, AppError> {
        let bookmark: Option<ReportBookmark> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REPORTS)
            .obj()
            .one(kind.bookmark_id())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(bookmark.unwrap_or_default())
    }

    /// Move a bookmark forward to `date`.
    ///
    /// The stored value is read and written inside one transaction, and only
    /// replaced if `date` is later. A concurrent commit aborts the transaction,
    /// which is then retried against the new value, so the bookmark never
    /// moves backwards. Returns `true` if this call changed the bookmark.
    pub async fn advance_report_bookmark(
        &self,
        kind: ReportKind,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        let proposed = format_report_date(date);

        let advanced = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let proposed = proposed.clone();
                async move {
                    // `db` reads through the transaction
                    let current: Option<ReportBookmark> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::REPORTS)
                        .obj()
                        .one(kind.bookmark_id())
                        .await
                        .map_err(retry_if_possible)?;

                    let stored = current.map(|b| b.last_file_uploaded).unwrap_or_default();
                    if parse_report_date(&stored).is_some_and(|stored| stored >= date) {
                        tracing::debug!(
                            kind = kind.bookmark_id(),
                            stored = %stored,
                            proposed = %proposed,
                            "Bookmark already at or past proposed date"
                        );
                        return Ok::<bool, BackoffError<FirestoreError>>(false);
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::REPORTS)
                        .document_id(kind.bookmark_id())
                        .object(&ReportBookmark {
                            last_file_uploaded: proposed,
                        })
                        .add_to_transaction(transaction)
                        .map_err(BackoffError::permanent)?;

                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Bookmark transaction failed: {}", e)))?;

        if advanced {
            tracing::info!(
                kind = kind.bookmark_id(),
                bookmark = %proposed,
                "Report bookmark advanced"
            );
        }

        Ok(advanced)
    }

    /// Append a sensor reading under a generated document ID.
    pub async fn add_reading(
        &self,
        kind: SensorKind,
        reading: &SensorReading,
    ) -> Result<(), AppError> {
        let _: SensorReading = self
            .get_client()?
            .fluent()
            .insert()
            .into(kind.collection())
            .generate_document_id()
            .object(reading)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Scheduler Operations ────────────────────────────────────

    /// Merge `fields` into `scheduler/{doc_name}`.
    pub async fn update_scheduler(
        &self,
        doc_name: &str,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AppError> {
        if fields.is_empty() {
            return Ok(());
        }

        let field_names: Vec<&str> = fields.keys().map(String::as_str).collect();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(field_names)
            .in_col(collections::SCHEDULER)
            .document_id(doc_name)
            .object(fields)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Aborted or unavailable reads inside a transaction are retried.
fn retry_if_possible(err: FirestoreError) -> BackoffError<FirestoreError> {
    match err {
        FirestoreError::DatabaseError(ref db_err) if db_err.retry_possible => {
            BackoffError::transient(err)
        }
        other => BackoffError::permanent(other),
    }
}
