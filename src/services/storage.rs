// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Storage uploads for generated reports.

use crate::error::AppError;
use crate::services::google_auth::{emulator_base_url, AccessTokenSource};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::Duration;

const STORAGE_BASE_URL: &str = "https://storage.googleapis.com";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Content type of every report object.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Clone)]
enum Backend {
    Remote {
        http: reqwest::Client,
        base_url: String,
        tokens: AccessTokenSource,
    },
    Mock {
        objects: Arc<DashMap<String, Vec<u8>>>,
        rejected: Arc<DashSet<String>>,
    },
}

/// Writes report objects into a single bucket.
#[derive(Clone)]
pub struct StorageService {
    bucket: String,
    backend: Backend,
}

impl StorageService {
    /// Create a client for `bucket`.
    ///
    /// For local development with emulator, set STORAGE_EMULATOR_HOST.
    pub async fn new(bucket: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| AppError::Storage(format!("Failed to build HTTP client: {}", e)))?;

        let (base_url, tokens) = match std::env::var("STORAGE_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Cloud Storage emulator");
                (emulator_base_url(&host), AccessTokenSource::Emulator)
            }
            Err(_) => (
                STORAGE_BASE_URL.to_string(),
                AccessTokenSource::from_default_credentials().await?,
            ),
        };

        tracing::info!(bucket = bucket, "Cloud Storage client initialized");

        Ok(Self {
            bucket: bucket.to_string(),
            backend: Backend::Remote {
                http,
                base_url,
                tokens,
            },
        })
    }

    /// In-memory bucket for tests.
    pub fn new_mock(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            backend: Backend::Mock {
                objects: Arc::new(DashMap::new()),
                rejected: Arc::new(DashSet::new()),
            },
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload (or overwrite) an object.
    pub async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AppError> {
        let size = bytes.len();

        match &self.backend {
            Backend::Mock { objects, rejected } => {
                if rejected.contains(path) {
                    return Err(AppError::Storage(format!(
                        "Upload of {} rejected by mock bucket",
                        path
                    )));
                }
                objects.insert(path.to_string(), bytes);
            }
            Backend::Remote {
                http,
                base_url,
                tokens,
            } => {
                let url = format!(
                    "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
                    base_url,
                    urlencoding::encode(&self.bucket),
                    urlencoding::encode(path)
                );

                let response = http
                    .post(&url)
                    .header(reqwest::header::AUTHORIZATION, tokens.header_value().await?)
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(bytes)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Storage(format!(
                        "Upload of {} returned {}: {}",
                        path, status, body
                    )));
                }
            }
        }

        tracing::debug!(bucket = %self.bucket, path = path, size, "Uploaded object");
        Ok(())
    }

    /// Object contents held by a mock bucket.
    pub fn mock_object(&self, path: &str) -> Option<Vec<u8>> {
        match &self.backend {
            Backend::Mock { objects, .. } => objects.get(path).map(|o| o.value().clone()),
            Backend::Remote { .. } => None,
        }
    }

    /// Sorted object paths held by a mock bucket.
    pub fn mock_paths(&self) -> Vec<String> {
        match &self.backend {
            Backend::Mock { objects, .. } => {
                let mut paths: Vec<String> = objects.iter().map(|e| e.key().clone()).collect();
                paths.sort();
                paths
            }
            Backend::Remote { .. } => Vec::new(),
        }
    }

    /// Make a mock bucket fail uploads to `path` until [`Self::accept_all_uploads`].
    pub fn reject_uploads_to(&self, path: &str) {
        if let Backend::Mock { rejected, .. } = &self.backend {
            rejected.insert(path.to_string());
        }
    }

    pub fn accept_all_uploads(&self) {
        if let Backend::Mock { rejected, .. } = &self.backend {
            rejected.clear();
        }
    }
}
