// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Auth account management via the Identity Toolkit v1 REST API.
//!
//! Handles:
//! - Account creation and deletion
//! - Credential updates (email, password, verification, disabled flag)
//! - Account lookup and paginated listing

use crate::error::AppError;
use crate::models::{AuthRecord, AuthRecordUpdate};
use crate::services::google_auth::{emulator_base_url, AccessTokenSource};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const IDENTITY_TOOLKIT_HOST: &str = "https://identitytoolkit.googleapis.com";
const LIST_PAGE_SIZE: u32 = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Account as returned by `accounts:lookup` / `accounts:batchGet`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    disabled: bool,
}

impl From<AccountInfo> for AuthRecord {
    fn from(info: AccountInfo) -> Self {
        AuthRecord {
            uid: info.local_id,
            email: info.email,
            email_verified: info.email_verified,
            disabled: info.disabled,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    local_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disable_user: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Clone)]
struct MockAccount {
    record: AuthRecord,
    password: String,
}

#[derive(Clone)]
enum Backend {
    Remote {
        http: reqwest::Client,
        base_url: String,
        tokens: AccessTokenSource,
    },
    Mock {
        accounts: Arc<DashMap<String, MockAccount>>,
        next_uid: Arc<AtomicU64>,
    },
}

/// Firebase Auth admin client.
#[derive(Clone)]
pub struct IdentityService {
    backend: Backend,
}

impl IdentityService {
    /// Create an admin client for `project_id`.
    ///
    /// For local development with emulator, set FIREBASE_AUTH_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Identity(format!("Failed to build HTTP client: {}", e)))?;

        let (host, tokens) = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                (
                    format!("{}/identitytoolkit.googleapis.com", emulator_base_url(&host)),
                    AccessTokenSource::Emulator,
                )
            }
            Err(_) => (
                IDENTITY_TOOLKIT_HOST.to_string(),
                AccessTokenSource::from_default_credentials().await?,
            ),
        };

        Ok(Self {
            backend: Backend::Remote {
                http,
                base_url: format!("{}/v1/projects/{}", host, project_id),
                tokens,
            },
        })
    }

    /// In-memory account store for tests.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Mock {
                accounts: Arc::new(DashMap::new()),
                next_uid: Arc::new(AtomicU64::new(1)),
            },
        }
    }

    /// Create an email/password account. Returns the new record.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<AuthRecord, AppError> {
        match &self.backend {
            Backend::Mock { accounts, next_uid } => {
                if accounts
                    .iter()
                    .any(|a| a.record.email.as_deref() == Some(email))
                {
                    return Err(map_api_error("EMAIL_EXISTS"));
                }
                let uid = format!("mock-uid-{}", next_uid.fetch_add(1, Ordering::Relaxed));
                let record = AuthRecord {
                    uid: uid.clone(),
                    email: Some(email.to_string()),
                    email_verified: false,
                    disabled: false,
                };
                accounts.insert(
                    uid,
                    MockAccount {
                        record: record.clone(),
                        password: password.to_string(),
                    },
                );
                Ok(record)
            }
            Backend::Remote { .. } => {
                let body = serde_json::json!({ "email": email, "password": password });
                let created: SignUpResponse = self.post("accounts", &body).await?;

                tracing::info!(uid = %created.local_id, "Created auth account");

                Ok(AuthRecord {
                    uid: created.local_id,
                    email: Some(email.to_string()),
                    email_verified: false,
                    disabled: false,
                })
            }
        }
    }

    /// Look up one account.
    pub async fn get_user(&self, uid: &str) -> Result<Option<AuthRecord>, AppError> {
        match &self.backend {
            Backend::Mock { accounts, .. } => Ok(accounts.get(uid).map(|a| a.record.clone())),
            Backend::Remote { .. } => {
                let body = serde_json::json!({ "localId": [uid] });
                let found: LookupResponse = self.post("accounts:lookup", &body).await?;
                Ok(found.users.into_iter().next().map(AuthRecord::from))
            }
        }
    }

    /// Every account, following `nextPageToken` until exhausted.
    pub async fn list_users(&self) -> Result<Vec<AuthRecord>, AppError> {
        match &self.backend {
            Backend::Mock { accounts, .. } => {
                let mut records: Vec<AuthRecord> =
                    accounts.iter().map(|a| a.record.clone()).collect();
                records.sort_by(|a, b| a.uid.cmp(&b.uid));
                Ok(records)
            }
            Backend::Remote { .. } => {
                let mut records = Vec::new();
                let mut page_token: Option<String> = None;

                loop {
                    let mut query = vec![("maxResults", LIST_PAGE_SIZE.to_string())];
                    if let Some(token) = &page_token {
                        query.push(("nextPageToken", token.clone()));
                    }

                    let page: BatchGetResponse = self.get("accounts:batchGet", &query).await?;
                    records.extend(page.users.into_iter().map(AuthRecord::from));

                    match page.next_page_token.filter(|t| !t.is_empty()) {
                        Some(token) => page_token = Some(token),
                        None => break,
                    }
                }

                tracing::debug!(count = records.len(), "Listed auth accounts");
                Ok(records)
            }
        }
    }

    /// Apply a partial credentials update.
    pub async fn update_user(&self, uid: &str, update: &AuthRecordUpdate) -> Result<(), AppError> {
        if update.is_empty() {
            return Ok(());
        }

        match &self.backend {
            Backend::Mock { accounts, .. } => {
                if let Some(email) = &update.email {
                    let taken = accounts.iter().any(|a| {
                        a.key() != uid && a.record.email.as_deref() == Some(email.as_str())
                    });
                    if taken {
                        return Err(map_api_error("EMAIL_EXISTS"));
                    }
                }

                let mut account = accounts
                    .get_mut(uid)
                    .ok_or_else(|| map_api_error("USER_NOT_FOUND"))?;
                if let Some(email) = &update.email {
                    account.record.email = Some(email.clone());
                }
                if let Some(verified) = update.email_verified {
                    account.record.email_verified = verified;
                }
                if let Some(password) = &update.password {
                    account.password = password.clone();
                }
                if let Some(disabled) = update.disabled {
                    account.record.disabled = disabled;
                }
                Ok(())
            }
            Backend::Remote { .. } => {
                let body = UpdateRequest {
                    local_id: uid,
                    email: update.email.as_deref(),
                    email_verified: update.email_verified,
                    password: update.password.as_deref(),
                    disable_user: update.disabled,
                };
                let _: serde_json::Value = self.post("accounts:update", &body).await?;
                tracing::info!(uid = uid, "Updated auth account");
                Ok(())
            }
        }
    }

    /// Delete an account.
    pub async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mock { accounts, .. } => {
                accounts.remove(uid);
                Ok(())
            }
            Backend::Remote { .. } => {
                let body = serde_json::json!({ "localId": uid });
                let _: serde_json::Value = self.post("accounts:delete", &body).await?;
                tracing::info!(uid = uid, "Deleted auth account");
                Ok(())
            }
        }
    }

    /// Password stored by the mock backend.
    pub fn mock_password(&self, uid: &str) -> Option<String> {
        match &self.backend {
            Backend::Mock { accounts, .. } => accounts.get(uid).map(|a| a.password.clone()),
            Backend::Remote { .. } => None,
        }
    }

    async fn post<B, T>(&self, method: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let Backend::Remote {
            http,
            base_url,
            tokens,
        } = &self.backend
        else {
            return Err(AppError::Identity("mock backend has no REST API".to_string()));
        };

        let response = http
            .post(format!("{}/{}", base_url, method))
            .header(reqwest::header::AUTHORIZATION, tokens.header_value().await?)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("{} request failed: {}", method, e)))?;

        check_response_json(response).await
    }

    async fn get<T>(&self, method: &str, query: &[(&str, String)]) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let Backend::Remote {
            http,
            base_url,
            tokens,
        } = &self.backend
        else {
            return Err(AppError::Identity("mock backend has no REST API".to_string()));
        };

        let response = http
            .get(format!("{}/{}", base_url, method))
            .header(reqwest::header::AUTHORIZATION, tokens.header_value().await?)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("{} request failed: {}", method, e)))?;

        check_response_json(response).await
    }
}

async fn check_response_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("Invalid response body: {}", e)));
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => Err(map_api_error(&envelope.error.message)),
        Err(_) => Err(AppError::Identity(format!(
            "Identity Toolkit returned {}: {}",
            status, body
        ))),
    }
}

/// Map Identity Toolkit error codes (`EMAIL_EXISTS`, `WEAK_PASSWORD : ...`).
fn map_api_error(message: &str) -> AppError {
    let code = message.split(':').next().unwrap_or_default().trim();
    match code {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => AppError::InvalidArgument(
            "The email address is already in use by another account.".to_string(),
        ),
        "INVALID_EMAIL" => {
            AppError::InvalidArgument("The email address is improperly formatted.".to_string())
        }
        "WEAK_PASSWORD" => AppError::InvalidArgument(
            "The password must be at least 6 characters long.".to_string(),
        ),
        "USER_NOT_FOUND" => AppError::NotFound("User not found".to_string()),
        _ => AppError::Identity(message.to_string()),
    }
}
