// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth access tokens for Google REST APIs.

use crate::error::AppError;
use gcloud_sdk::{GoogleAuthTokenGenerator, TokenSourceType, GCP_DEFAULT_SCOPES};
use std::sync::Arc;

/// Produces `Authorization` header values for outgoing REST calls.
#[derive(Clone)]
pub enum AccessTokenSource {
    /// Application default credentials (service account on Cloud Run).
    Google(Arc<GoogleAuthTokenGenerator>),
    /// Firebase emulators accept a fixed owner token.
    Emulator,
}

impl AccessTokenSource {
    /// Token source backed by application default credentials.
    pub async fn from_default_credentials() -> Result<Self, AppError> {
        let generator =
            GoogleAuthTokenGenerator::new(TokenSourceType::Default, GCP_DEFAULT_SCOPES.clone())
                .await
                .map_err(|e| {
                    AppError::Internal(anyhow::anyhow!(
                        "Failed to load default credentials: {}",
                        e
                    ))
                })?;

        Ok(Self::Google(Arc::new(generator)))
    }

    /// Value for the `Authorization` header.
    pub async fn header_value(&self) -> Result<String, AppError> {
        match self {
            AccessTokenSource::Google(generator) => {
                let token = generator.create_token().await.map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Failed to mint access token: {}", e))
                })?;
                Ok(token.header_value())
            }
            AccessTokenSource::Emulator => Ok("Bearer owner".to_string()),
        }
    }
}

/// Normalize an emulator host variable (`localhost:9099`) into a base URL.
pub fn emulator_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emulator_hosts_gain_scheme() {
        assert_eq!(emulator_base_url("localhost:9099"), "http://localhost:9099");
        assert_eq!(
            emulator_base_url("http://127.0.0.1:9199/"),
            "http://127.0.0.1:9199"
        );
    }

    #[tokio::test]
    async fn emulator_uses_owner_token() {
        let header = AccessTokenSource::Emulator.header_value().await.unwrap();
        assert_eq!(header, "Bearer owner");
    }
}
