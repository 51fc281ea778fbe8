//! User model for storage and API.
//!
//! A user is split across the auth-service record (email, password,
//! verification, disabled flag, custom claims) and the `users/{uid}` profile
//! document holding display name and role level.

use serde::{Deserialize, Serialize};

/// Role level stored on the profile and mirrored into token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    Admin,
    #[default]
    Member,
}

impl UserLevel {
    /// Custom claims stamped on sign-in for this level.
    pub fn custom_claims(self) -> serde_json::Value {
        match self {
            UserLevel::Admin => serde_json::json!({ "admin": true }),
            UserLevel::Member => serde_json::json!({ "member": true }),
        }
    }
}

/// Profile document stored in Firestore (`users/{uid}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Role level
    #[serde(default)]
    pub user_level: UserLevel,
}

/// Auth-service record as seen by this service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthRecord {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
}

/// Partial update applied to an auth-service record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthRecordUpdate {
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub password: Option<String>,
    pub disabled: Option<bool>,
}

impl AuthRecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.email_verified.is_none()
            && self.password.is_none()
            && self.disabled.is_none()
    }

    /// Email change; a new address always resets verification.
    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self.email_verified = Some(false);
        self
    }
}

/// Joined user as returned by `listUsers`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: Option<String>,
    pub user_level: UserLevel,
    pub name: String,
    pub is_active: bool,
    pub is_email_verified: bool,
}

impl UserSummary {
    /// Join an auth record with its (possibly missing) profile document.
    pub fn join(record: AuthRecord, profile: Option<&UserProfile>) -> Self {
        let (name, user_level) = profile
            .map(|p| (p.name.clone(), p.user_level))
            .unwrap_or_default();

        Self {
            id: record.uid,
            email: record.email,
            user_level,
            name,
            is_active: !record.disabled,
            is_email_verified: record.email_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserLevel::Admin).unwrap(),
            "\"admin\""
        );
        let level: UserLevel = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(level, UserLevel::Member);
        assert!(serde_json::from_str::<UserLevel>("\"owner\"").is_err());
    }

    #[test]
    fn claims_follow_level() {
        assert_eq!(UserLevel::Admin.custom_claims()["admin"], true);
        assert_eq!(UserLevel::Member.custom_claims()["member"], true);
        assert!(UserLevel::Member.custom_claims().get("admin").is_none());
    }

    #[test]
    fn profile_uses_camel_case_fields() {
        let profile = UserProfile {
            name: "Ana".to_string(),
            user_level: UserLevel::Admin,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["userLevel"], "admin");
        assert_eq!(json["name"], "Ana");
    }

    #[test]
    fn join_without_profile_defaults_to_member() {
        let record = AuthRecord {
            uid: "u1".to_string(),
            email: Some("a@example.com".to_string()),
            email_verified: true,
            disabled: true,
        };
        let summary = UserSummary::join(record, None);
        assert_eq!(summary.user_level, UserLevel::Member);
        assert_eq!(summary.name, "");
        assert!(!summary.is_active);
        assert!(summary.is_email_verified);
    }

    #[test]
    fn email_update_resets_verification() {
        let update = AuthRecordUpdate::default().with_email("new@example.com".to_string());
        assert_eq!(update.email_verified, Some(false));
        assert!(!update.is_empty());
        assert!(AuthRecordUpdate::default().is_empty());
    }
}
