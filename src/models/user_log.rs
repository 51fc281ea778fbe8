//! Append-only user activity log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Log entry stored in the `user_logs` collection.
///
/// Older entries carry extra payload fields at the top level instead of under
/// `details`; both shapes read back into `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredUserLog")]
pub struct UserLogEntry {
    /// Auth uid of the caller
    pub user_id: String,
    /// Caller email from the ID token (may be empty)
    #[serde(default)]
    pub email: String,
    /// Free-form activity description
    #[serde(default)]
    pub activity: String,
    /// Datetime string exactly as the client sent it
    #[serde(default)]
    pub datetime: String,
    /// Parsed `datetime`, used for ordering and day queries
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Any additional payload fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

/// Document metadata fields added by the Firestore client on read.
const FIRESTORE_META_PREFIX: &str = "_firestore";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUserLog {
    user_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    activity: String,
    #[serde(default)]
    datetime: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    details: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    top_level: BTreeMap<String, serde_json::Value>,
}

impl From<StoredUserLog> for UserLogEntry {
    fn from(stored: StoredUserLog) -> Self {
        let mut details: BTreeMap<String, serde_json::Value> = stored
            .top_level
            .into_iter()
            .filter(|(key, _)| !key.starts_with(FIRESTORE_META_PREFIX))
            .collect();
        // Nested `details` wins over a top-level field of the same name.
        details.extend(stored.details);

        Self {
            user_id: stored.user_id,
            email: stored.email,
            activity: stored.activity,
            datetime: stored.datetime,
            timestamp: stored.timestamp,
            details,
        }
    }
}

impl UserLogEntry {
    /// Keyword matches `activity`, date matches `datetime`, both by substring.
    pub fn matches(&self, keyword: Option<&str>, date: Option<&str>) -> bool {
        keyword.map_or(true, |k| self.activity.contains(k))
            && date.map_or(true, |d| self.datetime.contains(d))
    }
}

/// Entry as returned by `getAllUserLogs`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLogResponse {
    pub user_id: String,
    pub email: String,
    pub activity: String,
    pub datetime: String,
    pub timestamp: crate::models::sensor::WireTimestamp,
    #[serde(flatten)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl From<UserLogEntry> for UserLogResponse {
    fn from(entry: UserLogEntry) -> Self {
        Self {
            user_id: entry.user_id,
            email: entry.email,
            activity: entry.activity,
            datetime: entry.datetime,
            timestamp: entry.timestamp.into(),
            details: entry.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(activity: &str, datetime: &str) -> UserLogEntry {
        UserLogEntry {
            user_id: "u1".to_string(),
            email: "grower@example.com".to_string(),
            activity: activity.to_string(),
            datetime: datetime.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap(),
            details: BTreeMap::new(),
        }
    }

    #[test]
    fn matches_without_filters() {
        assert!(entry("Logged in", "2024-03-09 08:00:00").matches(None, None));
    }

    #[test]
    fn matches_keyword_and_date_substrings() {
        let e = entry("Downloaded pH report", "2024-03-09 08:00:00");
        assert!(e.matches(Some("pH"), None));
        assert!(e.matches(None, Some("2024-03-09")));
        assert!(e.matches(Some("report"), Some("03-09")));
        assert!(!e.matches(Some("Logged"), None));
        assert!(!e.matches(Some("pH"), Some("2024-03-10")));
    }

    #[test]
    fn response_flattens_details() {
        let mut e = entry("Changed pump", "2024-03-09 08:00:00");
        e.details.insert("pump".to_string(), serde_json::json!("A"));
        let json = serde_json::to_value(UserLogResponse::from(e)).unwrap();
        assert_eq!(json["pump"], "A");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["timestamp"]["_seconds"], 1_709_971_200i64);
    }

    #[test]
    fn top_level_extra_fields_read_into_details() {
        let stored = serde_json::json!({
            "userId": "u1",
            "email": "grower@example.com",
            "activity": "Changed pump",
            "datetime": "2024-03-09 08:00:00",
            "timestamp": "2024-03-09T08:00:00Z",
            "pump": "A",
            "details": {"dose": 2},
            "_firestore_id": "doc-1",
        });

        let entry: UserLogEntry = serde_json::from_value(stored).unwrap();

        assert_eq!(entry.details.len(), 2);
        assert_eq!(entry.details["pump"], "A");
        assert_eq!(entry.details["dose"], 2);
        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap());

        let json = serde_json::to_value(UserLogResponse::from(entry)).unwrap();
        assert_eq!(json["pump"], "A");
        assert!(json.get("_firestore_id").is_none());
    }

    #[test]
    fn stored_shape_keeps_extras_under_details() {
        let mut e = entry("Changed pump", "2024-03-09 08:00:00");
        e.details.insert("pump".to_string(), serde_json::json!("A"));

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["details"]["pump"], "A");
        assert!(json.get("pump").is_none());

        let back: UserLogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.details, e.details);
    }
}
