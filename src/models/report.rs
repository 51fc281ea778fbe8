// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report bookmarks and run summaries.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Report families, each with its own bookmark document in `reports`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ReportKind {
    Daily,
    UserLogs,
}

impl ReportKind {
    /// Bookmark document ID.
    pub fn bookmark_id(self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::UserLogs => "user-logs",
        }
    }
}

/// Bookmark document: the last date whose report files were all written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBookmark {
    #[serde(default)]
    pub last_file_uploaded: String,
}

/// Outcome of a report generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReportRunSummary {
    pub kind: ReportKind,
    /// Dates (`Y-M-D`) that were pending at the start of the run
    pub dates: Vec<String>,
    /// Object paths written during the run
    pub files: Vec<String>,
    /// Dates whose work failed and will be retried next run
    pub failed_dates: Vec<String>,
    /// Bookmark after the run (unchanged if nothing advanced)
    pub bookmark: Option<String>,
}

impl ReportRunSummary {
    pub fn is_complete_success(&self) -> bool {
        self.failed_dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookmark_ids() {
        assert_eq!(ReportKind::Daily.bookmark_id(), "daily");
        assert_eq!(ReportKind::UserLogs.bookmark_id(), "user-logs");
        assert_eq!(
            serde_json::to_value(ReportKind::UserLogs).unwrap(),
            "user-logs"
        );
    }

    #[test]
    fn bookmark_field_name() {
        let bookmark: ReportBookmark =
            serde_json::from_str(r#"{"lastFileUploaded": "2024-1-5"}"#).unwrap();
        assert_eq!(bookmark.last_file_uploaded, "2024-1-5");

        let empty: ReportBookmark = serde_json::from_str("{}").unwrap();
        assert!(empty.last_file_uploaded.is_empty());
    }
}
