//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const USER_LOGS: &str = "user_logs";
    /// Report bookmarks (`daily`, `user-logs`)
    pub const REPORTS: &str = "reports";
    pub const SCHEDULER: &str = "scheduler";
}
