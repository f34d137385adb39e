//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Usage records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Chat history records, keyed by `chat_id` (ULID).
    pub const CHATS: &str = "chats";

    /// Index: chats by owner, keyed by `user_id || 0x00 || chat_id`.
    /// Value is empty (index only).
    pub const CHATS_BY_USER: &str = "chats_by_user";

    /// Latest progress per job, keyed by `job_id`.
    pub const JOB_PROGRESS: &str = "job_progress";

    /// Terminal result per job, keyed by `job_id`.
    pub const JOB_RESULTS: &str = "job_results";

    /// Processed payment webhook deliveries, keyed by `event_id`.
    pub const WEBHOOK_EVENTS: &str = "webhook_events";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::CHATS,
        cf::CHATS_BY_USER,
        cf::JOB_PROGRESS,
        cf::JOB_RESULTS,
        cf::WEBHOOK_EVENTS,
    ]
}
