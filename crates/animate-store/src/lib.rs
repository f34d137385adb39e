//! `RocksDB` storage layer for prompt-to-animate.
//!
//! This crate persists usage records, chat history, job progress and webhook
//! deliveries using `RocksDB` with column families.
//!
//! # Architecture
//!
//! - `users`: Usage records, keyed by `user_id`
//! - `chats`: Chat history, keyed by `chat_id` (ULID)
//! - `chats_by_user`: Index for listing a user's chats newest first
//! - `job_progress` / `job_results`: Short-lived job state with an expiry
//! - `webhook_events`: Delivered payment events for idempotency
//!
//! # Example
//!
//! ```no_run
//! use animate_store::{RocksStore, Store};
//! use animate_core::UserId;
//!
//! let store = RocksStore::open("/tmp/animate-db").unwrap();
//!
//! let user_id: UserId = "user_2abc".parse().unwrap();
//! let usage = store.load_usage(&user_id, chrono::Utc::now()).unwrap();
//! println!("{:?}", usage.summary());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use animate_core::{
    ChatId, ChatRecord, Consumption, GenerationCheck, JobId, JobProgress, UserId, UserUsage,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored job state: latest progress plus the owner and an expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntry {
    /// Who submitted the job.
    pub owner: UserId,
    /// Latest progress.
    pub progress: JobProgress,
    /// After this instant the entry reads as absent.
    pub expires_at: DateTime<Utc>,
}

impl JobEntry {
    /// Whether the entry has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A change to a usage record triggered by a payment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageChange {
    /// Add purchased basic credits.
    AddBasicCredits(u32),
    /// Activate (`true`) or cancel (`false`) the pro subscription.
    SetPro(bool),
}

impl UsageChange {
    /// Apply the change to `usage`.
    pub fn apply(self, usage: &mut UserUsage, now: DateTime<Utc>) {
        match self {
            Self::AddBasicCredits(credits) => usage.add_basic_credits(credits, now),
            Self::SetPro(true) => usage.activate_pro(now),
            Self::SetPro(false) => usage.cancel_pro(now),
        }
    }
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Usage Operations
    // =========================================================================

    /// Get a usage record by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_usage(&self, user_id: &UserId) -> Result<Option<UserUsage>>;

    /// Insert or update a usage record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_usage(&self, usage: &UserUsage) -> Result<()>;

    /// Get a usage record, creating it if missing and persisting any due reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn load_usage(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<UserUsage>;

    /// Check the quota and, when allowed, reserve one generation.
    ///
    /// Reserved generations count against the quota until they are charged
    /// with `consume_generation` or dropped with `release_generation`.
    /// Reservations are held in memory and do not survive a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn reserve_generation(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<GenerationCheck>;

    /// Drop a reservation without charging it.
    fn release_generation(&self, user_id: &UserId);

    /// Charge one completed generation to the user, settling a reservation
    /// if one is held.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn consume_generation(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<Consumption>;

    /// Add purchased basic credits, returning the updated record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn add_basic_credits(
        &self,
        user_id: &UserId,
        credits: u32,
        now: DateTime<Utc>,
    ) -> Result<UserUsage>;

    /// Activate or cancel a pro subscription, returning the updated record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn set_pro_subscription(
        &self,
        user_id: &UserId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<UserUsage>;

    // =========================================================================
    // Chat Operations
    // =========================================================================

    /// Insert a chat record.
    ///
    /// This also maintains the owner index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_chat(&self, chat: &ChatRecord) -> Result<()>;

    /// Get a chat owned by `user_id`.
    ///
    /// Chats owned by someone else read as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_chat(&self, user_id: &UserId, chat_id: &ChatId) -> Result<Option<ChatRecord>>;

    /// List chats for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_chats(&self, user_id: &UserId, limit: usize) -> Result<Vec<ChatRecord>>;

    /// Delete a chat owned by `user_id`, returning the removed record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the chat doesn't exist or belongs to
    /// another user.
    fn delete_chat(&self, user_id: &UserId, chat_id: &ChatId) -> Result<ChatRecord>;

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Record the latest progress of a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_progress(&self, job_id: &JobId, entry: &JobEntry) -> Result<()>;

    /// Get the latest progress of a job, ignoring expired entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_progress(&self, job_id: &JobId, now: DateTime<Utc>) -> Result<Option<JobEntry>>;

    /// Record the terminal result of a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_result(&self, job_id: &JobId, entry: &JobEntry) -> Result<()>;

    /// Get the terminal result of a job, ignoring expired entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_result(&self, job_id: &JobId, now: DateTime<Utc>) -> Result<Option<JobEntry>>;

    /// Delete expired progress and result entries.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    // =========================================================================
    // Webhook Operations (for idempotency)
    // =========================================================================

    /// Apply a payment event to a user's usage record.
    ///
    /// With an `event_id`, the delivery marker and the usage record are
    /// written in one batch, so a failed apply can be retried.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateEvent` if the event was already applied,
    /// or an error if the database operation fails.
    fn apply_usage_event(
        &self,
        event_id: Option<&str>,
        user_id: &UserId,
        change: UsageChange,
        now: DateTime<Utc>,
    ) -> Result<UserUsage>;

    // =========================================================================
    // Health
    // =========================================================================

    /// Check the database is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    fn ping(&self) -> Result<()>;
}
