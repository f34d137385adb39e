//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use tracing::{debug, warn};

use animate_core::{
    ChatId, ChatRecord, Consumption, GenerationCheck, JobId, UserId, UserUsage,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{JobEntry, Store, UsageChange};

/// Generations admitted but not yet charged, per user.
type Reservations = HashMap<UserId, u32>;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-modify-write sequences on usage and webhook records,
    /// and guards the in-flight reservations.
    write_lock: Mutex<Reservations>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(Reservations::new()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> MutexGuard<'_, Reservations> {
        // Reservation counts change in single statements, so a poisoned lock
        // holds no partial update.
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_value<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let value = Self::serialize(value)?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    fn get_job_entry(
        &self,
        cf_name: &str,
        job_id: &JobId,
        now: DateTime<Utc>,
    ) -> Result<Option<JobEntry>> {
        let entry: Option<JobEntry> = self.get_value(cf_name, &keys::job_key(job_id))?;
        Ok(entry.filter(|e| !e.is_expired(now)))
    }

    /// Read a usage record for an update, creating it and applying any due
    /// reset. Callers hold the write lock.
    fn usage_for_update(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<UserUsage> {
        let mut usage = self
            .get_usage(user_id)?
            .unwrap_or_else(|| UserUsage::new(user_id.clone(), now));
        usage.reset_if_due(now);
        Ok(usage)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Usage Operations
    // =========================================================================

    fn get_usage(&self, user_id: &UserId) -> Result<Option<UserUsage>> {
        self.get_value(cf::USERS, &keys::usage_key(user_id))
    }

    fn put_usage(&self, usage: &UserUsage) -> Result<()> {
        self.put_value(cf::USERS, &keys::usage_key(&usage.user_id), usage)
    }

    fn load_usage(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<UserUsage> {
        let _guard = self.lock();

        match self.get_usage(user_id)? {
            Some(mut usage) => {
                if usage.reset_if_due(now) {
                    debug!(user_id = %user_id, "monthly usage reset");
                    self.put_usage(&usage)?;
                }
                Ok(usage)
            }
            None => {
                let usage = UserUsage::new(user_id.clone(), now);
                self.put_usage(&usage)?;
                debug!(user_id = %user_id, "created usage record");
                Ok(usage)
            }
        }
    }

    fn reserve_generation(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<GenerationCheck> {
        let mut reservations = self.lock();

        let usage = self.usage_for_update(user_id, now)?;
        self.put_usage(&usage)?;

        let pending = reservations.get(user_id).copied().unwrap_or(0);
        let check = usage.check_with_pending(now, pending);
        if check.allowed {
            reservations.insert(user_id.clone(), pending + 1);
            debug!(user_id = %user_id, pending = pending + 1, "generation reserved");
        }
        Ok(check)
    }

    fn release_generation(&self, user_id: &UserId) {
        let mut reservations = self.lock();
        release(&mut reservations, user_id);
    }

    fn consume_generation(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<Consumption> {
        let mut reservations = self.lock();
        release(&mut reservations, user_id);

        let mut usage = self.usage_for_update(user_id, now)?;
        let consumption = usage.consume(now);
        self.put_usage(&usage)?;
        Ok(consumption)
    }

    fn add_basic_credits(
        &self,
        user_id: &UserId,
        credits: u32,
        now: DateTime<Utc>,
    ) -> Result<UserUsage> {
        self.apply_usage_event(None, user_id, UsageChange::AddBasicCredits(credits), now)
    }

    fn set_pro_subscription(
        &self,
        user_id: &UserId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<UserUsage> {
        self.apply_usage_event(None, user_id, UsageChange::SetPro(active), now)
    }

    // =========================================================================
    // Chat Operations
    // =========================================================================

    fn put_chat(&self, chat: &ChatRecord) -> Result<()> {
        let cf_chats = self.cf(cf::CHATS)?;
        let cf_by_user = self.cf(cf::CHATS_BY_USER)?;

        let chat_key = keys::chat_key(&chat.id);
        let user_chat_key = keys::user_chat_key(&chat.user_id, &chat.id);
        let value = Self::serialize(chat)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_chats, &chat_key, &value);
        batch.put_cf(&cf_by_user, &user_chat_key, []);

        self.db.write(batch)?;

        Ok(())
    }

    fn get_chat(&self, user_id: &UserId, chat_id: &ChatId) -> Result<Option<ChatRecord>> {
        let chat: Option<ChatRecord> = self.get_value(cf::CHATS, &keys::chat_key(chat_id))?;
        Ok(chat.filter(|c| &c.user_id == user_id))
    }

    fn list_chats(&self, user_id: &UserId, limit: usize) -> Result<Vec<ChatRecord>> {
        let cf_by_user = self.cf(cf::CHATS_BY_USER)?;
        let prefix = keys::user_chats_prefix(user_id);
        let upper = keys::user_chats_upper_bound(user_id);

        // Walk backwards from just past the prefix so the newest ULIDs come first.
        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&upper, Direction::Reverse));

        let mut chats = Vec::new();
        for item in iter {
            if chats.len() >= limit {
                break;
            }

            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                if &key[..] < prefix.as_slice() {
                    break;
                }
                continue;
            }

            let Some(chat_id) = keys::extract_chat_id_from_user_key(&key) else {
                warn!(user_id = %user_id, "malformed chat index key");
                continue;
            };
            if let Some(chat) = self.get_chat(user_id, &chat_id)? {
                chats.push(chat);
            }
        }

        Ok(chats)
    }

    fn delete_chat(&self, user_id: &UserId, chat_id: &ChatId) -> Result<ChatRecord> {
        let chat = self.get_chat(user_id, chat_id)?.ok_or(StoreError::NotFound)?;

        let cf_chats = self.cf(cf::CHATS)?;
        let cf_by_user = self.cf(cf::CHATS_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_chats, keys::chat_key(chat_id));
        batch.delete_cf(&cf_by_user, keys::user_chat_key(user_id, chat_id));

        self.db.write(batch)?;

        Ok(chat)
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    fn put_progress(&self, job_id: &JobId, entry: &JobEntry) -> Result<()> {
        self.put_value(cf::JOB_PROGRESS, &keys::job_key(job_id), entry)
    }

    fn get_progress(&self, job_id: &JobId, now: DateTime<Utc>) -> Result<Option<JobEntry>> {
        self.get_job_entry(cf::JOB_PROGRESS, job_id, now)
    }

    fn put_result(&self, job_id: &JobId, entry: &JobEntry) -> Result<()> {
        self.put_value(cf::JOB_RESULTS, &keys::job_key(job_id), entry)
    }

    fn get_result(&self, job_id: &JobId, now: DateTime<Utc>) -> Result<Option<JobEntry>> {
        self.get_job_entry(cf::JOB_RESULTS, job_id, now)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;

        for name in [cf::JOB_PROGRESS, cf::JOB_RESULTS] {
            let cf = self.cf(name)?;
            let mut batch = WriteBatch::default();

            for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
                let (key, value) = item?;
                let expired = match Self::deserialize::<JobEntry>(&value) {
                    Ok(entry) => entry.is_expired(now),
                    Err(e) => {
                        warn!(column_family = name, error = %e, "dropping unreadable job entry");
                        true
                    }
                };
                if expired {
                    batch.delete_cf(&cf, key);
                    removed += 1;
                }
            }

            self.db.write(batch)?;
        }

        Ok(removed)
    }

    // =========================================================================
    // Webhook Operations
    // =========================================================================

    fn apply_usage_event(
        &self,
        event_id: Option<&str>,
        user_id: &UserId,
        change: UsageChange,
        now: DateTime<Utc>,
    ) -> Result<UserUsage> {
        let _guard = self.lock();

        if let Some(event_id) = event_id {
            let seen: Option<DateTime<Utc>> =
                self.get_value(cf::WEBHOOK_EVENTS, &keys::webhook_event_key(event_id))?;
            if seen.is_some() {
                return Err(StoreError::DuplicateEvent {
                    event_id: event_id.to_string(),
                });
            }
        }

        let mut usage = self.usage_for_update(user_id, now)?;
        change.apply(&mut usage, now);

        let cf_users = self.cf(cf::USERS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_users, keys::usage_key(user_id), Self::serialize(&usage)?);

        if let Some(event_id) = event_id {
            let cf_events = self.cf(cf::WEBHOOK_EVENTS)?;
            batch.put_cf(
                &cf_events,
                keys::webhook_event_key(event_id),
                Self::serialize(&now)?,
            );
        }

        self.db.write(batch)?;
        Ok(usage)
    }

    // =========================================================================
    // Health
    // =========================================================================

    fn ping(&self) -> Result<()> {
        let cf = self.cf(cf::USERS)?;
        self.db.get_cf(&cf, b"__ping__")?;
        Ok(())
    }
}

fn release(reservations: &mut Reservations, user_id: &UserId) {
    if let Some(pending) = reservations.get_mut(user_id) {
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            reservations.remove(user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animate_core::{JobProgress, Plan, Resolution, VideoLength, FREE_MONTHLY_LIMIT};
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn user(s: &str) -> UserId {
        s.parse().unwrap()
    }

    fn chat(user_id: &UserId, prompt: &str) -> ChatRecord {
        ChatRecord {
            id: ChatId::generate(),
            user_id: user_id.clone(),
            prompt: prompt.into(),
            length: VideoLength::Medium,
            resolution: Resolution::Hd,
            code: "from manim import *".into(),
            video_url: "http://localhost:8000/videos/x.mp4".into(),
            storage_key: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn load_usage_creates_and_resets() {
        let (store, _dir) = create_test_store();
        let user_id = user("user_1");
        let may = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();

        let usage = store.load_usage(&user_id, may).unwrap();
        assert_eq!(usage.monthly_count, 0);
        assert!(store.get_usage(&user_id).unwrap().is_some());

        for _ in 0..3 {
            store.consume_generation(&user_id, may).unwrap();
        }
        assert_eq!(store.load_usage(&user_id, may).unwrap().monthly_count, 3);

        let june = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        assert_eq!(store.load_usage(&user_id, june).unwrap().monthly_count, 0);
        assert_eq!(store.get_usage(&user_id).unwrap().unwrap().monthly_count, 0);
    }

    #[test]
    fn credits_never_go_negative() {
        let (store, _dir) = create_test_store();
        let user_id = user("user_2");
        let now = Utc::now();

        store.add_basic_credits(&user_id, 1, now).unwrap();
        assert_eq!(
            store.consume_generation(&user_id, now).unwrap(),
            Consumption::Credit { remaining: 0 }
        );
        assert_eq!(
            store.consume_generation(&user_id, now).unwrap(),
            Consumption::Monthly { used: 1 }
        );
        let usage = store.get_usage(&user_id).unwrap().unwrap();
        assert_eq!(usage.basic_credits, 0);
        assert_eq!(usage.monthly_count, 1);
    }

    #[test]
    fn concurrent_consumption_loses_no_updates() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let user_id = user("user_3");
        let now = Utc::now();
        store.add_basic_credits(&user_id, 10, now).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let user_id = user_id.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        store.consume_generation(&user_id, now).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let usage = store.get_usage(&user_id).unwrap().unwrap();
        assert_eq!(usage.basic_credits, 0);
        assert_eq!(usage.monthly_count, 10);
    }

    #[test]
    fn pro_subscription_toggle() {
        let (store, _dir) = create_test_store();
        let user_id = user("user_4");
        let now = Utc::now();

        let usage = store.set_pro_subscription(&user_id, true, now).unwrap();
        assert_eq!(usage.plan, Plan::Pro);
        assert_eq!(usage.month_reset_at, now + Duration::days(30));

        let mut usage = store.set_pro_subscription(&user_id, false, now).unwrap();
        assert_eq!(usage.plan, Plan::Free);
        assert!(usage.check(now).remaining <= FREE_MONTHLY_LIMIT);
    }

    #[test]
    fn chats_listed_newest_first_and_scoped_to_owner() {
        let (store, _dir) = create_test_store();
        let alice = user("user_a");
        let alice_long = user("user_ab");

        let first = chat(&alice, "first");
        store.put_chat(&first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = chat(&alice, "second");
        store.put_chat(&second).unwrap();
        store.put_chat(&chat(&alice_long, "other")).unwrap();

        let chats = store.list_chats(&alice, 100).unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].prompt, "second");
        assert_eq!(chats[1].prompt, "first");

        let limited = store.list_chats(&alice, 1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].prompt, "second");

        assert_eq!(store.list_chats(&alice_long, 100).unwrap().len(), 1);
        assert!(store.get_chat(&alice_long, &first.id).unwrap().is_none());
    }

    #[test]
    fn delete_chat_requires_owner() {
        let (store, _dir) = create_test_store();
        let owner = user("user_owner");
        let intruder = user("user_intruder");
        let record = chat(&owner, "circle");
        store.put_chat(&record).unwrap();

        assert!(matches!(
            store.delete_chat(&intruder, &record.id),
            Err(StoreError::NotFound)
        ));

        let removed = store.delete_chat(&owner, &record.id).unwrap();
        assert_eq!(removed.id, record.id);
        assert!(store.get_chat(&owner, &record.id).unwrap().is_none());
        assert!(store.list_chats(&owner, 10).unwrap().is_empty());
        assert!(matches!(
            store.delete_chat(&owner, &record.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn job_entries_expire() {
        let (store, _dir) = create_test_store();
        let job_id = JobId::generate();
        let now = Utc::now();
        let entry = JobEntry {
            owner: user("user_5"),
            progress: JobProgress::rendering(),
            expires_at: now + Duration::seconds(60),
        };

        store.put_progress(&job_id, &entry).unwrap();
        store.put_result(&job_id, &entry).unwrap();
        assert_eq!(store.get_progress(&job_id, now).unwrap(), Some(entry.clone()));

        let later = now + Duration::seconds(61);
        assert!(store.get_progress(&job_id, later).unwrap().is_none());
        assert!(store.get_result(&job_id, later).unwrap().is_none());

        assert_eq!(store.purge_expired(now).unwrap(), 0);
        assert_eq!(store.purge_expired(later).unwrap(), 2);
        assert!(store.get_progress(&job_id, now).unwrap().is_none());
    }

    #[test]
    fn reservations_hold_quota_until_settled() {
        let (store, _dir) = create_test_store();
        let user_id = user("user_6");
        let now = Utc::now();
        for _ in 0..FREE_MONTHLY_LIMIT - 1 {
            store.consume_generation(&user_id, now).unwrap();
        }

        assert!(store.reserve_generation(&user_id, now).unwrap().allowed);
        assert!(!store.reserve_generation(&user_id, now).unwrap().allowed);

        store.release_generation(&user_id);
        assert!(store.reserve_generation(&user_id, now).unwrap().allowed);

        store.consume_generation(&user_id, now).unwrap();
        let check = store.reserve_generation(&user_id, now).unwrap();
        assert!(!check.allowed);
        assert_eq!(
            store.get_usage(&user_id).unwrap().unwrap().monthly_count,
            FREE_MONTHLY_LIMIT
        );
    }

    #[test]
    fn concurrent_reservations_admit_only_remaining_quota() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let user_id = user("user_7");
        let now = Utc::now();
        for _ in 0..FREE_MONTHLY_LIMIT - 2 {
            store.consume_generation(&user_id, now).unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let user_id = user_id.clone();
                std::thread::spawn(move || store.reserve_generation(&user_id, now).unwrap().allowed)
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(admitted, 2);
    }

    #[test]
    fn payment_events_apply_once() {
        let (store, _dir) = create_test_store();
        let user_id = user("user_8");
        let now = Utc::now();

        let usage = store
            .apply_usage_event(Some("evt_1"), &user_id, UsageChange::AddBasicCredits(5), now)
            .unwrap();
        assert_eq!(usage.basic_credits, 5);

        assert!(matches!(
            store.apply_usage_event(Some("evt_1"), &user_id, UsageChange::AddBasicCredits(5), now),
            Err(StoreError::DuplicateEvent { event_id }) if event_id == "evt_1"
        ));
        assert_eq!(store.get_usage(&user_id).unwrap().unwrap().basic_credits, 5);

        store
            .apply_usage_event(Some("evt_2"), &user_id, UsageChange::SetPro(true), now)
            .unwrap();
        assert_eq!(store.get_usage(&user_id).unwrap().unwrap().plan, Plan::Pro);
    }

    #[test]
    fn failed_payment_event_can_be_replayed() {
        let (store, _dir) = create_test_store();
        let user_id = user("user_9");
        let now = Utc::now();

        // An unreadable usage record makes the apply fail.
        let cf_users = store.cf(cf::USERS).unwrap();
        store
            .db
            .put_cf(&cf_users, keys::usage_key(&user_id), b"not cbor")
            .unwrap();
        drop(cf_users);

        assert!(matches!(
            store.apply_usage_event(Some("evt_1"), &user_id, UsageChange::AddBasicCredits(5), now),
            Err(StoreError::Serialization(_))
        ));

        store.put_usage(&UserUsage::new(user_id.clone(), now)).unwrap();
        let usage = store
            .apply_usage_event(Some("evt_1"), &user_id, UsageChange::AddBasicCredits(5), now)
            .unwrap();
        assert_eq!(usage.basic_credits, 5);
    }

    #[test]
    fn ping_succeeds_on_open_store() {
        let (store, _dir) = create_test_store();
        store.ping().unwrap();
    }
}
