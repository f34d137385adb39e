//! Key encoding utilities for `RocksDB`.
//!
//! User ids are variable length, so owner-index keys put a `0x00` byte between
//! the user id and the chat id. User ids never contain `0x00`, which keeps one
//! user's prefix from matching another's (`user_a` vs `user_ab`).

use animate_core::{ChatId, JobId, UserId};

const SEPARATOR: u8 = 0x00;

/// Create a usage key from a user ID.
#[must_use]
pub fn usage_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a chat key from a chat ID.
#[must_use]
pub fn chat_key(chat_id: &ChatId) -> Vec<u8> {
    chat_id.to_bytes().to_vec()
}

/// Create a user-chat index key.
///
/// Format: `user_id || 0x00 || chat_id (16 bytes)`
///
/// Since ULIDs are time-ordered, a user's chats sort by creation time.
#[must_use]
pub fn user_chat_key(user_id: &UserId, chat_id: &ChatId) -> Vec<u8> {
    let mut key = user_chats_prefix(user_id);
    key.extend_from_slice(&chat_id.to_bytes());
    key
}

/// Create a prefix for iterating all chats for a user.
#[must_use]
pub fn user_chats_prefix(user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.as_bytes().len() + 17);
    key.extend_from_slice(user_id.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Smallest key sorting after every key with the user's prefix.
#[must_use]
pub fn user_chats_upper_bound(user_id: &UserId) -> Vec<u8> {
    let mut key = user_id.as_bytes().to_vec();
    key.push(SEPARATOR + 1);
    key
}

/// Extract the chat ID from a user-chat index key.
///
/// Returns `None` if the key is shorter than a chat ID.
#[must_use]
pub fn extract_chat_id_from_user_key(key: &[u8]) -> Option<ChatId> {
    let start = key.len().checked_sub(16)?;
    let bytes: [u8; 16] = key[start..].try_into().ok()?;
    Some(ChatId::from_bytes(bytes))
}

/// Create a job key from a job ID.
#[must_use]
pub fn job_key(job_id: &JobId) -> Vec<u8> {
    job_id.as_bytes().to_vec()
}

/// Create a webhook event key from an event ID.
#[must_use]
pub fn webhook_event_key(event_id: &str) -> Vec<u8> {
    event_id.as_bytes().to_vec()
}
