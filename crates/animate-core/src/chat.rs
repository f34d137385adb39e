//! Chat history records and their wire representations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::render::{Resolution, VideoLength};
use crate::{ChatId, UserId};

/// A stored generation: the prompt, its settings, the code and the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    /// Unique identifier.
    pub id: ChatId,

    /// Owner of the record.
    pub user_id: UserId,

    /// The prompt as submitted.
    pub prompt: String,

    /// Requested duration.
    pub length: VideoLength,

    /// Requested resolution.
    pub resolution: Resolution,

    /// Generated scene source.
    pub code: String,

    /// Video URL at the time of generation (signed URLs may have expired).
    pub video_url: String,

    /// Key of the video in the storage backend it was saved to.
    #[serde(default)]
    pub storage_key: String,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl ChatRecord {
    /// Convert to the client representation using `video_url` as the link.
    #[must_use]
    pub fn into_response(self, video_url: String) -> ChatResponse {
        ChatResponse {
            id: self.id.to_string(),
            prompt: self.prompt,
            length: self.length,
            resolution: self.resolution,
            code: self.code,
            video_url,
            created_at: self.created_at,
        }
    }
}

/// A chat history entry as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Chat identifier.
    pub id: String,
    /// The prompt as submitted.
    pub prompt: String,
    /// Requested duration.
    pub length: VideoLength,
    /// Requested resolution.
    pub resolution: Resolution,
    /// Generated scene source.
    pub code: String,
    /// A currently valid video URL.
    pub video_url: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Response for listing a user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatListResponse {
    /// Entries, newest first.
    pub chats: Vec<ChatResponse>,
    /// Number of entries returned.
    pub total: usize,
}

/// Response for a blocking generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Where the rendered video can be fetched.
    pub video_url: String,
    /// The generated scene source.
    pub code: String,
}
