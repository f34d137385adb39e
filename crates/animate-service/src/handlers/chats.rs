//! Chat history handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use animate_core::{ChatId, ChatListResponse, ChatRecord, ChatResponse};
use animate_store::{Store, StoreError};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Most chats returned by a listing.
const MAX_CHATS: usize = 100;

/// Chat deletion response.
#[derive(Debug, Serialize)]
pub struct DeleteChatResponse {
    /// Confirmation message.
    pub message: String,
    /// The deleted chat.
    pub id: String,
}

/// List the caller's chats, newest first.
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(clerk_id): Path<String>,
) -> Result<Json<ChatListResponse>, ApiError> {
    let user_id = auth.ensure_owner(&clerk_id)?;

    let records = state.store.list_chats(&user_id, MAX_CHATS)?;
    let mut chats = Vec::with_capacity(records.len());
    for record in records {
        chats.push(with_fresh_url(&state, record).await);
    }

    Ok(Json(ChatListResponse {
        total: chats.len(),
        chats,
    }))
}

/// Fetch one of the caller's chats.
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((clerk_id, chat_id)): Path<(String, String)>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = auth.ensure_owner(&clerk_id)?;
    let chat_id = parse_chat_id(&chat_id)?;

    let record = state
        .store
        .get_chat(&user_id, &chat_id)?
        .ok_or_else(|| ApiError::NotFound("Chat not found".into()))?;

    Ok(Json(with_fresh_url(&state, record).await))
}

/// Delete one of the caller's chats and its video.
pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((clerk_id, chat_id)): Path<(String, String)>,
) -> Result<Json<DeleteChatResponse>, ApiError> {
    let user_id = auth.ensure_owner(&clerk_id)?;
    let chat_id = parse_chat_id(&chat_id)?;

    let record = state
        .store
        .delete_chat(&user_id, &chat_id)
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("Chat not found".into()),
            other => other.into(),
        })?;

    if !record.storage_key.is_empty() {
        if let Err(e) = state.storage.delete(&record.storage_key).await {
            tracing::warn!(
                chat_id = %chat_id,
                key = %record.storage_key,
                error = %e,
                "Failed to delete stored video"
            );
        }
    }

    tracing::info!(chat_id = %chat_id, user_id = %user_id, "Chat deleted");

    Ok(Json(DeleteChatResponse {
        message: "Chat deleted successfully".into(),
        id: chat_id.to_string(),
    }))
}

fn parse_chat_id(chat_id: &str) -> Result<ChatId, ApiError> {
    chat_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid chat id: {chat_id}")))
}

/// Convert a record for the client, minting a fresh URL when possible.
///
/// Signed URLs expire, so a stored URL is only used if signing fails.
async fn with_fresh_url(state: &AppState, record: ChatRecord) -> ChatResponse {
    let url = if record.storage_key.is_empty() {
        record.video_url.clone()
    } else {
        match state.storage.url_for(&record.storage_key).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    chat_id = %record.id,
                    error = %e,
                    "Failed to refresh video URL, using stored one"
                );
                record.video_url.clone()
            }
        }
    };
    record.into_response(url)
}
