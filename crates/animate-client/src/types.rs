//! Request and response types for the animate client.

use serde::Deserialize;

pub use animate_core::{
    ChatListResponse, ChatResponse, GenerateResponse, JobProgress, JobStatus, RenderRequest,
    Resolution, UsageSummary, VideoLength,
};

/// Response to deleting a chat.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteChatResponse {
    /// Confirmation message.
    pub message: String,
    /// The deleted chat.
    pub id: String,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
