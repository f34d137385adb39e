//! Animate HTTP client implementation.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::{Client, RequestBuilder};

use animate_core::{ChatId, JobId, UserId};

use crate::error::ClientError;
use crate::sse::SseDecoder;
use crate::types::{
    ApiErrorResponse, ChatListResponse, ChatResponse, DeleteChatResponse, GenerateResponse,
    JobProgress, RenderRequest, UsageSummary,
};

/// Response header carrying the id of a streamed job.
const JOB_ID_HEADER: &str = "x-job-id";

/// Prompt-to-animate API client.
///
/// Every request carries the user's session token as a bearer token.
#[derive(Debug, Clone)]
pub struct AnimateClient {
    client: Client,
    base_url: String,
    token: String,
    generation_timeout: Duration,
}

impl AnimateClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://localhost:8000"`)
    /// * `token` - Session JWT of the signed-in user
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, token, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            generation_timeout: Duration::from_secs(options.generation_timeout_seconds),
        })
    }

    /// Generate an animation and wait for the finished video.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` or `TierRestricted` when the request is denied,
    /// or an API error if the job fails or times out.
    pub async fn generate(&self, request: &RenderRequest) -> Result<GenerateResponse, ClientError> {
        let response = self
            .post("/generate")
            .timeout(self.generation_timeout)
            .json(request)
            .send()
            .await?;

        handle_response(response).await
    }

    /// Generate an animation, following its progress as it happens.
    ///
    /// The stream yields each progress message and ends after the first
    /// terminal one (`complete` or `error`). Quota and tier denials arrive as
    /// a single `error` progress, not as an `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected before streaming starts
    /// (authentication, invalid prompt).
    pub async fn generate_stream(
        &self,
        request: &RenderRequest,
    ) -> Result<ProgressStream, ClientError> {
        let response = self
            .post("/generate-stream")
            .timeout(self.generation_timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let job_id: Option<JobId> = response
            .headers()
            .get(JOB_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        tracing::debug!(job_id = ?job_id, "Progress stream opened");

        let state = StreamState {
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            decoder: SseDecoder::default(),
            done: false,
        };

        Ok(ProgressStream {
            job_id,
            inner: stream::unfold(state, next_progress).boxed(),
        })
    }

    /// Get the latest progress of a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the job belongs to someone else.
    pub async fn job_status(&self, job_id: &JobId) -> Result<JobProgress, ClientError> {
        let response = self.get(&format!("/job/{job_id}/status")).send().await?;
        handle_response(response).await
    }

    /// List a user's chats, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_chats(&self, user_id: &UserId) -> Result<ChatListResponse, ClientError> {
        let response = self.get(&format!("/chats/{user_id}")).send().await?;
        handle_response(response).await
    }

    /// Get one chat.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the chat does not exist.
    pub async fn get_chat(
        &self,
        user_id: &UserId,
        chat_id: &ChatId,
    ) -> Result<ChatResponse, ClientError> {
        let response = self
            .get(&format!("/chats/{user_id}/{chat_id}"))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Delete a chat and its video.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the chat does not exist.
    pub async fn delete_chat(
        &self,
        user_id: &UserId,
        chat_id: &ChatId,
    ) -> Result<DeleteChatResponse, ClientError> {
        let url = format!("{}/chats/{user_id}/{chat_id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Get a user's tier, quota and credits.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn usage(&self, user_id: &UserId) -> Result<UsageSummary, ClientError> {
        let response = self.get(&format!("/usage/{user_id}")).send().await?;
        handle_response(response).await
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }
}

/// Progress messages of a streamed job.
pub struct ProgressStream {
    job_id: Option<JobId>,
    inner: BoxStream<'static, Result<JobProgress, ClientError>>,
}

impl ProgressStream {
    /// Id of the job, when the server assigned one.
    ///
    /// Requests denied before queueing have no job.
    #[must_use]
    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }
}

impl std::fmt::Debug for ProgressStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStream")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

impl Stream for ProgressStream {
    type Item = Result<JobProgress, ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    done: bool,
}

async fn next_progress(
    mut state: StreamState,
) -> Option<(Result<JobProgress, ClientError>, StreamState)> {
    if state.done {
        return None;
    }

    loop {
        if let Some(data) = state.decoder.next_event() {
            let item = serde_json::from_str::<JobProgress>(&data).map_err(ClientError::from);
            state.done = item.as_ref().map_or(true, |p| p.status.is_terminal());
            return Some((item, state));
        }

        match state.body.next().await {
            Some(Ok(chunk)) => state.decoder.push(&chunk),
            Some(Err(e)) => {
                state.done = true;
                return Some((Err(e.into()), state));
            }
            None => return None,
        }
    }
}

/// Handle API response and convert errors.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if response.status().is_success() {
        return Ok(response.json().await?);
    }
    Err(error_from_response(response).await)
}

async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status();

    match response.json::<ApiErrorResponse>().await {
        Ok(api_error) => {
            let error = api_error.error;
            match error.code.as_str() {
                "quota_exceeded" => ClientError::QuotaExceeded {
                    message: error.message,
                },
                "tier_restricted" => ClientError::TierRestricted {
                    message: error.message,
                    details: error.details,
                },
                _ => ClientError::Api {
                    code: error.code,
                    message: error.message,
                    status: status.as_u16(),
                },
            }
        }
        Err(_) => ClientError::Api {
            code: "unknown".to_string(),
            message: format!("HTTP {status}"),
            status: status.as_u16(),
        },
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Timeout for generation requests, which last as long as the job (default: 660).
    pub generation_timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            generation_timeout_seconds: 660,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = AnimateClient::new("http://localhost:8000/", "token").unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn client_options() {
        let options = ClientOptions {
            generation_timeout_seconds: 60,
            ..ClientOptions::default()
        };
        let client = AnimateClient::with_options("http://localhost:8000", "token", options).unwrap();
        assert_eq!(client.generation_timeout, Duration::from_secs(60));
    }
}
