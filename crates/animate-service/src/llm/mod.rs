//! Scene code generation with a language model.

mod client;
pub mod prompt;

pub use client::LlmClient;

use animate_core::VideoLength;
use async_trait::async_trait;

/// Errors from the code generator.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No API key was configured.
    #[error("LLM API key not configured")]
    NotConfigured,

    /// Transport failure.
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("LLM API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The reply held no code.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

/// Produces Manim scene source for a prompt.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Generate scene code for `prompt` targeting `length`.
    async fn generate(&self, prompt: &str, length: VideoLength) -> Result<String, LlmError>;
}
