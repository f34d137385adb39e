//! Prompt-to-animate HTTP API service.
//!
//! This crate provides the HTTP API that turns prompts into rendered
//! animations:
//!
//! - Generation, blocking (`/generate`) or streamed over SSE (`/generate-stream`)
//! - Job status polling
//! - Chat history (list, fetch, delete)
//! - Usage and tier reporting
//! - Payment webhooks that grant credits and toggle subscriptions
//!
//! # Architecture
//!
//! Requests never render inline. Handlers enqueue a [`Job`](animate_core::Job)
//! on an in-process queue, a worker pool runs the pipeline (LLM, Manim,
//! upload) and records progress in the store, and handlers poll that
//! progress to answer or stream.
//!
//! # Authentication
//!
//! End users authenticate with Clerk session JWTs, validated against the
//! issuer's JWKS.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for routing

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod llm;
pub mod render;
pub mod routes;
pub mod state;
pub mod storage;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use jobs::{spawn_janitor, spawn_workers, JobQueue};
pub use llm::{CodeGenerator, LlmClient, LlmError};
pub use render::SceneRenderer;
pub use routes::create_router;
pub use state::AppState;
pub use storage::{LocalStorage, S3Storage, StorageError, StoredVideo, VideoStorage};
