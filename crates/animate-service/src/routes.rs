//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{chats, generate, health, jobs, usage, webhooks};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /videos/*` - Locally stored videos
///
/// ## Generation (Clerk JWT auth, no request timeout)
/// - `POST /generate` - Generate and wait for the video
/// - `POST /generate-stream` - Generate with SSE progress
///
/// ## User data (Clerk JWT auth, owner only)
/// - `GET /job/:job_id/status` - Job progress
/// - `GET /chats/:clerk_id` - List chats
/// - `GET /chats/:clerk_id/:chat_id` - Get a chat
/// - `DELETE /chats/:clerk_id/:chat_id` - Delete a chat and its video
/// - `GET /usage/:clerk_id` - Tier, quota and credits
///
/// ## Webhooks (Signature verification)
/// - `POST /webhook/payment` - Payment events
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;
    let media_dir = state.config.media_dir.clone();

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Generation requests run as long as the job does.
    let generation_routes = Router::new()
        .route("/generate", post(generate::generate))
        .route("/generate-stream", post(generate::generate_stream));

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/job/:job_id/status", get(jobs::job_status))
        .route("/chats/:clerk_id", get(chats::list_chats))
        .route(
            "/chats/:clerk_id/:chat_id",
            get(chats::get_chat).delete(chats::delete_chat),
        )
        .route("/usage/:clerk_id", get(usage::get_usage))
        .route("/webhook/payment", post(webhooks::payment_webhook))
        .nest_service("/videos", ServeDir::new(media_dir))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )));

    Router::new()
        .merge(generation_routes)
        .merge(api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([generate::JOB_ID_HEADER])
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([generate::JOB_ID_HEADER])
    }
}
