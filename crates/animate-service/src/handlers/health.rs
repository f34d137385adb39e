//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use animate_store::Store;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when a dependency is failing.
    pub status: String,
    /// Per-dependency status.
    pub services: ServicesStatus,
    /// Service version.
    pub version: String,
}

/// Status of each backing service.
#[derive(Debug, Serialize)]
pub struct ServicesStatus {
    /// `connected` or the store error.
    pub store: String,
    /// Queue occupancy, e.g. `3/256 queued`.
    pub queue: String,
    /// Active video storage backend.
    pub storage: String,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (store, healthy) = match state.store.ping() {
        Ok(()) => ("connected".to_string(), true),
        Err(e) => {
            tracing::error!(error = %e, "Store health check failed");
            (format!("error: {e}"), false)
        }
    };

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        services: ServicesStatus {
            store,
            queue: format!("{}/{} queued", state.queue.depth(), state.queue.capacity()),
            storage: state.storage.name().to_string(),
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
