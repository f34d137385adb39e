//! Usage handler.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;

use animate_core::UsageSummary;
use animate_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// The caller's tier, quota and credits.
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(clerk_id): Path<String>,
) -> Result<Json<UsageSummary>, ApiError> {
    let user_id = auth.ensure_owner(&clerk_id)?;
    let usage = state.store.load_usage(&user_id, Utc::now())?;
    Ok(Json(usage.summary()))
}
