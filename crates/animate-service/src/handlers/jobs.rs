//! Job status handler.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;

use animate_core::{JobId, JobProgress, JobStatus};
use animate_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Current progress of a job, for clients polling instead of streaming.
///
/// Unknown or expired jobs read as pending.
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(job_id): Path<String>,
) -> Result<Json<JobProgress>, ApiError> {
    let job_id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid job id: {job_id}")))?;

    let now = Utc::now();
    let entry = match state.store.get_progress(&job_id, now)? {
        Some(entry) => Some(entry),
        None => state.store.get_result(&job_id, now)?,
    };

    let Some(entry) = entry else {
        return Ok(Json(JobProgress::new(
            JobStatus::Pending,
            "Job is queued or not found",
        )));
    };

    if entry.owner != auth.user_id {
        tracing::warn!(
            job_id = %job_id,
            caller = %auth.user_id,
            "Rejected job status request from non-owner"
        );
        return Err(ApiError::Forbidden);
    }

    Ok(Json(entry.progress))
}
