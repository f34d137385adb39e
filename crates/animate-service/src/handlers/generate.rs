//! Generation handlers: blocking and streamed over SSE.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{HeaderName, HeaderValue, CACHE_CONTROL};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;

use animate_core::{GenerateResponse, Job, JobId, JobProgress, JobStatus, RenderRequest, UserId};
use animate_store::{JobEntry, Store};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::jobs::QueueError;
use crate::state::AppState;

/// Response header carrying the id of a streamed job.
pub const JOB_ID_HEADER: HeaderName = HeaderName::from_static("x-job-id");

/// Message sent when a streamed job outlives its poll budget.
const STREAM_TIMEOUT_MESSAGE: &str = "Job timed out. Please try again.";

/// Generation request body.
#[derive(Debug, Deserialize)]
pub struct AnimationRequest {
    /// Prompt and render settings.
    #[serde(flatten)]
    pub request: RenderRequest,
    /// Caller's user id as the front end knows it; must match the token.
    #[serde(default)]
    pub clerk_id: Option<String>,
}

/// Generate an animation and wait for it.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<AnimationRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let (user_id, request) = admit(&auth, body)?;
    reserve_quota(&state, &user_id, &request)?;
    let job_id = enqueue(&state, user_id, request)?;

    let timeout = Duration::from_secs(state.config.job_timeout_seconds);
    let interval = Duration::from_millis(state.config.generate_poll_interval_ms.max(1));
    // `None` when the timeout is too large to represent: wait indefinitely.
    let deadline = tokio::time::Instant::now().checked_add(timeout);

    loop {
        if let Some(entry) = state.store.get_result(&job_id, Utc::now())? {
            let progress = entry.progress;
            return match progress.status {
                JobStatus::Complete => match (progress.video_url, progress.code) {
                    (Some(video_url), Some(code)) => Ok(Json(GenerateResponse { video_url, code })),
                    _ => Err(ApiError::Internal(format!(
                        "job {job_id} completed without a result"
                    ))),
                },
                _ => Err(ApiError::JobFailed(progress.message)),
            };
        }

        if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
            tracing::warn!(job_id = %job_id, "Generation request timed out");
            return Err(ApiError::Timeout);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Generate an animation, streaming progress as server-sent events.
///
/// Each event's data is a JSON [`JobProgress`]. The stream ends after the
/// `complete` or `error` event. The job id is returned in `x-job-id`.
pub async fn generate_stream(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<AnimationRequest>,
) -> Result<Response, ApiError> {
    let (user_id, request) = admit(&auth, body)?;

    let (job_id, events): (Option<JobId>, BoxStream<'static, JobProgress>) =
        match reserve_quota(&state, &user_id, &request) {
            Ok(()) => {
                let job_id = enqueue(&state, user_id, request)?;
                (Some(job_id), progress_stream(state, job_id))
            }
            Err(ApiError::QuotaExceeded(reason)) => (
                None,
                stream::once(async move { JobProgress::error(reason) }).boxed(),
            ),
            Err(ApiError::TierRestricted(err)) => {
                let message = err.to_string();
                (
                    None,
                    stream::once(async move { JobProgress::error(message) }).boxed(),
                )
            }
            Err(other) => return Err(other),
        };

    let sse = Sse::new(events.map(|progress| Ok::<_, Infallible>(to_event(&progress))))
        .keep_alive(KeepAlive::default());

    let mut response = (
        [
            (CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    )
        .into_response();

    if let Some(job_id) = job_id {
        if let Ok(value) = HeaderValue::from_str(&job_id.to_string()) {
            response.headers_mut().insert(JOB_ID_HEADER, value);
        }
    }

    Ok(response)
}

/// Resolve the caller and validate the request.
fn admit(auth: &AuthUser, body: AnimationRequest) -> Result<(UserId, RenderRequest), ApiError> {
    if let Some(clerk_id) = body.clerk_id.as_deref() {
        auth.ensure_owner(clerk_id)?;
    }
    body.request.validate()?;
    Ok((auth.user_id.clone(), body.request))
}

/// Check the caller's tier allows this request, then reserve one generation
/// of their quota.
///
/// The reservation is settled by the pipeline, or released by `enqueue` if
/// the job never reaches the queue.
fn reserve_quota(
    state: &AppState,
    user_id: &UserId,
    request: &RenderRequest,
) -> Result<(), ApiError> {
    let now = Utc::now();
    let usage = state.store.load_usage(user_id, now)?;
    usage.check_settings(request.length, request.resolution)?;

    let check = state.store.reserve_generation(user_id, now)?;
    if !check.allowed {
        tracing::info!(user_id = %user_id, reason = %check.reason, "Generation denied");
        return Err(ApiError::QuotaExceeded(check.reason));
    }

    tracing::debug!(
        user_id = %user_id,
        tier = %check.tier,
        remaining = check.remaining,
        "Generation allowed"
    );
    Ok(())
}

/// Hand the job to the workers, releasing its reservation if that fails.
fn enqueue(state: &AppState, user_id: UserId, request: RenderRequest) -> Result<JobId, ApiError> {
    let owner = user_id.clone();
    let result = submit(state, user_id, request);
    if result.is_err() {
        state.store.release_generation(&owner);
    }
    result
}

/// Record the job as pending and push it onto the queue.
fn submit(state: &AppState, user_id: UserId, request: RenderRequest) -> Result<JobId, ApiError> {
    let now = Utc::now();
    let job = Job::new(user_id, request, now);
    let job_id = job.id;

    let ttl = chrono::Duration::from_std(Duration::from_secs(state.config.job_ttl_seconds))
        .unwrap_or_else(|_| chrono::Duration::hours(1));
    let entry = JobEntry {
        owner: job.user_id.clone(),
        progress: JobProgress::pending(),
        expires_at: now + ttl,
    };
    state.store.put_progress(&job_id, &entry)?;

    tracing::info!(job_id = %job_id, user_id = %job.user_id, "Enqueueing generation job");

    if let Err(e) = state.queue.push(job) {
        tracing::warn!(job_id = %job_id, error = %e, "Failed to enqueue job");
        let failed = JobEntry {
            progress: JobProgress::error("Generation queue is unavailable"),
            ..entry
        };
        state.store.put_progress(&job_id, &failed)?;
        return Err(ApiError::ServiceUnavailable(match e {
            QueueError::Full => "Too many generations in progress. Please try again shortly.".into(),
            QueueError::Closed => "Generation workers are not running".into(),
        }));
    }

    Ok(job_id)
}

struct PollState {
    app: Arc<AppState>,
    job_id: JobId,
    interval: Duration,
    max_polls: u64,
    polls: u64,
    last_step: i8,
    finished: bool,
}

/// Poll the job's progress, yielding each step change and ending after a
/// terminal event or a timeout error.
fn progress_stream(app: Arc<AppState>, job_id: JobId) -> BoxStream<'static, JobProgress> {
    let interval_ms = app.config.stream_poll_interval_ms.max(1);
    let max_polls = (app.config.job_timeout_seconds.saturating_mul(1000) / interval_ms).max(1);

    let poll = PollState {
        app,
        job_id,
        interval: Duration::from_millis(interval_ms),
        max_polls,
        polls: 0,
        last_step: JobStatus::Pending.step(),
        finished: false,
    };

    stream::unfold(poll, |mut poll| async move {
        if poll.finished {
            return None;
        }
        loop {
            if poll.polls >= poll.max_polls {
                tracing::warn!(job_id = %poll.job_id, "Progress stream timed out");
                poll.finished = true;
                return Some((JobProgress::error(STREAM_TIMEOUT_MESSAGE), poll));
            }
            poll.polls += 1;

            if let Some(progress) = read_progress(&poll.app, &poll.job_id) {
                if progress.step != poll.last_step || progress.is_terminal() {
                    poll.last_step = progress.step;
                    poll.finished = progress.is_terminal();
                    return Some((progress, poll));
                }
            }

            tokio::time::sleep(poll.interval).await;
        }
    })
    .boxed()
}

/// Latest progress for a job, falling back to its final result.
fn read_progress(state: &AppState, job_id: &JobId) -> Option<JobProgress> {
    let now = Utc::now();
    let lookup = state
        .store
        .get_progress(job_id, now)
        .and_then(|progress| match progress {
            Some(entry) => Ok(Some(entry)),
            None => state.store.get_result(job_id, now),
        });

    match lookup {
        Ok(entry) => entry.map(|e| e.progress),
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Failed to read job progress");
            None
        }
    }
}

fn to_event(progress: &JobProgress) -> Event {
    Event::default().json_data(progress).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode progress event");
        Event::default().data(r#"{"step":-1,"status":"error","message":"Internal error"}"#)
    })
}
