//! The generation pipeline run by workers for each job.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use animate_core::{ChatId, ChatRecord, Job, JobProgress};
use animate_render::RenderError;
use animate_store::{JobEntry, Store};

use crate::llm::LlmError;
use crate::state::AppState;
use crate::storage::StorageError;

/// Why a job failed. The display text is what the user sees.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The language model call failed.
    #[error("Code generation failed: {0}")]
    Generation(#[from] LlmError),

    /// Manim failed or produced no video.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// The video could not be stored.
    #[error("Failed to store video: {0}")]
    Storage(#[from] StorageError),

    /// The whole pipeline ran past its deadline.
    #[error("Job timed out after {0:?}")]
    Timeout(Duration),
}

/// Run `job` to completion, recording progress and the final result.
#[instrument(skip(state, job), fields(job_id = %job.id, user_id = %job.user_id))]
pub async fn process_job(state: &AppState, job: Job) {
    let timeout = Duration::from_secs(state.config.job_timeout_seconds);
    info!("job started");

    let outcome = match tokio::time::timeout(timeout, run_pipeline(state, &job)).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout(timeout)),
    };

    let final_progress = match outcome {
        Ok(progress) => {
            info!("job complete");
            progress
        }
        Err(e) => {
            warn!(error = %e, "job failed");
            // Failed jobs are not charged.
            state.store.release_generation(&job.user_id);
            JobProgress::error(e.to_string())
        }
    };

    report(state, &job, final_progress.clone());
    let entry = entry_for(state, &job, final_progress);
    if let Err(e) = state.store.put_result(&job.id, &entry) {
        error!(error = %e, "failed to record job result");
    }
}

async fn run_pipeline(state: &AppState, job: &Job) -> Result<JobProgress, PipelineError> {
    let request = &job.request;

    report(state, job, JobProgress::analyzing());

    report(state, job, JobProgress::generating());
    let code = state
        .generator
        .generate(&request.prompt, request.length)
        .await?;
    report(state, job, JobProgress::code_ready(code.clone()));

    report(state, job, JobProgress::rendering());
    let video = state.renderer.render(&code, request.resolution).await?;

    report(state, job, JobProgress::finalizing());
    let stored = state.storage.store(&video.path, &video.file_name).await?;

    let now = Utc::now();
    let chat = ChatRecord {
        id: ChatId::generate(),
        user_id: job.user_id.clone(),
        prompt: request.prompt.clone(),
        length: request.length,
        resolution: request.resolution,
        code: code.clone(),
        video_url: stored.url.clone(),
        storage_key: stored.key,
        created_at: now,
    };
    let chat_id = match state.store.put_chat(&chat) {
        Ok(()) => Some(chat.id),
        Err(e) => {
            error!(error = %e, "failed to save chat history");
            None
        }
    };

    match state.store.consume_generation(&job.user_id, now) {
        Ok(consumption) => info!(?consumption, "usage recorded"),
        Err(e) => error!(error = %e, "failed to record usage"),
    }

    Ok(JobProgress::complete(stored.url, code, chat_id))
}

fn entry_for(state: &AppState, job: &Job, progress: JobProgress) -> JobEntry {
    let ttl = chrono::Duration::from_std(Duration::from_secs(state.config.job_ttl_seconds))
        .unwrap_or_else(|_| chrono::Duration::hours(1));
    JobEntry {
        owner: job.user_id.clone(),
        progress,
        expires_at: Utc::now() + ttl,
    }
}

/// Record the latest progress. Failures are logged; the job keeps going.
fn report(state: &AppState, job: &Job, progress: JobProgress) {
    let entry = entry_for(state, job, progress);
    if let Err(e) = state.store.put_progress(&job.id, &entry) {
        error!(error = %e, step = entry.progress.step, "failed to record job progress");
    }
}
