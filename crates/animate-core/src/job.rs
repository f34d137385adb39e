//! Render jobs and the progress messages they publish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::render::RenderRequest;
use crate::{ChatId, JobId, UserId};

/// Pipeline stage of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not yet picked up.
    Pending,
    /// Worker picked the job up.
    Analyzing,
    /// Waiting on the language model.
    Generating,
    /// Scene source is available.
    CodeReady,
    /// Renderer is running.
    Rendering,
    /// Uploading and saving history.
    Finalizing,
    /// Video is ready.
    Complete,
    /// The job failed.
    Error,
}

impl JobStatus {
    /// Numeric step reported to clients (`-1` for errors).
    #[must_use]
    pub const fn step(self) -> i8 {
        match self {
            Self::Pending => 0,
            Self::Analyzing => 1,
            Self::Generating => 2,
            Self::CodeReady => 3,
            Self::Rendering => 4,
            Self::Finalizing => 5,
            Self::Complete => 6,
            Self::Error => -1,
        }
    }

    /// Whether no further progress will follow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// A progress message for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Numeric step, see [`JobStatus::step`].
    pub step: i8,

    /// Stage name.
    pub status: JobStatus,

    /// Human-readable message.
    pub message: String,

    /// Set on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Set once code is generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Set on completion when history was saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
}

impl JobProgress {
    /// Progress for `status` with a message.
    #[must_use]
    pub fn new(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            step: status.step(),
            status,
            message: message.into(),
            video_url: None,
            code: None,
            chat_id: None,
        }
    }

    /// Job is queued.
    #[must_use]
    pub fn pending() -> Self {
        Self::new(JobStatus::Pending, "Queued")
    }

    /// Worker has started.
    #[must_use]
    pub fn analyzing() -> Self {
        Self::new(JobStatus::Analyzing, "Analyzing prompt...")
    }

    /// Waiting on the language model.
    #[must_use]
    pub fn generating() -> Self {
        Self::new(JobStatus::Generating, "Generating Manim code with AI...")
    }

    /// Code generated, carrying the source.
    #[must_use]
    pub fn code_ready(code: impl Into<String>) -> Self {
        let mut progress = Self::new(JobStatus::CodeReady, "Code generated successfully!");
        progress.code = Some(code.into());
        progress
    }

    /// Renderer is running.
    #[must_use]
    pub fn rendering() -> Self {
        Self::new(JobStatus::Rendering, "Rendering animation...")
    }

    /// Uploading and saving history.
    #[must_use]
    pub fn finalizing() -> Self {
        Self::new(JobStatus::Finalizing, "Finalizing video...")
    }

    /// Job finished.
    #[must_use]
    pub fn complete(video_url: String, code: String, chat_id: Option<ChatId>) -> Self {
        Self {
            step: JobStatus::Complete.step(),
            status: JobStatus::Complete,
            message: "Video ready!".into(),
            video_url: Some(video_url),
            code: Some(code),
            chat_id,
        }
    }

    /// Job failed.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(JobStatus::Error, message)
    }

    /// Whether no further progress will follow.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A unit of work for the render workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier handed to the client.
    pub id: JobId,
    /// Who submitted it.
    pub user_id: UserId,
    /// What to render.
    pub request: RenderRequest,
    /// When it was queued.
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    /// Create a job with a fresh identifier.
    #[must_use]
    pub fn new(user_id: UserId, request: RenderRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::generate(),
            user_id,
            request,
            enqueued_at: now,
        }
    }
}
