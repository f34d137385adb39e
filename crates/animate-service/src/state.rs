//! Application state.

use std::sync::Arc;
use std::time::Duration;

use animate_render::{ManimRenderer, RenderConfig};
use animate_store::RocksStore;

use crate::config::ServiceConfig;
use crate::jobs::JobQueue;
use crate::llm::{CodeGenerator, LlmClient, LlmError};
use crate::render::SceneRenderer;
use crate::storage::{LocalStorage, S3Storage, VideoStorage};

/// Application state shared across handlers and workers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Produces scene code from prompts.
    pub generator: Arc<dyn CodeGenerator>,

    /// Renders scene code to video.
    pub renderer: Arc<dyn SceneRenderer>,

    /// Where finished videos are kept.
    pub storage: Arc<dyn VideoStorage>,

    /// Pending generation jobs.
    pub queue: JobQueue,
}

impl AppState {
    /// Build the state with the production backends described by `config`.
    ///
    /// Falls back to local video storage when S3 or CloudFront is not
    /// configured or cannot be set up.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` if the LLM HTTP client cannot be built.
    pub async fn from_config(store: Arc<RocksStore>, config: ServiceConfig) -> Result<Self, LlmError> {
        if config.llm_api_key.is_none() {
            tracing::warn!("GROQ_API_KEY not configured - generation requests will fail");
        }
        let generator = LlmClient::new(
            &config.llm_base_url,
            config.llm_api_key.as_deref(),
            &config.llm_model,
            Duration::from_secs(config.llm_timeout_seconds),
        )?;

        let renderer = ManimRenderer::new(
            RenderConfig::new()
                .with_python(&config.manim_python)
                .with_work_dir(&config.work_dir)
                .with_media_dir(&config.media_dir)
                .with_timeout(Duration::from_secs(config.job_timeout_seconds)),
        );

        let local = || -> Arc<dyn VideoStorage> {
            Arc::new(LocalStorage::new(&config.media_dir, &config.public_base_url))
        };
        let storage = match (&config.aws, &config.cloudfront) {
            (Some(aws), Some(cloudfront)) => match S3Storage::connect(aws, cloudfront).await {
                Ok(s3) => Arc::new(s3) as Arc<dyn VideoStorage>,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to set up S3 storage - storing videos locally");
                    local()
                }
            },
            _ => {
                tracing::warn!("S3/CloudFront not configured - storing videos locally");
                local()
            }
        };

        Ok(Self::with_backends(
            store,
            config,
            Arc::new(generator),
            Arc::new(renderer),
            storage,
        ))
    }

    /// Build the state from explicit backends.
    #[must_use]
    pub fn with_backends(
        store: Arc<RocksStore>,
        config: ServiceConfig,
        generator: Arc<dyn CodeGenerator>,
        renderer: Arc<dyn SceneRenderer>,
        storage: Arc<dyn VideoStorage>,
    ) -> Self {
        let queue = JobQueue::new(config.queue_capacity);
        tracing::info!(storage = storage.name(), "Video storage ready");
        Self {
            store,
            config,
            generator,
            renderer,
            storage,
            queue,
        }
    }
}
