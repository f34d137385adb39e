//! Common test utilities for animate-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use animate_core::{JobId, Resolution, UserId, VideoLength};
use animate_render::{RenderError, RenderedVideo};
use animate_service::{
    create_router, spawn_workers, AppState, CodeGenerator, LlmError, LocalStorage, SceneRenderer,
    ServiceConfig,
};
use animate_store::RocksStore;

/// Prompts containing this make the fake generator fail.
pub const LLM_FAIL: &str = "llm-fail";

/// Code containing this makes the fake renderer fail.
pub const RENDER_FAIL: &str = "render-fail";

/// Code containing this makes the fake renderer take a while.
pub const RENDER_SLOW: &str = "render-slow";

/// Generator that echoes the prompt into a comment.
pub struct FakeGenerator;

#[async_trait]
impl CodeGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str, length: VideoLength) -> Result<String, LlmError> {
        if prompt.contains(LLM_FAIL) {
            return Err(LlmError::Api {
                status: 503,
                body: "model overloaded".into(),
            });
        }
        Ok(format!(
            "from manim import *\n# {prompt} ({length})\nclass GenScene(Scene):\n    pass"
        ))
    }
}

/// Renderer that writes a small placeholder file into the media directory.
pub struct FakeRenderer {
    media_dir: std::path::PathBuf,
}

#[async_trait]
impl SceneRenderer for FakeRenderer {
    async fn render(
        &self,
        code: &str,
        _resolution: Resolution,
    ) -> Result<RenderedVideo, RenderError> {
        if code.contains(RENDER_FAIL) {
            return Err(RenderError::Failed {
                exit_code: 1,
                output: "NameError: name 'Circl' is not defined".into(),
            });
        }
        if code.contains(RENDER_SLOW) {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        std::fs::create_dir_all(&self.media_dir)?;
        let file_name = format!("{}.mp4", JobId::generate());
        let path = self.media_dir.join(&file_name);
        std::fs::write(&path, b"fake mp4")?;
        Ok(RenderedVideo { path, file_name })
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct store access for arranging and inspecting state.
    pub store: Arc<RocksStore>,
    /// Directory holding locally stored videos.
    pub media_dir: std::path::PathBuf,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a harness with running workers and default test settings.
    pub fn new() -> Self {
        Self::with_config(|_| {}, true)
    }

    /// Create a harness with adjusted config, optionally without workers.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig), workers: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let data_dir = temp_dir.path().join("db");
        let media_dir = temp_dir.path().join("media");
        let store = Arc::new(RocksStore::open(&data_dir).expect("Failed to open store"));

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: data_dir.to_string_lossy().to_string(),
            media_dir: media_dir.to_string_lossy().to_string(),
            work_dir: temp_dir.path().join("work").to_string_lossy().to_string(),
            public_base_url: "http://localhost:8000".into(),
            job_timeout_seconds: 5,
            stream_poll_interval_ms: 10,
            generate_poll_interval_ms: 10,
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let state = AppState::with_backends(
            store.clone(),
            config.clone(),
            Arc::new(FakeGenerator),
            Arc::new(FakeRenderer {
                media_dir: media_dir.clone(),
            }),
            Arc::new(LocalStorage::new(&media_dir, &config.public_base_url)),
        );

        if workers {
            let _ = spawn_workers(&state);
        }

        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id: UserId = "user_test_owner".parse().expect("valid user id");

        Self {
            server,
            store,
            media_dir,
            _temp_dir: temp_dir,
            test_user_id,
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_user_id)
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        "Bearer test-token:user_someone_else".to_string()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the `data:` lines of an SSE body as JSON values.
pub fn sse_events(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).expect("event data is JSON"))
        .collect()
}
