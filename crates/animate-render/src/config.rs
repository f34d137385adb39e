//! Renderer configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the Manim renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Python interpreter with Manim installed (default: `python3`)
    pub python: PathBuf,

    /// Where temporary scene scripts are written (default: `./temp`)
    pub work_dir: PathBuf,

    /// Manim media directory; final videos land directly inside it
    /// (default: `./generated_animations`)
    pub media_dir: PathBuf,

    /// Scene class the generated code must define (default: `GenScene`)
    pub scene_name: String,

    /// Upper bound on a single render (default: 10 minutes)
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            work_dir: PathBuf::from("./temp"),
            media_dir: PathBuf::from("./generated_animations"),
            scene_name: "GenScene".to_string(),
            timeout: Duration::from_secs(600),
        }
    }
}

impl RenderConfig {
    /// Create a new renderer configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Python interpreter.
    #[must_use]
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    /// Set the scratch directory for scene scripts.
    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Set the media directory.
    #[must_use]
    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dir = dir.into();
        self
    }

    /// Set the render timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
