//! Error types for rendering.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while rendering a scene.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The Python interpreter could not be found.
    #[error("renderer is not available: {0}")]
    NotAvailable(String),

    /// Filesystem or process I/O failed.
    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manim exited with a non-zero status.
    #[error("Manim execution failed (exit code {exit_code}):\n{output}")]
    Failed {
        /// The exit code returned by the process (`-1` when killed by a signal).
        exit_code: i32,
        /// Captured stderr, falling back to stdout.
        output: String,
    },

    /// Manim succeeded but no video was found.
    #[error("video file was not generated under {0}")]
    OutputMissing(PathBuf),

    /// The render ran past its deadline and was killed.
    #[error("render timed out after {0:?}")]
    Timeout(Duration),
}
