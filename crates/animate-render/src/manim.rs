//! Running Manim as a subprocess.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use animate_core::Resolution;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::RenderConfig;
use crate::error::RenderError;

/// Longest process output kept in a failure message.
const MAX_ERROR_OUTPUT_CHARS: usize = 4000;

/// A rendered video on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedVideo {
    /// Full path to the video.
    pub path: PathBuf,
    /// File name within the media directory (`<uuid>.mp4`).
    pub file_name: String,
}

/// Renders scene source to video by invoking Manim.
#[derive(Debug, Clone)]
pub struct ManimRenderer {
    config: RenderConfig,
}

impl ManimRenderer {
    /// Create a renderer.
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// The renderer configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `code` at `resolution`.
    ///
    /// # Errors
    ///
    /// - `RenderError::NotAvailable` if the interpreter is missing.
    /// - `RenderError::Failed` if Manim exits non-zero.
    /// - `RenderError::OutputMissing` if no `.mp4` was produced.
    /// - `RenderError::Timeout` if the render exceeds the configured timeout.
    #[instrument(skip(self, code), fields(resolution = %resolution))]
    pub async fn render(
        &self,
        code: &str,
        resolution: Resolution,
    ) -> Result<RenderedVideo, RenderError> {
        let file_id = Uuid::new_v4();
        let script_stem = format!("scene_{file_id}");

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        tokio::fs::create_dir_all(&self.config.media_dir).await?;

        let script_path = self.config.work_dir.join(format!("{script_stem}.py"));
        tokio::fs::write(&script_path, code).await?;

        let result = self
            .run_and_collect(&script_path, &script_stem, file_id, resolution)
            .await;

        if let Err(e) = tokio::fs::remove_file(&script_path).await {
            debug!(error = %e, "could not remove scene script");
        }
        let scene_dir = self.config.media_dir.join("videos").join(&script_stem);
        if tokio::fs::try_exists(&scene_dir).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_dir_all(&scene_dir).await {
                debug!(error = %e, "could not remove scene media directory");
            }
        }

        result
    }

    async fn run_and_collect(
        &self,
        script_path: &Path,
        script_stem: &str,
        file_id: Uuid,
        resolution: Resolution,
    ) -> Result<RenderedVideo, RenderError> {
        self.run_manim(script_path, resolution).await?;

        let search_root = self.config.media_dir.join("videos").join(script_stem);
        let root = search_root.clone();
        let scene_name = self.config.scene_name.clone();
        let found = tokio::task::spawn_blocking(move || find_video(&root, &scene_name))
            .await
            .map_err(|e| RenderError::Io(std::io::Error::other(e)))?
            .ok_or(RenderError::OutputMissing(search_root))?;

        let file_name = format!("{file_id}.mp4");
        let final_path = self.config.media_dir.join(&file_name);
        tokio::fs::rename(&found, &final_path).await?;

        info!(file_name = %file_name, "render complete");
        Ok(RenderedVideo {
            path: final_path,
            file_name,
        })
    }

    /// Run `python -m manim` on the script.
    async fn run_manim(&self, script_path: &Path, resolution: Resolution) -> Result<(), RenderError> {
        let mut command = Command::new(&self.config.python);
        command
            .arg("-m")
            .arg("manim")
            .arg(resolution.quality_flag())
            .arg("--media_dir")
            .arg(&self.config.media_dir)
            .arg(script_path)
            .arg(&self.config.scene_name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            python = %self.config.python.display(),
            script = %script_path.display(),
            flag = resolution.quality_flag(),
            "running manim"
        );

        let output = tokio::time::timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| RenderError::Timeout(self.config.timeout))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RenderError::NotAvailable(format!(
                        "{} not found; ensure Python and Manim are installed",
                        self.config.python.display()
                    ))
                } else {
                    RenderError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let text = if !stderr.trim().is_empty() {
                stderr
            } else if !stdout.trim().is_empty() {
                stdout
            } else {
                "Unknown error".into()
            };
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, "manim failed");
            return Err(RenderError::Failed {
                exit_code,
                output: tail(&text, MAX_ERROR_OUTPUT_CHARS),
            });
        }

        Ok(())
    }
}

/// Search `root` recursively for `<scene>.mp4`, falling back to any `.mp4`.
fn find_video(root: &Path, scene_name: &str) -> Option<PathBuf> {
    let mut videos = Vec::new();
    collect_videos(root, &mut videos);
    videos.sort();

    let preferred = format!("{scene_name}.mp4");
    videos
        .iter()
        .find(|p| p.file_name().is_some_and(|n| n == preferred.as_str()))
        .or_else(|| videos.first())
        .cloned()
}

fn collect_videos(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_videos(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "mp4") {
            out.push(path);
        }
    }
}

/// Keep the last `max` characters of `text`.
fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.trim().to_string();
    }
    text.chars().skip(count - max).collect::<String>().trim().to_string()
}
