//! Scene rendering seam used by the job pipeline.

use animate_core::Resolution;
use animate_render::{ManimRenderer, RenderError, RenderedVideo};
use async_trait::async_trait;

/// Turns scene source into a video file on local disk.
#[async_trait]
pub trait SceneRenderer: Send + Sync {
    /// Render `code` at `resolution`.
    async fn render(&self, code: &str, resolution: Resolution)
        -> Result<RenderedVideo, RenderError>;
}

#[async_trait]
impl SceneRenderer for ManimRenderer {
    async fn render(
        &self,
        code: &str,
        resolution: Resolution,
    ) -> Result<RenderedVideo, RenderError> {
        ManimRenderer::render(self, code, resolution).await
    }
}
