//! Manim subprocess renderer for prompt-to-animate.
//!
//! Scene source is written to a temporary script, rendered by running
//! `python -m manim` with the quality flag for the requested resolution, and
//! the produced `.mp4` is moved to a stable `<uuid>.mp4` name in the media
//! directory.
//!
//! # Example
//!
//! ```no_run
//! use animate_core::Resolution;
//! use animate_render::{ManimRenderer, RenderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let renderer = ManimRenderer::new(RenderConfig::new().with_media_dir("./generated_animations"));
//!
//! let code = "from manim import *\nclass GenScene(Scene):\n    def construct(self):\n        self.play(Create(Circle()))\n";
//! let video = renderer.render(code, Resolution::Hd).await?;
//! println!("rendered {}", video.file_name);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod error;
mod manim;

pub use config::RenderConfig;
pub use error::RenderError;
pub use manim::{ManimRenderer, RenderedVideo};
