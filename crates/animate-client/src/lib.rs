//! Prompt-to-animate client SDK.
//!
//! A typed async client for the animation API, including a consumer for the
//! server-sent progress stream.
//!
//! # Example
//!
//! ```no_run
//! use animate_client::AnimateClient;
//! use animate_core::{JobStatus, RenderRequest};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), animate_client::ClientError> {
//! let client = AnimateClient::new("http://localhost:8000", "session-jwt")?;
//!
//! let mut progress = client
//!     .generate_stream(&RenderRequest::new("Visualize a sine wave"))
//!     .await?;
//!
//! while let Some(update) = progress.next().await {
//!     let update = update?;
//!     println!("[{}] {}", update.step, update.message);
//!     if update.status == JobStatus::Complete {
//!         println!("Video: {}", update.video_url.unwrap_or_default());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod sse;
mod types;

pub use client::{AnimateClient, ClientOptions, ProgressStream};
pub use error::ClientError;
pub use types::*;
