//! Where rendered videos live and how clients reach them.
//!
//! - [`S3Storage`]: uploads to S3 and hands out CloudFront signed URLs.
//! - [`LocalStorage`]: keeps videos in the media directory served at `/videos`.

pub mod cloudfront;
mod local;
mod s3;

pub use cloudfront::CloudFrontSigner;
pub use local::LocalStorage;
pub use s3::S3Storage;

use std::path::Path;

use async_trait::async_trait;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Uploading to object storage failed.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Deleting from object storage failed.
    #[error("delete failed: {0}")]
    Delete(String),

    /// The signing key could not be loaded or used.
    #[error("URL signing failed: {0}")]
    Signing(String),

    /// The key does not name a stored video.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// A video saved to a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVideo {
    /// Backend key, used later to mint URLs or delete the video.
    pub key: String,
    /// URL the client can play right now.
    pub url: String,
}

/// A backend for rendered videos.
#[async_trait]
pub trait VideoStorage: Send + Sync {
    /// Save the rendered file at `path` under `file_name`.
    async fn store(&self, path: &Path, file_name: &str) -> Result<StoredVideo, StorageError>;

    /// A fresh playable URL for `key`.
    async fn url_for(&self, key: &str) -> Result<String, StorageError>;

    /// Remove the video stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Short backend name for logs and the health check.
    fn name(&self) -> &'static str;
}
