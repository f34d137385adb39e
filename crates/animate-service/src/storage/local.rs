//! Videos kept on local disk and served by the API itself.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{StorageError, StoredVideo, VideoStorage};

/// Videos in the media directory, linked as `<public_base_url>/videos/<file>`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    media_dir: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    /// Create local storage rooted at `media_dir`.
    #[must_use]
    pub fn new(media_dir: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            media_dir: media_dir.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, file_name: &str) -> String {
        format!("{}/videos/{file_name}", self.public_base_url)
    }

    /// Resolve `key` to a file directly inside the media directory.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.media_dir.join(key))
    }
}

#[async_trait]
impl VideoStorage for LocalStorage {
    async fn store(&self, path: &Path, file_name: &str) -> Result<StoredVideo, StorageError> {
        let target = self.path_for(file_name)?;
        if path != target {
            tokio::fs::create_dir_all(&self.media_dir).await?;
            tokio::fs::rename(path, &target).await?;
        }
        Ok(StoredVideo {
            key: file_name.to_string(),
            url: self.url(file_name),
        })
    }

    async fn url_for(&self, key: &str) -> Result<String, StorageError> {
        self.path_for(key)?;
        Ok(self.url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "deleted local video");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn store_links_under_videos_path() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:8000/");
        let path = dir.path().join("abc.mp4");
        std::fs::write(&path, b"video").unwrap();

        let stored = storage.store(&path, "abc.mp4").await.unwrap();
        assert_eq!(stored.key, "abc.mp4");
        assert_eq!(stored.url, "http://localhost:8000/videos/abc.mp4");
        assert!(path.exists());
        assert_eq!(
            storage.url_for("abc.mp4").await.unwrap(),
            "http://localhost:8000/videos/abc.mp4"
        );
    }

    #[tokio::test]
    async fn store_moves_files_from_elsewhere() {
        let media = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let storage = LocalStorage::new(media.path(), "http://host");
        let path = scratch.path().join("render.mp4");
        std::fs::write(&path, b"video").unwrap();

        storage.store(&path, "abc.mp4").await.unwrap();
        assert!(!path.exists());
        assert!(media.path().join("abc.mp4").exists());
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_confined() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://host");
        std::fs::write(dir.path().join("abc.mp4"), b"video").unwrap();

        storage.delete("abc.mp4").await.unwrap();
        assert!(!dir.path().join("abc.mp4").exists());
        storage.delete("abc.mp4").await.unwrap();

        assert!(matches!(
            storage.delete("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.delete("videos/abc.mp4").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
