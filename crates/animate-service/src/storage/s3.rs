//! S3 uploads served through CloudFront.

use std::path::Path;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::{CloudFrontSigner, StorageError, StoredVideo, VideoStorage};
use crate::config::{AwsSettings, CloudFrontSettings};

/// Prefix under which videos are stored in the bucket.
const VIDEO_PREFIX: &str = "videos/";

/// Videos in an S3 bucket, played back via CloudFront signed URLs.
#[derive(Debug)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    signer: CloudFrontSigner,
}

impl S3Storage {
    /// Build the S3 client and load the CloudFront signing key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Signing` if the private key cannot be loaded.
    pub async fn connect(
        aws: &AwsSettings,
        cloudfront: &CloudFrontSettings,
    ) -> Result<Self, StorageError> {
        let signer = CloudFrontSigner::from_settings(cloudfront)?;

        let keys = aws_sdk_s3::config::Credentials::new(
            aws.access_key_id.clone(),
            aws.secret_access_key.clone(),
            None,
            None,
            "env",
        );

        let s3_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(aws.region.clone()))
            .credentials_provider(keys)
            .load()
            .await;

        info!(bucket = %aws.bucket, region = %aws.region, "S3 storage configured");

        Ok(Self {
            client: aws_sdk_s3::Client::new(&s3_config),
            bucket: aws.bucket.clone(),
            signer,
        })
    }
}

#[async_trait]
impl VideoStorage for S3Storage {
    #[instrument(skip(self, path), fields(bucket = %self.bucket))]
    async fn store(&self, path: &Path, file_name: &str) -> Result<StoredVideo, StorageError> {
        let key = format!("{VIDEO_PREFIX}{file_name}");

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("video/mp4")
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Upload(DisplayErrorContext(&e).to_string()))?;

        info!(key = %key, "uploaded video to S3");

        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(error = %e, path = %path.display(), "could not remove local copy");
        }

        let url = self.signer.sign_url(&key, Utc::now())?;
        Ok(StoredVideo { key, url })
    }

    async fn url_for(&self, key: &str) -> Result<String, StorageError> {
        self.signer.sign_url(key, Utc::now())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if !key.starts_with(VIDEO_PREFIX) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete(DisplayErrorContext(&e).to_string()))?;

        debug!(key = %key, "deleted video from S3");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
