//! Blob storage for uploaded media
//!
//! Media bytes live in an external store; the entities only keep an opaque
//! `{url, public_id}` handle. Deletion is best-effort: an orphaned blob is
//! preferred over failing the entity operation that triggered the cleanup.

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Handle to a stored blob
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaHandle {
    pub url: String,
    pub public_id: String,
}

/// An uploaded file as received from a multipart form
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// External blob store for uploaded media
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store the blob and return its handle
    async fn upload(&self, upload: &MediaUpload) -> Result<MediaHandle>;

    /// Remove a previously stored blob by its public id
    async fn destroy(&self, public_id: &str) -> Result<()>;
}

/// Configuration for the S3-backed media store
#[derive(Debug, Clone)]
pub struct S3MediaStoreConfig {
    /// Bucket holding the uploaded media
    pub bucket: String,
    /// Base URL under which the bucket's objects are publicly reachable
    pub public_base_url: String,
}

impl S3MediaStoreConfig {
    /// Create a new S3MediaStoreConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MEDIA_BUCKET_NAME`: Bucket name (default: "media-bucket")
    /// - `MEDIA_PUBLIC_BASE_URL`: Public base URL (default derived from the bucket)
    pub fn from_env() -> Self {
        let bucket =
            std::env::var("MEDIA_BUCKET_NAME").unwrap_or_else(|_| "media-bucket".to_string());
        let public_base_url = std::env::var("MEDIA_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.amazonaws.com", bucket));

        Self {
            bucket,
            public_base_url,
        }
    }
}

/// S3-backed implementation of [`MediaStore`]
#[derive(Clone)]
pub struct S3MediaStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3MediaStore {
    pub fn new(client: aws_sdk_s3::Client, config: S3MediaStoreConfig) -> Self {
        Self {
            client,
            bucket: config.bucket,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Object key for a fresh upload; keeps the original extension so the
    /// served URL stays recognizable.
    fn object_key(filename: &str) -> String {
        match filename.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => format!("uploads/{}.{}", Uuid::new_v4(), ext),
            _ => format!("uploads/{}", Uuid::new_v4()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(&self, upload: &MediaUpload) -> Result<MediaHandle> {
        let key = Self::object_key(&upload.filename);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(upload.bytes.clone()));

        if let Some(content_type) = &upload.content_type {
            request = request.content_type(content_type);
        }

        request.send().await?;
        info!("Uploaded media object: {}", key);

        Ok(MediaHandle {
            url: self.public_url(&key),
            public_id: key,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await?;

        info!("Deleted media object: {}", public_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_keeps_extension() {
        let key = S3MediaStore::object_key("reef.jpg");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_object_key_without_extension() {
        let key = S3MediaStore::object_key("reef");
        assert!(key.starts_with("uploads/"));
        assert!(!key.contains('.'));
    }

    #[test]
    fn test_media_handle_json_shape() {
        let handle = MediaHandle {
            url: "https://media-bucket.s3.amazonaws.com/uploads/a.jpg".to_string(),
            public_id: "uploads/a.jpg".to_string(),
        };

        let value = serde_json::to_value(&handle).unwrap();
        assert_eq!(value["public_id"], "uploads/a.jpg");
        assert!(value["url"].as_str().unwrap().starts_with("https://"));
    }
}
