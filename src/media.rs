use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use log::{info, warn};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::video_utils::probe_duration;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("asset {0} does not exist")]
    NotFound(String),

    #[error("ffprobe error: {0}")]
    Probe(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn prefix(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }
}

/// A file the multipart layer has already spooled to disk.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl LocalFile {
    fn extension(&self) -> Option<&str> {
        let name = self.file_name.as_deref()?;
        Path::new(name).extension()?.to_str()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
    pub asset_id: String,
    /// Seconds; always 0 for images.
    pub duration: f64,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: &LocalFile, kind: MediaKind) -> Result<UploadedMedia, MediaError>;
    async fn delete(&self, asset_id: &str) -> Result<(), MediaError>;

    fn public_url(&self) -> &str;

    /// Recovers the asset id from a URL this store handed out.
    fn asset_id(&self, url: &str) -> Option<String> {
        let base = self.public_url();
        let key = url.strip_prefix(base)?.trim_start_matches('/');
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    /// Deletes whatever `url` points at; empty or foreign URLs are skipped.
    async fn delete_url(&self, url: &str) -> Result<(), MediaError> {
        match self.asset_id(url) {
            Some(asset_id) => self.delete(&asset_id).await,
            None => Ok(()),
        }
    }
}

fn object_key(file: &LocalFile, kind: MediaKind) -> String {
    match file.extension() {
        Some(ext) => format!("{}/{}.{}", kind.prefix(), Uuid::new_v4(), ext.to_lowercase()),
        None => format!("{}/{}", kind.prefix(), Uuid::new_v4()),
    }
}

/// Object storage over the S3 API (MinIO in development).
pub struct S3MediaStore {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3MediaStore {
    pub fn new(client: Client, bucket: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_url: public_url.into(),
        }
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(&self, file: &LocalFile, kind: MediaKind) -> Result<UploadedMedia, MediaError> {
        let duration = match kind {
            MediaKind::Video => match probe_duration(&file.path).await {
                Ok(duration) => duration,
                Err(e) => {
                    warn!("Storing video without duration: {}", e);
                    0.0
                }
            },
            MediaKind::Image => 0.0,
        };

        let key = object_key(file, kind);
        let body = tokio::fs::read(&file.path).await?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body));
        if let Some(content_type) = &file.content_type {
            request = request.content_type(content_type);
        }
        request
            .send()
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;

        info!("Uploaded {} to bucket {}", key, self.bucket);
        Ok(UploadedMedia {
            url: format!("{}/{}", self.public_url, key),
            asset_id: key,
            duration,
        })
    }

    async fn delete(&self, asset_id: &str) -> Result<(), MediaError> {
        // delete_object succeeds for absent keys; head_object reports them.
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(asset_id)
            .send()
            .await
            .map_err(|_| MediaError::NotFound(asset_id.to_string()))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(asset_id)
            .send()
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;

        info!("Deleted {} from bucket {}", asset_id, self.bucket);
        Ok(())
    }

    fn public_url(&self) -> &str {
        &self.public_url
    }
}

/// Keeps asset ids in memory; used by the test suite and local runs without MinIO.
pub struct MemoryMediaStore {
    public_url: String,
    assets: Mutex<HashSet<String>>,
    video_duration: f64,
    capacity: Option<usize>,
}

impl MemoryMediaStore {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
            assets: Mutex::new(HashSet::new()),
            video_duration: 0.0,
            capacity: None,
        }
    }

    /// Duration reported for every uploaded video.
    pub fn with_video_duration(mut self, seconds: f64) -> Self {
        self.video_duration = seconds;
        self
    }

    /// Uploads fail once `assets` are stored.
    pub fn with_capacity(mut self, assets: usize) -> Self {
        self.capacity = Some(assets);
        self
    }

    pub async fn contains(&self, asset_id: &str) -> bool {
        self.assets.lock().await.contains(asset_id)
    }

    pub async fn len(&self) -> usize {
        self.assets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, file: &LocalFile, kind: MediaKind) -> Result<UploadedMedia, MediaError> {
        tokio::fs::metadata(&file.path).await?;

        let key = object_key(file, kind);
        let mut assets = self.assets.lock().await;
        if self.capacity.map_or(false, |max| assets.len() >= max) {
            return Err(MediaError::Storage("media store is full".into()));
        }
        assets.insert(key.clone());
        Ok(UploadedMedia {
            url: format!("{}/{}", self.public_url, key),
            asset_id: key,
            duration: match kind {
                MediaKind::Video => self.video_duration,
                MediaKind::Image => 0.0,
            },
        })
    }

    async fn delete(&self, asset_id: &str) -> Result<(), MediaError> {
        if self.assets.lock().await.remove(asset_id) {
            Ok(())
        } else {
            Err(MediaError::NotFound(asset_id.to_string()))
        }
    }

    fn public_url(&self) -> &str {
        &self.public_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> LocalFile {
        let path = std::env::temp_dir().join(format!("{}-{}", Uuid::new_v4(), name));
        std::fs::write(&path, b"bytes").unwrap();
        LocalFile {
            path,
            file_name: Some(name.to_string()),
            content_type: None,
        }
    }

    #[tokio::test]
    async fn upload_then_delete_by_url() {
        let store = MemoryMediaStore::new("http://media.test/media").with_video_duration(42.0);
        let file = temp_file("clip.MP4");

        let uploaded = store.upload(&file, MediaKind::Video).await.unwrap();
        assert!(uploaded.asset_id.starts_with("videos/"));
        assert!(uploaded.asset_id.ends_with(".mp4"));
        assert_eq!(uploaded.duration, 42.0);
        assert_eq!(store.asset_id(&uploaded.url), Some(uploaded.asset_id.clone()));

        store.delete_url(&uploaded.url).await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.delete(&uploaded.asset_id).await,
            Err(MediaError::NotFound(_))
        ));
        std::fs::remove_file(&file.path).unwrap();
    }

    #[tokio::test]
    async fn foreign_and_empty_urls_are_skipped() {
        let store = MemoryMediaStore::new("http://media.test/media");
        assert_eq!(store.asset_id(""), None);
        assert_eq!(store.asset_id("https://elsewhere/a.png"), None);
        store.delete_url("").await.unwrap();
    }

    #[tokio::test]
    async fn missing_local_file_fails_upload() {
        let store = MemoryMediaStore::new("http://media.test/media");
        let file = LocalFile {
            path: PathBuf::from("/nonexistent/avatar.png"),
            file_name: Some("avatar.png".into()),
            content_type: None,
        };
        assert!(matches!(
            store.upload(&file, MediaKind::Image).await,
            Err(MediaError::Io(_))
        ));
        assert!(store.is_empty().await);
    }
}
