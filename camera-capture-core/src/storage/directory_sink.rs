use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::models::error::StorageError;
use crate::models::mode::Mode;
use crate::models::take_result::{SavedFile, TakeMetadata};
use crate::storage::metadata;
use crate::traits::result_sink::{ResultSink, VideoSaver};

/// Writes takes into a directory as `IMG_yyyyMMdd_HHmmss.jpg` /
/// `VID_yyyyMMdd_HHmmss.mkv`, each with a JSON metadata sidecar.
pub struct DirectoryResultSink {
    directory: PathBuf,
    video_extension: String,
}

impl DirectoryResultSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            video_extension: "mkv".into(),
        }
    }

    pub fn with_video_extension(mut self, extension: &str) -> Self {
        self.video_extension = extension.to_string();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// First free path for a take; clashes get a numeric suffix.
    async fn unique_path(&self, metadata: &TakeMetadata, extension: &str) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let stem = file_stem(metadata);
        let mut candidate = self.directory.join(format!("{}.{}", stem, extension));
        let mut n = 1;
        while tokio::fs::try_exists(&candidate).await? {
            candidate = self.directory.join(format!("{} ({}).{}", stem, n, extension));
            n += 1;
        }
        Ok(candidate)
    }
}

fn file_stem(metadata: &TakeMetadata) -> String {
    let prefix = match metadata.mode {
        Mode::Video => "VID",
        Mode::Photo | Mode::Square | Mode::Portrait => "IMG",
    };
    let timestamp = chrono::DateTime::parse_from_rfc3339(&metadata.created_at)
        .map(|t| t.with_timezone(&chrono::Local))
        .unwrap_or_else(|_| chrono::Local::now())
        .format("%Y%m%d_%H%M%S");
    match &metadata.effect {
        Some(effect) => format!("{}_{}_{}", prefix, timestamp, effect.to_uppercase()),
        None => format!("{}_{}", prefix, timestamp),
    }
}

fn hex_digest(hasher: Sha256) -> String {
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[async_trait]
impl ResultSink for DirectoryResultSink {
    async fn save_photo(&self, blob: Vec<u8>, metadata: &TakeMetadata) -> Result<SavedFile, StorageError> {
        let path = self.unique_path(metadata, "jpg").await?;
        tokio::fs::write(&path, &blob).await?;
        metadata::write_metadata(metadata, &path).await?;

        let mut hasher = Sha256::new();
        hasher.update(&blob);
        log::info!("Saved photo {}", path.display());
        Ok(SavedFile {
            path,
            size_bytes: blob.len() as u64,
            checksum: hex_digest(hasher),
        })
    }

    async fn start_save_video(&self, metadata: &TakeMetadata) -> Result<Box<dyn VideoSaver>, StorageError> {
        let path = self.unique_path(metadata, &self.video_extension).await?;
        let file = tokio::fs::File::create(&path).await?;
        Ok(Box::new(FileVideoSaver {
            path,
            file,
            hasher: Sha256::new(),
            size_bytes: 0,
            metadata: metadata.clone(),
        }))
    }
}

/// Streams recorded chunks into a file, hashing as it goes.
pub struct FileVideoSaver {
    path: PathBuf,
    file: tokio::fs::File,
    hasher: Sha256,
    size_bytes: u64,
    metadata: TakeMetadata,
}

#[async_trait]
impl VideoSaver for FileVideoSaver {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file.write_all(chunk).await?;
        self.hasher.update(chunk);
        self.size_bytes += chunk.len() as u64;
        Ok(())
    }

    async fn end_write(self: Box<Self>) -> Result<SavedFile, StorageError> {
        let FileVideoSaver {
            path,
            mut file,
            hasher,
            size_bytes,
            metadata: take,
        } = *self;
        file.flush().await?;
        file.sync_all().await?;
        metadata::write_metadata(&take, &path).await?;
        log::info!("Saved video {} ({} bytes)", path.display(), size_bytes);
        Ok(SavedFile {
            path,
            size_bytes,
            checksum: hex_digest(hasher),
        })
    }

    async fn cancel(self: Box<Self>) -> Result<(), StorageError> {
        let FileVideoSaver { path, file, .. } = *self;
        drop(file);
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }
}
