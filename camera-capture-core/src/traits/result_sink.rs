use async_trait::async_trait;

use crate::models::error::StorageError;
use crate::models::take_result::{SavedFile, TakeMetadata};

/// Where finished takes are persisted.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist a photo blob. `metadata` describes the take it came from.
    async fn save_photo(&self, blob: Vec<u8>, metadata: &TakeMetadata) -> Result<SavedFile, StorageError>;

    /// Open an incremental writer for a video recording.
    async fn start_save_video(&self, metadata: &TakeMetadata) -> Result<Box<dyn VideoSaver>, StorageError>;
}

/// Incremental writer for one video file.
#[async_trait]
pub trait VideoSaver: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError>;

    /// Finalize the file and return it.
    async fn end_write(self: Box<Self>) -> Result<SavedFile, StorageError>;

    /// Discard everything written so far.
    async fn cancel(self: Box<Self>) -> Result<(), StorageError>;
}
