use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::constraints::{PhotoCapabilities, PhotoSettings, StreamConstraints, TrackSettings};
use crate::models::error::DeviceError;

/// Channel a recorder pushes encoded chunks into. Dropping the sender ends the recording.
pub type ChunkSender = mpsc::UnboundedSender<Vec<u8>>;

/// Access to camera devices and their streams.
///
/// Implemented by:
/// - `VirtualDeviceLayer` (camera-capture-virtual)
/// - host bindings wrapping a getUserMedia-style API
#[async_trait]
pub trait DeviceLayer: Send + Sync {
    /// Video input device ids, in the order the platform reports them.
    async fn enumerate_devices(&self) -> Result<Vec<String>, DeviceError>;

    /// Acquire a stream satisfying `constraints`.
    ///
    /// Returns [`DeviceError::NotSatisfiable`] when the device cannot honor them.
    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn MediaStream>, DeviceError>;

    /// Whether a recorder can be created for `mime_type`.
    fn is_recording_type_supported(&self, mime_type: &str) -> bool;
}

/// A live camera stream. Owned by one session at a time.
pub trait MediaStream: Send + Sync {
    /// Settings of the video track as negotiated.
    fn settings(&self) -> TrackSettings;

    /// Whether the video track is still delivering frames.
    fn is_live(&self) -> bool;

    /// Stop every track and release the device.
    fn stop(&self);

    fn create_recorder(&self, mime_type: &str) -> Result<Arc<dyn Recorder>, DeviceError>;

    fn create_image_capture(&self) -> Result<Arc<dyn ImageCapture>, DeviceError>;
}

/// Records a stream into encoded chunks.
pub trait Recorder: Send + Sync {
    /// Start recording, delivering chunks to `chunks` until [`Recorder::stop`].
    fn start(&self, chunks: ChunkSender) -> Result<(), DeviceError>;

    /// Stop recording. The recorder flushes and then drops its sender.
    fn stop(&self);
}

/// Still-photo capture on a stream.
#[async_trait]
pub trait ImageCapture: Send + Sync {
    async fn photo_capabilities(&self) -> Result<PhotoCapabilities, DeviceError>;

    /// Take one photo and return the encoded image.
    async fn take_photo(&self, settings: PhotoSettings) -> Result<Vec<u8>, DeviceError>;
}
