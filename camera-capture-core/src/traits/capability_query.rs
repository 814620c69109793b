use async_trait::async_trait;

use crate::models::capability::{Facing, FpsRange, VideoConfig};
use crate::models::error::DeviceError;
use crate::models::resolution::Resolution;

/// Post-processing effects the camera service can apply to a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReprocessEffect {
    Portrait,
}

/// Typed queries against the camera service for one device.
///
/// Malformed service responses surface as [`DeviceError::Decode`].
#[async_trait]
pub trait CapabilityQuery: Send + Sync {
    async fn camera_facing(&self, device_id: &str) -> Result<Facing, DeviceError>;

    async fn photo_resolutions(&self, device_id: &str) -> Result<Vec<Resolution>, DeviceError>;

    async fn video_configs(&self, device_id: &str) -> Result<Vec<VideoConfig>, DeviceError>;

    async fn supported_fps_ranges(&self, device_id: &str) -> Result<Vec<FpsRange>, DeviceError>;

    /// Pin the frame-rate range for the next stream acquired on `device_id`.
    async fn set_fps_range(&self, device_id: &str, range: FpsRange) -> Result<(), DeviceError>;

    async fn is_portrait_mode_supported(&self, device_id: &str) -> Result<bool, DeviceError>;

    /// Request `effect` on the next photo taken on `device_id`.
    ///
    /// Resolves with the processed image once that photo has been taken.
    async fn set_reprocess_option(
        &self,
        device_id: &str,
        effect: ReprocessEffect,
    ) -> Result<Vec<u8>, DeviceError>;
}
