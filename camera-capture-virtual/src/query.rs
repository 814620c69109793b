use async_trait::async_trait;
use tokio::sync::oneshot;

use camera_capture_core::models::capability::{Facing, FpsRange, VideoConfig};
use camera_capture_core::models::error::DeviceError;
use camera_capture_core::models::resolution::Resolution;
use camera_capture_core::traits::capability_query::{CapabilityQuery, ReprocessEffect};

use crate::device_layer::VirtualDeviceLayer;

#[async_trait]
impl CapabilityQuery for VirtualDeviceLayer {
    async fn camera_facing(&self, device_id: &str) -> Result<Facing, DeviceError> {
        Ok(self.registry.camera(device_id)?.facing)
    }

    async fn photo_resolutions(&self, device_id: &str) -> Result<Vec<Resolution>, DeviceError> {
        Ok(self.registry.camera(device_id)?.photo_resolutions)
    }

    async fn video_configs(&self, device_id: &str) -> Result<Vec<VideoConfig>, DeviceError> {
        Ok(self.registry.camera(device_id)?.video_configs)
    }

    async fn supported_fps_ranges(&self, device_id: &str) -> Result<Vec<FpsRange>, DeviceError> {
        Ok(self.registry.camera(device_id)?.fps_ranges)
    }

    async fn set_fps_range(&self, device_id: &str, range: FpsRange) -> Result<(), DeviceError> {
        self.registry.with_device(device_id, |d| {
            if !d.camera.supports_fps_range(range) {
                return Err(DeviceError::NotSatisfiable(format!(
                    "fps range {}-{} not supported",
                    range.min, range.max
                )));
            }
            d.pinned_fps = Some(range);
            Ok(())
        })
    }

    async fn is_portrait_mode_supported(&self, device_id: &str) -> Result<bool, DeviceError> {
        Ok(self.registry.camera(device_id)?.portrait)
    }

    async fn set_reprocess_option(&self, device_id: &str, effect: ReprocessEffect) -> Result<Vec<u8>, DeviceError> {
        let rx = self.registry.with_device(device_id, |d| {
            if !d.camera.portrait {
                return Err(DeviceError::NotSatisfiable(format!("{:?} not supported", effect)));
            }
            let (tx, rx) = oneshot::channel();
            d.pending_effects.push(tx);
            Ok(rx)
        })?;
        rx.await
            .map_err(|_| DeviceError::Other(format!("{:?} request dropped before a photo was taken", effect)))
    }
}
