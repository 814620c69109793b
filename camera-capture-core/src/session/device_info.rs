use crate::models::capability::DeviceCapability;
use crate::models::error::DeviceError;
use crate::traits::capability_query::CapabilityQuery;

/// Collect capabilities for every device. Devices whose queries fail are
/// left out and negotiated with coarse defaults instead.
pub async fn collect(query: &dyn CapabilityQuery, devices: &[String]) -> Vec<DeviceCapability> {
    let mut capabilities = Vec::with_capacity(devices.len());
    for device in devices {
        match describe(query, device).await {
            Ok(capability) => capabilities.push(capability),
            Err(e) => log::warn!("Failed to query capabilities of {}: {}", device, e),
        }
    }
    capabilities
}

/// Capabilities of one device.
pub async fn describe(query: &dyn CapabilityQuery, device_id: &str) -> Result<DeviceCapability, DeviceError> {
    let facing = query.camera_facing(device_id).await?;
    let photo = query.photo_resolutions(device_id).await?;
    let video = query.video_configs(device_id).await?;
    let fps_ranges = query.supported_fps_ranges(device_id).await?;
    let portrait = match query.is_portrait_mode_supported(device_id).await {
        Ok(supported) => supported,
        Err(e) => {
            log::debug!("Portrait support unknown for {}: {}", device_id, e);
            false
        }
    };

    Ok(DeviceCapability::new(device_id, facing)
        .with_photo_resolutions(photo)
        .with_video_configs(video)
        .with_fps_ranges(fps_ranges)
        .with_portrait_mode(portrait))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capability::{Facing, FpsRange, VideoConfig};
    use crate::models::resolution::Resolution;
    use crate::traits::capability_query::ReprocessEffect;
    use async_trait::async_trait;

    /// Answers for "good" and fails to decode anything about other devices.
    struct PartialQuery;

    #[async_trait]
    impl CapabilityQuery for PartialQuery {
        async fn camera_facing(&self, device_id: &str) -> Result<Facing, DeviceError> {
            if device_id == "good" {
                Ok(Facing::Front)
            } else {
                Err(DeviceError::Decode("bad facing".into()))
            }
        }
        async fn photo_resolutions(&self, _: &str) -> Result<Vec<Resolution>, DeviceError> {
            Ok(vec![Resolution::new(1280, 960), Resolution::new(1280, 960)])
        }
        async fn video_configs(&self, _: &str) -> Result<Vec<VideoConfig>, DeviceError> {
            Ok(vec![VideoConfig::new(1280, 720, 30), VideoConfig::new(320, 240, 15)])
        }
        async fn supported_fps_ranges(&self, _: &str) -> Result<Vec<FpsRange>, DeviceError> {
            Ok(vec![FpsRange::fixed(30)])
        }
        async fn set_fps_range(&self, _: &str, _: FpsRange) -> Result<(), DeviceError> {
            Ok(())
        }
        async fn is_portrait_mode_supported(&self, _: &str) -> Result<bool, DeviceError> {
            Err(DeviceError::Unavailable)
        }
        async fn set_reprocess_option(&self, _: &str, _: ReprocessEffect) -> Result<Vec<u8>, DeviceError> {
            Err(DeviceError::Unavailable)
        }
    }

    #[tokio::test]
    async fn failing_devices_are_skipped() {
        let devices = vec!["good".to_string(), "broken".to_string()];
        let capabilities = collect(&PartialQuery, &devices).await;

        assert_eq!(capabilities.len(), 1);
        let good = &capabilities[0];
        assert_eq!(good.device_id, "good");
        assert_eq!(good.facing, Facing::Front);
        assert_eq!(good.photo_resolutions, vec![Resolution::new(1280, 960)]);
        assert_eq!(good.video_resolutions(), vec![Resolution::new(1280, 720)]);
        assert_eq!(good.fixed_fps_for(Resolution::new(1280, 720)), vec![30]);
        assert!(!good.portrait_mode_supported);
    }
}
