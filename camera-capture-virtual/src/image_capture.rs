//! Still photos rendered on the fly.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use camera_capture_core::models::constraints::{MediaSettingsRange, PhotoCapabilities, PhotoSettings};
use camera_capture_core::models::error::DeviceError;
use camera_capture_core::models::resolution::Resolution;
use camera_capture_core::traits::device_layer::ImageCapture;

use crate::camera::Registry;

/// Renders a test pattern JPEG at the requested size.
///
/// Portrait requests pending on the device are answered with a desaturated
/// copy of each photo taken.
pub struct VirtualImageCapture {
    device_id: String,
    stream_resolution: Resolution,
    max: Resolution,
    registry: Arc<Registry>,
}

impl VirtualImageCapture {
    pub(crate) fn new(device_id: String, stream_resolution: Resolution, max: Resolution, registry: Arc<Registry>) -> Self {
        Self {
            device_id,
            stream_resolution,
            max,
            registry,
        }
    }

    fn range(max: u32) -> MediaSettingsRange {
        MediaSettingsRange {
            min: 1.0,
            max: max as f64,
            step: 1.0,
        }
    }
}

fn encode(image: DynamicImage) -> Result<Vec<u8>, DeviceError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| DeviceError::Other(format!("failed to encode photo: {}", e)))?;
    Ok(out.into_inner())
}

/// Color bars over a vertical fade.
fn render(size: Resolution) -> RgbImage {
    const BARS: [[u8; 3]; 6] = [
        [255, 255, 255],
        [255, 255, 0],
        [0, 255, 255],
        [0, 255, 0],
        [255, 0, 255],
        [0, 0, 255],
    ];
    RgbImage::from_fn(size.width, size.height, |x, y| {
        let bar = BARS[(x as usize * BARS.len()) / size.width as usize];
        let fade = 255 - (y * 200 / size.height) as u8;
        Rgb(bar.map(|c| (c as u16 * fade as u16 / 255) as u8))
    })
}

#[async_trait]
impl ImageCapture for VirtualImageCapture {
    async fn photo_capabilities(&self) -> Result<PhotoCapabilities, DeviceError> {
        self.registry.camera(&self.device_id)?;
        Ok(PhotoCapabilities {
            image_width: Self::range(self.max.width),
            image_height: Self::range(self.max.height),
        })
    }

    async fn take_photo(&self, settings: PhotoSettings) -> Result<Vec<u8>, DeviceError> {
        self.registry.camera(&self.device_id)?;
        let size = Resolution::new(
            settings.image_width.unwrap_or(self.stream_resolution.width).clamp(1, self.max.width),
            settings.image_height.unwrap_or(self.stream_resolution.height).clamp(1, self.max.height),
        );
        let effects = self.registry.take_pending_effects(&self.device_id);

        let (photo, effect) = tokio::task::spawn_blocking(move || {
            let image = DynamicImage::ImageRgb8(render(size));
            let effect = if effects.is_empty() {
                None
            } else {
                Some(encode(image.grayscale()))
            };
            encode(image).map(|photo| (photo, effect.map(|e| (e, effects))))
        })
        .await
        .map_err(|e| DeviceError::Other(e.to_string()))??;

        if let Some((effect, requests)) = effect {
            match effect {
                Ok(blob) => {
                    for request in requests {
                        let _ = request.send(blob.clone());
                    }
                }
                // Dropping the requests fails them.
                Err(e) => log::warn!("Portrait rendering failed on {}: {}", self.device_id, e),
            }
        }
        log::debug!("Virtual photo {}x{} on {}", size.width, size.height, self.device_id);
        Ok(photo)
    }
}
