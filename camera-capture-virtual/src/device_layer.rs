//! In-process device layer backed by virtual cameras.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use camera_capture_core::models::capability::{FpsRange, VideoConfig};
use camera_capture_core::models::constraints::{FrameRate, StreamConstraints, TrackSettings};
use camera_capture_core::models::error::DeviceError;
use camera_capture_core::traits::device_layer::{DeviceLayer, MediaStream};

use crate::camera::{Registry, VirtualCamera};
use crate::stream::VirtualStream;

/// Frame rate reported when the request leaves it open.
const DEFAULT_FPS: u32 = 30;

/// A set of virtual cameras that can be plugged, unplugged and marked busy
/// at runtime.
///
/// Implements both [`DeviceLayer`] and
/// [`CapabilityQuery`](camera_capture_core::traits::capability_query::CapabilityQuery),
/// so the same `Arc` can be handed to a session for both roles.
pub struct VirtualDeviceLayer {
    pub(crate) registry: Arc<Registry>,
    recording_types: Vec<String>,
    chunk_interval: Duration,
    acquisitions: AtomicUsize,
}

impl VirtualDeviceLayer {
    pub fn new(cameras: impl IntoIterator<Item = VirtualCamera>) -> Self {
        let registry = Arc::new(Registry::default());
        for camera in cameras {
            registry.plug(camera);
        }
        Self {
            registry,
            recording_types: vec!["video/x-matroska;codecs=avc1".into(), "video/webm".into()],
            chunk_interval: Duration::from_millis(250),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Replace the recording MIME types recorders accept.
    pub fn with_recording_types(mut self, types: &[&str]) -> Self {
        self.recording_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    /// How often recorders emit a chunk.
    pub fn with_chunk_interval(mut self, interval: Duration) -> Self {
        self.chunk_interval = interval;
        self
    }

    /// Plug in a camera, replacing any camera with the same id.
    pub fn plug(&self, camera: VirtualCamera) {
        log::info!("Virtual camera {} plugged in", camera.id);
        self.registry.plug(camera);
    }

    /// Unplug a camera. Streams on it stop being live. Returns whether it was present.
    pub fn unplug(&self, device_id: &str) -> bool {
        let removed = self.registry.unplug(device_id);
        if removed {
            log::info!("Virtual camera {} unplugged", device_id);
        }
        removed
    }

    /// A busy camera enumerates but refuses every acquisition.
    pub fn set_busy(&self, device_id: &str, busy: bool) -> Result<(), DeviceError> {
        self.registry.with_device(device_id, |d| {
            d.busy = busy;
            Ok(())
        })
    }

    /// Number of `acquire_stream` calls so far.
    pub fn acquisition_count(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

/// Pick the mode a real camera would hand out for `constraints`.
///
/// Among the modes that satisfy the size and rate constraints, the one
/// closest to the aspect-ratio hint wins, then the largest.
fn select_mode(camera: &VirtualCamera, constraints: &StreamConstraints) -> Option<VideoConfig> {
    let distance = |config: &VideoConfig| match constraints.aspect_ratio {
        Some(ideal) => (config.resolution().aspect_ratio() - ideal).abs(),
        None => 0.0,
    };
    camera
        .video_configs
        .iter()
        .filter(|c| constraints.accepts(c.resolution()) && constraints.frame_rate.accepts_max(c.max_fps))
        .min_by(|a, b| {
            distance(*a)
                .total_cmp(&distance(*b))
                .then_with(|| b.resolution().area().cmp(&a.resolution().area()))
        })
        .copied()
}

fn negotiated_fps(frame_rate: FrameRate, pinned: Option<FpsRange>, max_fps: u32) -> u32 {
    match (frame_rate, pinned) {
        (FrameRate::Exact(fps), _) => fps,
        (_, Some(range)) => range.max.min(max_fps),
        (FrameRate::Range { ideal, .. }, None) => ideal.min(max_fps),
        (FrameRate::Min(_) | FrameRate::Any, None) => DEFAULT_FPS.min(max_fps),
    }
}

#[async_trait]
impl DeviceLayer for VirtualDeviceLayer {
    async fn enumerate_devices(&self) -> Result<Vec<String>, DeviceError> {
        Ok(self.registry.ids())
    }

    async fn acquire_stream(&self, constraints: &StreamConstraints) -> Result<Arc<dyn MediaStream>, DeviceError> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let live = Arc::new(AtomicBool::new(true));

        let (settings, max_photo) = self.registry.with_device(&constraints.device_id, |entry| {
            if entry.busy {
                return Err(DeviceError::Other(format!("{} is in use", constraints.device_id)));
            }
            let pinned = entry.pinned_fps.take();
            if let (Some(fps), Some(range)) = (constraints.frame_rate.exact(), pinned) {
                if fps < range.min || fps > range.max {
                    return Err(DeviceError::NotSatisfiable(format!(
                        "{} fps outside pinned range {}-{}",
                        fps, range.min, range.max
                    )));
                }
            }
            if let Some(fps) = constraints.frame_rate.exact() {
                if !entry.camera.supports_fixed_fps(fps) {
                    return Err(DeviceError::NotSatisfiable(format!("{} fps not supported", fps)));
                }
            }
            let mode = select_mode(&entry.camera, constraints)
                .ok_or_else(|| DeviceError::NotSatisfiable(constraints.to_string()))?;

            entry.live_flags.retain(|flag| flag.load(Ordering::SeqCst));
            entry.live_flags.push(Arc::clone(&live));
            let settings = TrackSettings {
                device_id: constraints.device_id.clone(),
                width: mode.width,
                height: mode.height,
                frame_rate: Some(negotiated_fps(constraints.frame_rate, pinned, mode.max_fps) as f64),
            };
            Ok((settings, entry.camera.max_photo_resolution()))
        })?;

        log::debug!(
            "Virtual stream on {} at {}x{}",
            settings.device_id,
            settings.width,
            settings.height
        );
        Ok(Arc::new(VirtualStream::new(
            settings,
            live,
            max_photo,
            Arc::clone(&self.registry),
            self.recording_types.clone(),
            self.chunk_interval,
        )))
    }

    fn is_recording_type_supported(&self, mime_type: &str) -> bool {
        self.recording_types.iter().any(|t| t == mime_type)
    }
}
