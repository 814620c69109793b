//! Virtual camera descriptions and the registry shared by every handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use camera_capture_core::models::capability::{Facing, FpsRange, VideoConfig};
use camera_capture_core::models::error::DeviceError;
use camera_capture_core::models::resolution::Resolution;

/// What a virtual camera claims to support.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualCamera {
    pub id: String,
    pub facing: Facing,
    pub video_configs: Vec<VideoConfig>,
    pub photo_resolutions: Vec<Resolution>,
    /// Empty means any frame rate up to a mode's max is accepted.
    pub fps_ranges: Vec<FpsRange>,
    pub portrait: bool,
}

impl VirtualCamera {
    pub fn new(id: impl Into<String>, facing: Facing) -> Self {
        Self {
            id: id.into(),
            facing,
            video_configs: Vec::new(),
            photo_resolutions: Vec::new(),
            fps_ranges: Vec::new(),
            portrait: false,
        }
    }

    /// A 720p webcam with a VGA fallback mode.
    pub fn webcam(id: impl Into<String>) -> Self {
        Self::new(id, Facing::External)
            .with_video_config(1280, 720, 30)
            .with_video_config(640, 480, 30)
            .with_photo_resolution(1280, 720)
            .with_photo_resolution(640, 480)
    }

    /// A phone-style front camera with fixed 30 and 60 fps ranges and portrait support.
    pub fn front_camera(id: impl Into<String>) -> Self {
        Self::new(id, Facing::Front)
            .with_video_config(1920, 1080, 60)
            .with_video_config(1280, 720, 60)
            .with_video_config(640, 480, 30)
            .with_photo_resolution(2592, 1944)
            .with_photo_resolution(1920, 1080)
            .with_fps_range(FpsRange::new(15, 30))
            .with_fps_range(FpsRange::fixed(30))
            .with_fps_range(FpsRange::fixed(60))
            .with_portrait(true)
    }

    pub fn with_video_config(mut self, width: u32, height: u32, max_fps: u32) -> Self {
        self.video_configs.push(VideoConfig::new(width, height, max_fps));
        self
    }

    pub fn with_photo_resolution(mut self, width: u32, height: u32) -> Self {
        self.photo_resolutions.push(Resolution::new(width, height));
        self
    }

    pub fn with_fps_range(mut self, range: FpsRange) -> Self {
        self.fps_ranges.push(range);
        self
    }

    pub fn with_portrait(mut self, portrait: bool) -> Self {
        self.portrait = portrait;
        self
    }

    /// Largest still size: the biggest photo resolution, or the biggest video mode.
    pub fn max_photo_resolution(&self) -> Resolution {
        self.photo_resolutions
            .iter()
            .copied()
            .chain(self.video_configs.iter().map(VideoConfig::resolution))
            .max_by_key(|r| r.area())
            .unwrap_or(Resolution::new(640, 480))
    }

    pub(crate) fn supports_fps_range(&self, range: FpsRange) -> bool {
        self.fps_ranges.is_empty() || self.fps_ranges.contains(&range)
    }

    pub(crate) fn supports_fixed_fps(&self, fps: u32) -> bool {
        self.fps_ranges.is_empty() || self.fps_ranges.iter().any(|r| r.min <= fps && fps <= r.max)
    }
}

/// Per-device runtime state.
pub(crate) struct DeviceEntry {
    pub camera: VirtualCamera,
    pub busy: bool,
    /// Range pinned for the next acquisition, consumed by it.
    pub pinned_fps: Option<FpsRange>,
    pub live_flags: Vec<Arc<AtomicBool>>,
    pub pending_effects: Vec<oneshot::Sender<Vec<u8>>>,
}

impl DeviceEntry {
    fn new(camera: VirtualCamera) -> Self {
        Self {
            camera,
            busy: false,
            pinned_fps: None,
            live_flags: Vec::new(),
            pending_effects: Vec::new(),
        }
    }
}

/// Devices currently plugged in, in enumeration order.
#[derive(Default)]
pub(crate) struct Registry {
    devices: Mutex<Vec<DeviceEntry>>,
}

impl Registry {
    pub fn plug(&self, camera: VirtualCamera) {
        let mut devices = self.devices.lock();
        match devices.iter_mut().find(|d| d.camera.id == camera.id) {
            Some(entry) => entry.camera = camera,
            None => devices.push(DeviceEntry::new(camera)),
        }
    }

    /// Remove a device. Its streams stop delivering frames.
    pub fn unplug(&self, device_id: &str) -> bool {
        let mut devices = self.devices.lock();
        let Some(index) = devices.iter().position(|d| d.camera.id == device_id) else {
            return false;
        };
        let entry = devices.remove(index);
        for flag in &entry.live_flags {
            flag.store(false, Ordering::SeqCst);
        }
        true
    }

    pub fn ids(&self) -> Vec<String> {
        self.devices.lock().iter().map(|d| d.camera.id.clone()).collect()
    }

    /// Run `f` against a plugged-in device.
    pub fn with_device<T>(
        &self,
        device_id: &str,
        f: impl FnOnce(&mut DeviceEntry) -> Result<T, DeviceError>,
    ) -> Result<T, DeviceError> {
        let mut devices = self.devices.lock();
        let entry = devices
            .iter_mut()
            .find(|d| d.camera.id == device_id)
            .ok_or(DeviceError::Unavailable)?;
        f(entry)
    }

    pub fn camera(&self, device_id: &str) -> Result<VirtualCamera, DeviceError> {
        self.with_device(device_id, |d| Ok(d.camera.clone()))
    }

    /// Hand out the effect requests waiting on the next photo of `device_id`.
    pub fn take_pending_effects(&self, device_id: &str) -> Vec<oneshot::Sender<Vec<u8>>> {
        self.with_device(device_id, |d| Ok(std::mem::take(&mut d.pending_effects)))
            .unwrap_or_default()
    }
}
