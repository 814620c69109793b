//! Constraint preference engine.
//!
//! One [`ConstraintsPreferrer`] exists per capture kind. It remembers the
//! preferred capture resolution of every device (and, for video, the
//! preferred fixed frame rate per resolution), and turns a device's
//! capabilities into a priority-ordered list of [`CaptureCandidate`]s.
//!
//! ```text
//! DeviceCapability ──update_devices_info──▶ preferred resolution per device
//!                                              │
//! get_sorted_candidates ◀──────────────────────┘
//!        │ (video.rs / photo.rs)
//!        ▼
//! [CaptureCandidate] ──session──▶ settled stream ──update_values──▶ persisted
//! ```

pub mod photo;
pub mod video;

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::models::capability::{DeviceCapability, Facing};
use crate::models::constraints::{CaptureCandidate, TrackSettings};
use crate::models::mode::CaptureKind;
use crate::models::resolution::Resolution;
use crate::traits::display::DisplayInfo;
use crate::traits::preference_store::{PreferenceMap, PreferenceStore};

pub const PHOTO_RESOLUTION_KEY: &str = "devicePhotoResolution";
pub const VIDEO_RESOLUTION_KEY: &str = "deviceVideoResolution";
pub const VIDEO_FPS_KEY: &str = "deviceVideoFps";

/// Video resolutions tried, in order, when a device has no usable preference.
const NICE_VIDEO_DEFAULTS: [Resolution; 2] = [Resolution::new(1920, 1080), Resolution::new(1280, 720)];

/// Called with `(device_id, resolution)` when a device's preferred resolution changes.
pub type ResolutionChangeListener = Arc<dyn Fn(&str, Resolution) + Send + Sync>;

/// Called when the active stream must be renegotiated.
pub type ReconfigureHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct PreferenceState {
    preferred: HashMap<String, Resolution>,
    preferred_fps: HashMap<String, HashMap<Resolution, u32>>,
    capabilities: HashMap<String, DeviceCapability>,
    facing: HashMap<String, Facing>,
    active_device: Option<String>,
}

/// Preference state and candidate ordering for one capture kind.
pub struct ConstraintsPreferrer {
    kind: CaptureKind,
    store: Arc<dyn PreferenceStore>,
    display: Arc<dyn DisplayInfo>,
    state: Mutex<PreferenceState>,
    listener: Mutex<Option<ResolutionChangeListener>>,
    reconfigure: Mutex<Option<ReconfigureHandler>>,
}

impl ConstraintsPreferrer {
    /// Create an engine, waiting for the persisted preferences to load.
    ///
    /// Load failures are logged and leave the engine with defaults.
    pub async fn load(
        kind: CaptureKind,
        store: Arc<dyn PreferenceStore>,
        display: Arc<dyn DisplayInfo>,
    ) -> Self {
        let mut state = PreferenceState::default();

        match store.load(resolution_key(kind)).await {
            Ok(map) => state.preferred = parse_resolutions(&map),
            Err(e) => log::warn!("Failed to load {:?} resolution preferences: {}", kind, e),
        }
        if kind == CaptureKind::Video {
            match store.load(VIDEO_FPS_KEY).await {
                Ok(map) => state.preferred_fps = parse_fps(&map),
                Err(e) => log::warn!("Failed to load fps preferences: {}", e),
            }
        }

        Self {
            kind,
            store,
            display,
            state: Mutex::new(state),
            listener: Mutex::new(None),
            reconfigure: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    /// Register the preferred-resolution listener. The last registration wins.
    pub fn set_preferred_resolution_change_listener(&self, listener: ResolutionChangeListener) {
        *self.listener.lock() = Some(listener);
    }

    pub fn set_reconfigure_handler(&self, handler: ReconfigureHandler) {
        *self.reconfigure.lock() = Some(handler);
    }

    /// Mark which device is streaming under this engine's kind, if any.
    pub fn set_active_device(&self, device_id: Option<String>) {
        self.state.lock().active_device = device_id;
    }

    pub fn active_device(&self) -> Option<String> {
        self.state.lock().active_device.clone()
    }

    pub fn preferred_resolution(&self, device_id: &str) -> Option<Resolution> {
        self.state.lock().preferred.get(device_id).copied()
    }

    pub fn preferred_fps(&self, device_id: &str, resolution: Resolution) -> Option<u32> {
        self.state
            .lock()
            .preferred_fps
            .get(device_id)
            .and_then(|m| m.get(&resolution))
            .copied()
    }

    pub fn capability(&self, device_id: &str) -> Option<DeviceCapability> {
        self.state.lock().capabilities.get(device_id).cloned()
    }

    pub fn facing(&self, device_id: &str) -> Facing {
        self.state.lock().facing.get(device_id).copied().unwrap_or_default()
    }

    /// Refresh device capabilities and validate each device's preferred resolution.
    pub fn update_devices_info(&self, devices: &[DeviceCapability]) {
        {
            let mut state = self.state.lock();
            for device in devices {
                let resolutions = self.resolutions_of(device);
                let current = state.preferred.get(&device.device_id).copied();
                match pick_default(self.kind, current, &resolutions) {
                    Some(resolution) => {
                        if current != Some(resolution) {
                            log::debug!(
                                "{:?} preference for {} set to {}",
                                self.kind,
                                device.device_id,
                                resolution
                            );
                        }
                        state.preferred.insert(device.device_id.clone(), resolution);
                    }
                    None => {
                        log::debug!("{} reports no {:?} resolutions", device.device_id, self.kind);
                        state.preferred.remove(&device.device_id);
                    }
                }
                state.facing.insert(device.device_id.clone(), device.facing);
                state.capabilities.insert(device.device_id.clone(), device.clone());
            }
        }
        self.persist();
    }

    /// Record the values a stream settled on as the new preference.
    pub fn update_values(&self, device_id: &str, settings: &TrackSettings, facing: Facing, resolution: Resolution) {
        let changed = {
            let mut state = self.state.lock();
            state.facing.insert(device_id.to_string(), facing);
            let previous = state.preferred.insert(device_id.to_string(), resolution);

            if self.kind == CaptureKind::Video {
                let fixed = state
                    .capabilities
                    .get(device_id)
                    .map(|cap| cap.fixed_fps_for(resolution))
                    .unwrap_or_default();
                if let Some(fps) = settings.rounded_frame_rate().filter(|fps| fixed.contains(fps)) {
                    state
                        .preferred_fps
                        .entry(device_id.to_string())
                        .or_default()
                        .insert(resolution, fps);
                }
            }
            previous != Some(resolution)
        };

        self.persist();
        if changed {
            self.notify(device_id, resolution);
        }
    }

    /// Explicit user override of a device's preferred resolution.
    pub fn change_preferred_resolution(&self, device_id: &str, resolution: Resolution) {
        let is_active = {
            let mut state = self.state.lock();
            state.preferred.insert(device_id.to_string(), resolution);
            state.active_device.as_deref() == Some(device_id)
        };
        self.persist();

        if is_active {
            let handler = self.reconfigure.lock().clone();
            if let Some(handler) = handler {
                log::info!("Reconfiguring {} for {}", device_id, resolution);
                handler();
                return;
            }
        }
        self.notify(device_id, resolution);
    }

    /// Capture candidates for `device_id`, best first.
    ///
    /// Video ignores `preview_resolutions`: the recorded stream is the preview.
    pub fn get_sorted_candidates(&self, device_id: &str, preview_resolutions: &[Resolution]) -> Vec<CaptureCandidate> {
        let state = self.state.lock();
        let Some(capability) = state.capabilities.get(device_id) else {
            log::debug!("No capabilities known for {}", device_id);
            return Vec::new();
        };
        let preferred = state.preferred.get(device_id).copied();

        match self.kind {
            CaptureKind::Video => {
                let empty = HashMap::new();
                let fps_prefs = state.preferred_fps.get(device_id).unwrap_or(&empty);
                video::sorted_candidates(device_id, capability, preferred, fps_prefs)
            }
            CaptureKind::Photo => photo::sorted_candidates(
                device_id,
                &capability.photo_resolutions,
                preview_resolutions,
                preferred,
                self.display.physical_width(),
            ),
        }
    }

    fn resolutions_of(&self, device: &DeviceCapability) -> Vec<Resolution> {
        match self.kind {
            CaptureKind::Photo => device.photo_resolutions.clone(),
            CaptureKind::Video => device.video_resolutions(),
        }
    }

    fn notify(&self, device_id: &str, resolution: Resolution) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(device_id, resolution);
        }
    }

    /// Save the current state without waiting for the store.
    fn persist(&self) {
        let (resolutions, fps) = {
            let state = self.state.lock();
            let fps = (self.kind == CaptureKind::Video).then(|| encode_fps(&state.preferred_fps));
            (encode_resolutions(&state.preferred), fps)
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::warn!("No runtime available, {:?} preferences not saved", self.kind);
            return;
        };

        let store = Arc::clone(&self.store);
        let key = resolution_key(self.kind);
        handle.spawn(async move {
            if let Err(e) = store.save(key, resolutions).await {
                log::warn!("Failed to save {}: {}", key, e);
            }
            if let Some(fps) = fps {
                if let Err(e) = store.save(VIDEO_FPS_KEY, fps).await {
                    log::warn!("Failed to save {}: {}", VIDEO_FPS_KEY, e);
                }
            }
        });
    }
}

fn resolution_key(kind: CaptureKind) -> &'static str {
    match kind {
        CaptureKind::Photo => PHOTO_RESOLUTION_KEY,
        CaptureKind::Video => VIDEO_RESOLUTION_KEY,
    }
}

/// Keep `current` if the device still offers it, else fall back to a default.
fn pick_default(kind: CaptureKind, current: Option<Resolution>, resolutions: &[Resolution]) -> Option<Resolution> {
    if let Some(current) = current.filter(|r| resolutions.contains(r)) {
        return Some(current);
    }
    if kind == CaptureKind::Video {
        if let Some(nice) = NICE_VIDEO_DEFAULTS.iter().find(|r| resolutions.contains(r)) {
            return Some(*nice);
        }
    }
    resolutions
        .iter()
        .copied()
        .max_by_key(|r| (r.area(), r.width))
}

/// Sort so the preferred resolution comes first, then resolutions sharing its
/// aspect ratio, then everything else by decreasing area.
pub(crate) fn sort_by_preference(resolutions: &mut [Resolution], preferred: Option<Resolution>) {
    resolutions.sort_by_key(|r| {
        let exact = preferred == Some(*r);
        let same_aspect = preferred.is_some_and(|p| p.aspect_ratio_equals(r));
        (!exact, !same_aspect, Reverse(r.area()), Reverse(r.width))
    });
}

fn encode_resolutions(preferred: &HashMap<String, Resolution>) -> PreferenceMap {
    preferred
        .iter()
        .map(|(device, r)| (device.clone(), json!([r.width, r.height])))
        .collect()
}

fn encode_fps(fps: &HashMap<String, HashMap<Resolution, u32>>) -> PreferenceMap {
    fps.iter()
        .map(|(device, by_resolution)| {
            let inner: PreferenceMap = by_resolution
                .iter()
                .map(|(r, fps)| (r.key(), json!(fps)))
                .collect();
            (device.clone(), Value::Object(inner))
        })
        .collect()
}

fn parse_resolutions(map: &PreferenceMap) -> HashMap<String, Resolution> {
    let mut preferred = HashMap::new();
    for (device, value) in map {
        let parsed = value.as_array().and_then(|pair| match pair.as_slice() {
            [w, h] => Some(Resolution::new(
                u32::try_from(w.as_u64()?).ok()?,
                u32::try_from(h.as_u64()?).ok()?,
            )),
            _ => None,
        });
        match parsed {
            Some(r) => {
                preferred.insert(device.clone(), r);
            }
            None => log::warn!("Ignoring malformed resolution preference for {}: {}", device, value),
        }
    }
    preferred
}

fn parse_fps(map: &PreferenceMap) -> HashMap<String, HashMap<Resolution, u32>> {
    let mut fps = HashMap::new();
    for (device, value) in map {
        let Some(inner) = value.as_object() else {
            log::warn!("Ignoring malformed fps preference for {}", device);
            continue;
        };
        let by_resolution: HashMap<Resolution, u32> = inner
            .iter()
            .filter_map(|(key, v)| {
                let r = Resolution::from_key(key)?;
                let f = u32::try_from(v.as_u64()?).ok()?;
                Some((r, f))
            })
            .collect();
        fps.insert(device.clone(), by_resolution);
    }
    fps
}
