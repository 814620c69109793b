use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::resolution::Resolution;

/// Video resolutions below this max frame rate are not offered for recording.
pub const MIN_VIDEO_FPS: u32 = 24;

/// Which way a camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Front,
    Back,
    External,
    #[default]
    Unknown,
}

/// Frame-rate range supported by a device. `min == max` is a fixed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FpsRange {
    pub min: u32,
    pub max: u32,
}

impl FpsRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub const fn fixed(fps: u32) -> Self {
        Self { min: fps, max: fps }
    }

    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }
}

/// One stream configuration as reported by the capability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub max_fps: u32,
}

impl VideoConfig {
    pub const fn new(width: u32, height: u32, max_fps: u32) -> Self {
        Self { width, height, max_fps }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Capabilities of one physical camera.
///
/// Video resolutions are derived from the max-fps map, so the two always
/// describe the same set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceCapability {
    pub device_id: String,
    pub facing: Facing,
    pub photo_resolutions: Vec<Resolution>,
    video_max_fps: BTreeMap<Resolution, u32>,
    pub supported_fps_ranges: Vec<FpsRange>,
    pub portrait_mode_supported: bool,
}

impl DeviceCapability {
    pub fn new(device_id: impl Into<String>, facing: Facing) -> Self {
        Self {
            device_id: device_id.into(),
            facing,
            ..Self::default()
        }
    }

    pub fn with_photo_resolutions(mut self, resolutions: impl IntoIterator<Item = Resolution>) -> Self {
        self.photo_resolutions.clear();
        for r in resolutions {
            if !self.photo_resolutions.contains(&r) {
                self.photo_resolutions.push(r);
            }
        }
        self
    }

    /// Keeps configs that can sustain [`MIN_VIDEO_FPS`]. When a resolution is
    /// reported more than once the highest max fps wins.
    pub fn with_video_configs(mut self, configs: impl IntoIterator<Item = VideoConfig>) -> Self {
        self.video_max_fps.clear();
        for config in configs {
            if config.max_fps < MIN_VIDEO_FPS {
                continue;
            }
            let entry = self.video_max_fps.entry(config.resolution()).or_insert(0);
            *entry = (*entry).max(config.max_fps);
        }
        self
    }

    pub fn with_fps_ranges(mut self, ranges: impl IntoIterator<Item = FpsRange>) -> Self {
        self.supported_fps_ranges = ranges.into_iter().collect();
        self
    }

    pub fn with_portrait_mode(mut self, supported: bool) -> Self {
        self.portrait_mode_supported = supported;
        self
    }

    pub fn video_resolutions(&self) -> Vec<Resolution> {
        self.video_max_fps.keys().copied().collect()
    }

    pub fn video_max_fps(&self, resolution: Resolution) -> Option<u32> {
        self.video_max_fps.get(&resolution).copied()
    }

    /// Fixed frame rates usable at `resolution`, ascending.
    pub fn fixed_fps_for(&self, resolution: Resolution) -> Vec<u32> {
        let Some(max_fps) = self.video_max_fps(resolution) else {
            return Vec::new();
        };
        let mut fpses: Vec<u32> = self
            .supported_fps_ranges
            .iter()
            .filter(|range| range.is_fixed() && range.max <= max_fps)
            .map(|range| range.max)
            .collect();
        fpses.sort_unstable();
        fpses.dedup();
        fpses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_fps_video_configs_are_dropped() {
        let cap = DeviceCapability::new("cam", Facing::Back).with_video_configs([
            VideoConfig::new(1920, 1080, 30),
            VideoConfig::new(3264, 2448, 15),
            VideoConfig::new(1280, 720, 60),
        ]);

        assert_eq!(
            cap.video_resolutions(),
            vec![Resolution::new(1280, 720), Resolution::new(1920, 1080)]
        );
        assert_eq!(cap.video_max_fps(Resolution::new(3264, 2448)), None);
        assert_eq!(cap.video_max_fps(Resolution::new(1280, 720)), Some(60));
    }

    #[test]
    fn duplicate_configs_keep_highest_fps() {
        let cap = DeviceCapability::new("cam", Facing::Back).with_video_configs([
            VideoConfig::new(1280, 720, 30),
            VideoConfig::new(1280, 720, 60),
        ]);
        assert_eq!(cap.video_max_fps(Resolution::new(1280, 720)), Some(60));
        assert_eq!(cap.video_resolutions().len(), 1);
    }

    #[test]
    fn fixed_fps_respects_resolution_max() {
        let cap = DeviceCapability::new("cam", Facing::Front)
            .with_video_configs([VideoConfig::new(1920, 1080, 30), VideoConfig::new(1280, 720, 60)])
            .with_fps_ranges([
                FpsRange::new(15, 30),
                FpsRange::fixed(30),
                FpsRange::fixed(60),
                FpsRange::fixed(24),
            ]);

        assert_eq!(cap.fixed_fps_for(Resolution::new(1920, 1080)), vec![24, 30]);
        assert_eq!(cap.fixed_fps_for(Resolution::new(1280, 720)), vec![24, 30, 60]);
        assert!(cap.fixed_fps_for(Resolution::new(640, 480)).is_empty());
    }

    #[test]
    fn photo_resolutions_are_deduplicated() {
        let cap = DeviceCapability::new("cam", Facing::Back).with_photo_resolutions([
            Resolution::new(640, 480),
            Resolution::new(640, 480),
            Resolution::new(1920, 1080),
        ]);
        assert_eq!(cap.photo_resolutions.len(), 2);
    }
}
