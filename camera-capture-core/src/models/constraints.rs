use std::fmt;

use super::resolution::Resolution;

/// Frame rate floor used by the coarse default constraints.
pub const DEFAULT_MIN_FPS: u32 = 24;

/// Range requested when a candidate carries no fixed frame rate.
pub const FALLBACK_FPS_MIN: u32 = 20;
pub const FALLBACK_FPS_IDEAL: u32 = 30;

/// Constraint on one stream dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimension {
    #[default]
    Any,
    Exact(u32),
    Min(u32),
}

impl Dimension {
    pub fn accepts(&self, value: u32) -> bool {
        match *self {
            Dimension::Any => true,
            Dimension::Exact(v) => value == v,
            Dimension::Min(v) => value >= v,
        }
    }
}

/// Constraint on the stream frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameRate {
    #[default]
    Any,
    Exact(u32),
    Min(u32),
    Range { min: u32, ideal: u32 },
}

impl FrameRate {
    /// The fallback range for candidates without a fixed frame rate.
    pub const fn fallback() -> Self {
        FrameRate::Range {
            min: FALLBACK_FPS_MIN,
            ideal: FALLBACK_FPS_IDEAL,
        }
    }

    pub fn fixed(fps: Option<u32>) -> Self {
        match fps {
            Some(fps) => FrameRate::Exact(fps),
            None => FrameRate::fallback(),
        }
    }

    /// The fixed rate this constraint pins, if any.
    pub fn exact(&self) -> Option<u32> {
        match *self {
            FrameRate::Exact(fps) => Some(fps),
            _ => None,
        }
    }

    /// Whether a device able to run at up to `max_fps` satisfies this constraint.
    pub fn accepts_max(&self, max_fps: u32) -> bool {
        match *self {
            FrameRate::Any => true,
            FrameRate::Exact(fps) => fps <= max_fps,
            FrameRate::Min(min) | FrameRate::Range { min, .. } => max_fps >= min,
        }
    }
}

/// One stream request offered to the device layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamConstraints {
    pub device_id: String,
    pub width: Dimension,
    pub height: Dimension,
    /// Ideal aspect ratio; a hint, never a hard requirement.
    pub aspect_ratio: Option<f64>,
    pub frame_rate: FrameRate,
}

impl StreamConstraints {
    /// Exact-size request used by the fine-grained candidates.
    pub fn exact(device_id: &str, resolution: Resolution, frame_rate: FrameRate) -> Self {
        Self {
            device_id: device_id.to_string(),
            width: Dimension::Exact(resolution.width),
            height: Dimension::Exact(resolution.height),
            aspect_ratio: None,
            frame_rate,
        }
    }

    /// Coarse best-guess requests used when nothing is known about a device.
    pub fn coarse_defaults(device_id: &str, ideal_aspect_ratio: f64) -> Vec<Self> {
        vec![
            Self {
                device_id: device_id.to_string(),
                width: Dimension::Min(1280),
                height: Dimension::Any,
                aspect_ratio: Some(ideal_aspect_ratio),
                frame_rate: FrameRate::Min(DEFAULT_MIN_FPS),
            },
            Self {
                device_id: device_id.to_string(),
                width: Dimension::Min(640),
                height: Dimension::Any,
                aspect_ratio: None,
                frame_rate: FrameRate::Min(DEFAULT_MIN_FPS),
            },
        ]
    }

    pub fn accepts(&self, resolution: Resolution) -> bool {
        self.width.accepts(resolution.width) && self.height.accepts(resolution.height)
    }
}

impl fmt::Display for StreamConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} width={:?} height={:?} aspect={:?} fps={:?}",
            self.device_id, self.width, self.height, self.aspect_ratio, self.frame_rate
        )
    }
}

/// A capture resolution with its stream requests, in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureCandidate {
    pub resolution: Resolution,
    pub preview_requests: Vec<StreamConstraints>,
}

/// Settings reported by a live stream once acquired.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSettings {
    pub device_id: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
}

impl TrackSettings {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// The reported frame rate rounded to a whole number.
    pub fn rounded_frame_rate(&self) -> Option<u32> {
        self.frame_rate
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| fps.round() as u32)
    }
}

/// `{min, max, step}` range reported for a photo setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaSettingsRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Photo capabilities of an image-capture handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoCapabilities {
    pub image_width: MediaSettingsRange,
    pub image_height: MediaSettingsRange,
}

impl PhotoCapabilities {
    /// Largest size within the capability ranges that keeps `aspect`'s shape.
    pub fn max_matching(&self, aspect: Resolution) -> Option<Resolution> {
        if aspect.width == 0 || aspect.height == 0 {
            return None;
        }
        let ratio = aspect.width as f64 / aspect.height as f64;
        let mut width = self.image_width.max.floor();
        let mut height = (width / ratio).round();
        if height > self.image_height.max {
            height = self.image_height.max.floor();
            width = (height * ratio).round();
        }
        if width < 1.0 || height < 1.0 {
            return None;
        }
        Some(Resolution::new(width as u32, height as u32))
    }
}

/// Settings passed to a photo capture call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhotoSettings {
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
}

impl PhotoSettings {
    pub fn for_resolution(resolution: Option<Resolution>) -> Self {
        Self {
            image_width: resolution.map(|r| r.width),
            image_height: resolution.map(|r| r.height),
        }
    }
}
