use std::fmt;

use serde::{Deserialize, Serialize};

/// A capture or preview resolution in pixels.
///
/// Equality is an exact width/height match. Use [`Resolution::aspect_ratio_equals`]
/// to compare shapes without going through floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width over height rounded to 4 decimal places. Zero height yields 0.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        let ratio = self.width as f64 / self.height as f64;
        (ratio * 10_000.0).round() / 10_000.0
    }

    /// Exact cross-product comparison of the two aspect ratios.
    pub fn aspect_ratio_equals(&self, other: &Resolution) -> bool {
        self.width as u64 * other.height as u64 == other.width as u64 * self.height as u64
    }

    /// Grouping bucket for this resolution's aspect ratio.
    pub fn aspect_key(&self) -> AspectRatioKey {
        AspectRatioKey::of(*self)
    }

    /// Composite key used when a resolution keys persisted data.
    pub fn key(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let (w, h) = key.split_once('x')?;
        Some(Self::new(w.trim().parse().ok()?, h.trim().parse().ok()?))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer aspect-ratio bucket: `round(width * 10000 / height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AspectRatioKey(pub u32);

impl AspectRatioKey {
    pub const SIXTEEN_NINE: AspectRatioKey = AspectRatioKey(17_778);
    pub const FOUR_THREE: AspectRatioKey = AspectRatioKey(13_333);

    pub fn of(resolution: Resolution) -> Self {
        if resolution.height == 0 {
            return AspectRatioKey(0);
        }
        let scaled = (resolution.width as u64 * 10_000 * 2 + resolution.height as u64)
            / (resolution.height as u64 * 2);
        AspectRatioKey(u32::try_from(scaled).unwrap_or(u32::MAX))
    }

    /// Bucket for a preview resolution reported by the device.
    ///
    /// Some modules report 848x480 for what is really a 16:9 stream.
    pub fn of_preview(resolution: Resolution) -> Self {
        if resolution == Resolution::new(848, 480) {
            return Self::SIXTEEN_NINE;
        }
        Self::of(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn area_and_aspect_ratio() {
        let r = Resolution::new(1920, 1080);
        assert_eq!(r.area(), 2_073_600);
        assert_relative_eq!(r.aspect_ratio(), 1.7778);
        assert_relative_eq!(Resolution::new(640, 480).aspect_ratio(), 1.3333);
        assert_eq!(Resolution::new(640, 0).aspect_ratio(), 0.0);
    }

    #[test]
    fn area_does_not_overflow() {
        let r = Resolution::new(u32::MAX, 2);
        assert_eq!(r.area(), u32::MAX as u64 * 2);
    }

    #[test]
    fn equality_implies_aspect_equality() {
        let samples = [
            Resolution::new(1920, 1080),
            Resolution::new(1280, 720),
            Resolution::new(640, 480),
            Resolution::new(4032, 3024),
            Resolution::new(848, 480),
        ];
        for a in &samples {
            assert_eq!(a, a);
            assert!(a.aspect_ratio_equals(a));
            for b in &samples {
                assert_eq!(a == b, b == a);
                if a == b {
                    assert!(a.aspect_ratio_equals(b));
                }
            }
        }
    }

    #[test]
    fn aspect_ratio_equals_uses_cross_product() {
        assert!(Resolution::new(1920, 1080).aspect_ratio_equals(&Resolution::new(1280, 720)));
        assert!(Resolution::new(4032, 3024).aspect_ratio_equals(&Resolution::new(640, 480)));
        assert!(!Resolution::new(1920, 1080).aspect_ratio_equals(&Resolution::new(640, 480)));
        assert!(!Resolution::new(848, 480).aspect_ratio_equals(&Resolution::new(1280, 720)));
    }

    #[test]
    fn key_round_trip_and_display() {
        let r = Resolution::new(1280, 720);
        assert_eq!(r.key(), "1280x720");
        assert_eq!(r.to_string(), "1280x720");
        assert_eq!(Resolution::from_key("1280x720"), Some(r));
        assert_eq!(Resolution::from_key("1280"), None);
        assert_eq!(Resolution::from_key("axb"), None);
    }

    #[test]
    fn aspect_keys_group_shapes() {
        assert_eq!(Resolution::new(1920, 1080).aspect_key(), AspectRatioKey::SIXTEEN_NINE);
        assert_eq!(Resolution::new(1280, 720).aspect_key(), AspectRatioKey::SIXTEEN_NINE);
        assert_eq!(Resolution::new(640, 480).aspect_key(), AspectRatioKey::FOUR_THREE);
        assert_ne!(Resolution::new(848, 480).aspect_key(), AspectRatioKey::SIXTEEN_NINE);
        assert_eq!(
            AspectRatioKey::of_preview(Resolution::new(848, 480)),
            AspectRatioKey::SIXTEEN_NINE
        );
    }

    #[test]
    fn extreme_aspect_keys_saturate() {
        let wide = AspectRatioKey::of(Resolution::new(u32::MAX, 1));
        assert_eq!(wide, AspectRatioKey(u32::MAX));
        assert!(wide > AspectRatioKey::of(Resolution::new(100_000, 1)));
        assert_eq!(AspectRatioKey::of(Resolution::new(1, u32::MAX)), AspectRatioKey(0));
    }
}
