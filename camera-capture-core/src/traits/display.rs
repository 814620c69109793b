/// Read-only facts about the screen the preview is shown on.
pub trait DisplayInfo: Send + Sync {
    fn screen_width_px(&self) -> u32;

    fn device_pixel_ratio(&self) -> f64;

    /// Screen width in physical pixels.
    fn physical_width(&self) -> u32 {
        (self.screen_width_px() as f64 * self.device_pixel_ratio()).floor() as u32
    }
}

/// Fixed screen metrics, for hosts without a live display source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDisplay {
    pub screen_width_px: u32,
    pub device_pixel_ratio: f64,
}

impl DisplayInfo for FixedDisplay {
    fn screen_width_px(&self) -> u32 {
        self.screen_width_px
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}
