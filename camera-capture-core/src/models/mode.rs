use std::fmt;

use serde::{Deserialize, Serialize};

/// Which preference engine a mode negotiates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    Photo,
    Video,
}

/// Capture modes the application can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Photo,
    Video,
    Square,
    Portrait,
}

impl Mode {
    pub fn capture_kind(&self) -> CaptureKind {
        match self {
            Mode::Video => CaptureKind::Video,
            Mode::Photo | Mode::Square | Mode::Portrait => CaptureKind::Photo,
        }
    }

    /// Ideal aspect ratio used by the coarse default constraints.
    pub fn default_aspect_ratio(&self) -> f64 {
        match self.capture_kind() {
            CaptureKind::Video => 16.0 / 9.0,
            CaptureKind::Photo => 4.0 / 3.0,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Photo => "photo",
            Mode::Video => "video",
            Mode::Square => "square",
            Mode::Portrait => "portrait",
        };
        f.write_str(name)
    }
}
