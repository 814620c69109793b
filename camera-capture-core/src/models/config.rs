use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::mode::Mode;

/// Countdown before a take starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Countdown {
    #[default]
    Off,
    Three,
    Ten,
}

impl Countdown {
    pub fn ticks(&self) -> u32 {
        match self {
            Countdown::Off => 0,
            Countdown::Three => 3,
            Countdown::Ten => 10,
        }
    }
}

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct SessionConfiguration {
    /// Delay before `start()` is retried after exhaustion or while locked (default: 100ms).
    pub retry_interval: Duration,

    /// How often the live stream is polled for liveness (default: 100ms).
    pub watchdog_interval: Duration,

    /// Length of one countdown tick (default: 1s).
    pub tick_interval: Duration,

    /// Countdown before each take (default: off).
    pub countdown: Countdown,

    /// Mode the session starts in (default: photo).
    pub initial_mode: Mode,

    /// Recording MIME types in order of preference. The first supported one is used.
    pub recording_mime_types: Vec<String>,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.retry_interval.is_zero() {
            return Err("retry interval must be positive".into());
        }
        if self.watchdog_interval.is_zero() {
            return Err("watchdog interval must be positive".into());
        }
        if self.tick_interval.is_zero() {
            return Err("tick interval must be positive".into());
        }
        if self.recording_mime_types.is_empty() {
            return Err("at least one recording MIME type is required".into());
        }
        Ok(())
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(100),
            watchdog_interval: Duration::from_millis(100),
            tick_interval: Duration::from_secs(1),
            countdown: Countdown::Off,
            initial_mode: Mode::Photo,
            recording_mime_types: vec!["video/x-matroska;codecs=avc1".into()],
        }
    }
}
