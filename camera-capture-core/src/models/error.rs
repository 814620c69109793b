use thiserror::Error;

/// Errors reported by the device layer and the capability query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The constraints cannot be satisfied by the device. Expected during negotiation.
    #[error("constraints not satisfiable: {0}")]
    NotSatisfiable(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("device not available")]
    Unavailable,

    #[error("device error: {0}")]
    Other(String),
}

impl DeviceError {
    pub fn is_not_satisfiable(&self) -> bool {
        matches!(self, Self::NotSatisfiable(_))
    }
}

/// Session-level errors surfaced by the capture session controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no camera available")]
    NoCamera,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

/// Errors that abandon a single take. Never retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TakeError {
    #[error("recording format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("recording produced no data")]
    EmptyRecording,

    #[error("photo capability query failed: {0}")]
    CapabilityQueryFailed(String),

    #[error("portrait mode not supported on {0}")]
    PortraitUnsupported(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("saving result failed: {0}")]
    SaveFailed(String),

    #[error("no active stream")]
    NoStream,
}

/// Errors from preference and result storage backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<StorageError> for TakeError {
    fn from(e: StorageError) -> Self {
        Self::SaveFailed(e.to_string())
    }
}
