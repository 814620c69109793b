/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → acquiring → capturing
///   ↑        │           │
///   └────────┴── stopping ┘   (stop, failure, or stream ended)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Acquiring,
    Capturing { device_id: String },
    Stopping,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }

    /// The device currently streaming, if any.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Capturing { device_id } => Some(device_id),
            _ => None,
        }
    }
}
