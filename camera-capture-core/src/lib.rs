//! # camera-capture-core
//!
//! Platform-agnostic camera capture core library.
//!
//! Decides which resolution, frame rate and preview combination to request
//! from a camera, acquires a stream with retries, and sequences photo and
//! video takes (countdown, capture, finalize, save). Platform backends
//! implement the `DeviceLayer` and `CapabilityQuery` traits and plug into the
//! generic `CaptureSessionController`.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/       ← DeviceLayer, MediaStream, CapabilityQuery, PreferenceStore, ResultSink, SessionDelegate, ...
//! ├── models/       ← Resolution, DeviceCapability, StreamConstraints, SessionState, errors, config
//! ├── preference/   ← ConstraintsPreferrer (candidate ordering, persisted preferences)
//! ├── session/      ← CaptureSessionController (acquire, retry, watchdog)
//! ├── mode/         ← ModeController (photo, video, square, portrait takes)
//! ├── timer         ← TimerTick countdown
//! ├── processing/   ← square crop
//! └── storage/      ← JSON file / in-memory preference stores, directory result sink, metadata
//! ```

pub mod mode;
pub mod models;
pub mod preference;
pub mod processing;
pub mod session;
pub mod storage;
pub mod timer;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use mode::{ModeContext, ModeController, TakeHandle};
pub use models::capability::{DeviceCapability, Facing, FpsRange, VideoConfig};
pub use models::config::{Countdown, SessionConfiguration};
pub use models::constraints::{
    CaptureCandidate, Dimension, FrameRate, MediaSettingsRange, PhotoCapabilities, PhotoSettings,
    StreamConstraints, TrackSettings,
};
pub use models::error::{CaptureError, DeviceError, StorageError, TakeError};
pub use models::mode::{CaptureKind, Mode};
pub use models::resolution::{AspectRatioKey, Resolution};
pub use models::state::SessionState;
pub use models::take_result::{SavedFile, TakeMetadata, TakeOutcome, TakeResult};
pub use preference::ConstraintsPreferrer;
pub use session::controller::{CaptureSessionController, SessionCollaborators};
pub use storage::directory_sink::DirectoryResultSink;
pub use storage::json_file::JsonFilePreferenceStore;
pub use storage::memory::MemoryPreferenceStore;
pub use timer::{Cancelled, TimerTick};
pub use traits::capability_query::{CapabilityQuery, ReprocessEffect};
pub use traits::cue_player::{Cue, CuePlayer};
pub use traits::device_layer::{ChunkSender, DeviceLayer, ImageCapture, MediaStream, Recorder};
pub use traits::display::{DisplayInfo, FixedDisplay};
pub use traits::preference_store::{PreferenceMap, PreferenceStore};
pub use traits::result_sink::{ResultSink, VideoSaver};
pub use traits::session_delegate::SessionDelegate;
