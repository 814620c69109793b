//! In-memory collaborators for unit tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::models::capability::{Facing, FpsRange, VideoConfig};
use crate::models::constraints::{
    FrameRate, MediaSettingsRange, PhotoCapabilities, PhotoSettings, StreamConstraints, TrackSettings,
};
use crate::models::error::{CaptureError, DeviceError, StorageError, TakeError};
use crate::models::resolution::Resolution;
use crate::models::state::SessionState;
use crate::models::take_result::{SavedFile, TakeMetadata, TakeResult};
use crate::traits::capability_query::{CapabilityQuery, ReprocessEffect};
use crate::traits::cue_player::{Cue, CuePlayer};
use crate::traits::device_layer::{ChunkSender, DeviceLayer, ImageCapture, MediaStream, Recorder};
use crate::traits::result_sink::{ResultSink, VideoSaver};
use crate::traits::session_delegate::SessionDelegate;

pub const MKV: &str = "video/x-matroska;codecs=avc1";

/// A recorder that emits `chunks` as soon as it starts.
#[derive(Default)]
pub struct FakeRecorder {
    pub chunks: Vec<Vec<u8>>,
    pub starts: AtomicUsize,
    sender: Mutex<Option<ChunkSender>>,
}

impl FakeRecorder {
    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            ..Default::default()
        }
    }
}

impl Recorder for FakeRecorder {
    fn start(&self, chunks: ChunkSender) -> Result<(), DeviceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        for chunk in &self.chunks {
            let _ = chunks.send(chunk.clone());
        }
        *self.sender.lock() = Some(chunks);
        Ok(())
    }

    fn stop(&self) {
        self.sender.lock().take();
    }
}

pub struct FakeImageCapture {
    pub blob: Vec<u8>,
    pub max: Resolution,
    pub fail_capabilities: bool,
    pub requested: Mutex<Vec<PhotoSettings>>,
    /// Reprocess requests waiting for the next photo.
    pub reprocess: Mutex<Vec<tokio::sync::oneshot::Sender<Vec<u8>>>>,
}

impl FakeImageCapture {
    pub fn new(blob: Vec<u8>) -> Self {
        Self {
            blob,
            max: Resolution::new(4032, 3024),
            fail_capabilities: false,
            requested: Mutex::new(Vec::new()),
            reprocess: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageCapture for FakeImageCapture {
    async fn photo_capabilities(&self) -> Result<PhotoCapabilities, DeviceError> {
        if self.fail_capabilities {
            return Err(DeviceError::Other("capabilities unavailable".into()));
        }
        Ok(PhotoCapabilities {
            image_width: MediaSettingsRange { min: 1.0, max: self.max.width as f64, step: 1.0 },
            image_height: MediaSettingsRange { min: 1.0, max: self.max.height as f64, step: 1.0 },
        })
    }

    async fn take_photo(&self, settings: PhotoSettings) -> Result<Vec<u8>, DeviceError> {
        self.requested.lock().push(settings);
        for waiter in self.reprocess.lock().drain(..) {
            let _ = waiter.send(b"effect".to_vec());
        }
        Ok(self.blob.clone())
    }
}

pub struct FakeStream {
    pub settings: TrackSettings,
    pub live: AtomicBool,
    pub stopped: AtomicBool,
    pub recorder: Arc<FakeRecorder>,
    pub image_capture: Arc<FakeImageCapture>,
}

impl FakeStream {
    pub fn new(device_id: &str, resolution: Resolution, fps: Option<f64>) -> Self {
        Self {
            settings: TrackSettings {
                device_id: device_id.to_string(),
                width: resolution.width,
                height: resolution.height,
                frame_rate: fps,
            },
            live: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            recorder: Arc::new(FakeRecorder::default()),
            image_capture: Arc::new(FakeImageCapture::new(b"photo".to_vec())),
        }
    }

    pub fn with_recorder(mut self, recorder: FakeRecorder) -> Self {
        self.recorder = Arc::new(recorder);
        self
    }

    pub fn with_image_capture(mut self, capture: FakeImageCapture) -> Self {
        self.image_capture = Arc::new(capture);
        self
    }
}

impl MediaStream for FakeStream {
    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst) && !self.stopped.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn create_recorder(&self, _mime_type: &str) -> Result<Arc<dyn Recorder>, DeviceError> {
        Ok(self.recorder.clone())
    }

    fn create_image_capture(&self) -> Result<Arc<dyn ImageCapture>, DeviceError> {
        Ok(self.image_capture.clone())
    }
}

/// Device layer whose devices all support the same `(width, height, max_fps)` modes.
pub struct FakeDeviceLayer {
    pub devices: Vec<String>,
    pub modes: Mutex<Vec<(u32, u32, u32)>>,
    pub mime_types: Vec<String>,
    pub attempts: Mutex<Vec<StreamConstraints>>,
    pub streams: Mutex<Vec<Arc<FakeStream>>>,
    pub acquire_delay: std::time::Duration,
}

impl FakeDeviceLayer {
    pub fn new(devices: &[&str], modes: &[(u32, u32, u32)]) -> Self {
        Self {
            devices: devices.iter().map(|d| d.to_string()).collect(),
            modes: Mutex::new(modes.to_vec()),
            mime_types: vec![MKV.to_string()],
            attempts: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
            acquire_delay: std::time::Duration::ZERO,
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }

    pub fn last_stream(&self) -> Option<Arc<FakeStream>> {
        self.streams.lock().last().cloned()
    }
}

#[async_trait]
impl DeviceLayer for FakeDeviceLayer {
    async fn enumerate_devices(&self) -> Result<Vec<String>, DeviceError> {
        Ok(self.devices.clone())
    }

    async fn acquire_stream(&self, constraints: &StreamConstraints) -> Result<Arc<dyn MediaStream>, DeviceError> {
        self.attempts.lock().push(constraints.clone());
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }
        let modes = self.modes.lock().clone();
        let found = modes.iter().find(|&&(w, h, max)| {
            constraints.accepts(Resolution::new(w, h)) && constraints.frame_rate.accepts_max(max)
        });
        let Some(&(w, h, max)) = found else {
            return Err(DeviceError::NotSatisfiable(constraints.to_string()));
        };
        let fps = match constraints.frame_rate {
            FrameRate::Exact(fps) => fps,
            _ => max.min(30),
        };
        let stream = Arc::new(FakeStream::new(&constraints.device_id, Resolution::new(w, h), Some(fps as f64)));
        self.streams.lock().push(Arc::clone(&stream));
        Ok(stream)
    }

    fn is_recording_type_supported(&self, mime_type: &str) -> bool {
        self.mime_types.iter().any(|m| m == mime_type)
    }
}

/// Capability query answering the same facts for every device.
pub struct FakeCapabilityQuery {
    pub photo: Vec<Resolution>,
    pub video: Vec<VideoConfig>,
    pub fps_ranges: Vec<FpsRange>,
    pub fps_requests: Mutex<Vec<(String, FpsRange)>>,
    pub fail_fps: bool,
    pub portrait: bool,
}

impl FakeCapabilityQuery {
    pub fn new(photo: &[(u32, u32)], video: &[(u32, u32, u32)]) -> Self {
        Self {
            photo: photo.iter().map(|&(w, h)| Resolution::new(w, h)).collect(),
            video: video.iter().map(|&(w, h, f)| VideoConfig::new(w, h, f)).collect(),
            fps_ranges: Vec::new(),
            fps_requests: Mutex::new(Vec::new()),
            fail_fps: false,
            portrait: true,
        }
    }
}

#[async_trait]
impl CapabilityQuery for FakeCapabilityQuery {
    async fn camera_facing(&self, _device_id: &str) -> Result<Facing, DeviceError> {
        Ok(Facing::Back)
    }

    async fn photo_resolutions(&self, _device_id: &str) -> Result<Vec<Resolution>, DeviceError> {
        Ok(self.photo.clone())
    }

    async fn video_configs(&self, _device_id: &str) -> Result<Vec<VideoConfig>, DeviceError> {
        Ok(self.video.clone())
    }

    async fn supported_fps_ranges(&self, _device_id: &str) -> Result<Vec<FpsRange>, DeviceError> {
        Ok(self.fps_ranges.clone())
    }

    async fn set_fps_range(&self, device_id: &str, range: FpsRange) -> Result<(), DeviceError> {
        self.fps_requests.lock().push((device_id.to_string(), range));
        if self.fail_fps {
            return Err(DeviceError::Other("fps range rejected".into()));
        }
        Ok(())
    }

    async fn is_portrait_mode_supported(&self, _device_id: &str) -> Result<bool, DeviceError> {
        Ok(self.portrait)
    }

    async fn set_reprocess_option(&self, _device_id: &str, _effect: ReprocessEffect) -> Result<Vec<u8>, DeviceError> {
        Err(DeviceError::Unavailable)
    }
}

/// Result sink keeping everything in memory.
#[derive(Default)]
pub struct MemorySink {
    pub photos: Mutex<Vec<(Vec<u8>, TakeMetadata)>>,
    pub videos: Arc<Mutex<Vec<(Vec<u8>, TakeMetadata)>>>,
    pub cancelled_videos: Arc<AtomicUsize>,
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn save_photo(&self, blob: Vec<u8>, metadata: &TakeMetadata) -> Result<SavedFile, StorageError> {
        let file = saved(&blob, metadata);
        self.photos.lock().push((blob, metadata.clone()));
        Ok(file)
    }

    async fn start_save_video(&self, metadata: &TakeMetadata) -> Result<Box<dyn VideoSaver>, StorageError> {
        Ok(Box::new(MemoryVideoSaver {
            data: Vec::new(),
            metadata: metadata.clone(),
            videos: Arc::clone(&self.videos),
            cancelled: Arc::clone(&self.cancelled_videos),
        }))
    }
}

struct MemoryVideoSaver {
    data: Vec<u8>,
    metadata: TakeMetadata,
    videos: Arc<Mutex<Vec<(Vec<u8>, TakeMetadata)>>>,
    cancelled: Arc<AtomicUsize>,
}

#[async_trait]
impl VideoSaver for MemoryVideoSaver {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    async fn end_write(self: Box<Self>) -> Result<SavedFile, StorageError> {
        let this = *self;
        let file = saved(&this.data, &this.metadata);
        this.videos.lock().push((this.data, this.metadata));
        Ok(file)
    }

    async fn cancel(self: Box<Self>) -> Result<(), StorageError> {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn saved(blob: &[u8], metadata: &TakeMetadata) -> SavedFile {
    SavedFile {
        path: PathBuf::from(format!("{}.bin", metadata.id)),
        size_bytes: blob.len() as u64,
        checksum: String::new(),
    }
}

#[derive(Default)]
pub struct RecordingCues(pub Mutex<Vec<Cue>>);

#[async_trait]
impl CuePlayer for RecordingCues {
    async fn play(&self, cue: Cue) {
        self.0.lock().push(cue);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    State(SessionState),
    Error(CaptureError),
    Taking(bool),
    Finished(TakeResult),
    TakeError(TakeError),
    Tick(u32),
}

#[derive(Default)]
pub struct RecordingDelegate(pub Mutex<Vec<Event>>);

impl RecordingDelegate {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn errors(&self) -> usize {
        self.0.lock().iter().filter(|e| matches!(e, Event::Error(_))).count()
    }
}

impl SessionDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: &SessionState) {
        self.0.lock().push(Event::State(state.clone()));
    }

    fn on_error(&self, error: &CaptureError) {
        self.0.lock().push(Event::Error(error.clone()));
    }

    fn on_taking_changed(&self, taking: bool) {
        self.0.lock().push(Event::Taking(taking));
    }

    fn on_take_finished(&self, result: &TakeResult) {
        self.0.lock().push(Event::Finished(result.clone()));
    }

    fn on_take_error(&self, error: &TakeError) {
        self.0.lock().push(Event::TakeError(error.clone()));
    }

    fn on_countdown_tick(&self, remaining: u32) {
        self.0.lock().push(Event::Tick(remaining));
    }
}
