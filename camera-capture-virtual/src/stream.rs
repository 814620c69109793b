use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use camera_capture_core::models::constraints::TrackSettings;
use camera_capture_core::models::error::DeviceError;
use camera_capture_core::models::resolution::Resolution;
use camera_capture_core::traits::device_layer::{ChunkSender, ImageCapture, MediaStream, Recorder};

use crate::camera::Registry;
use crate::image_capture::VirtualImageCapture;

/// A stream on a virtual camera. Live until stopped or unplugged.
pub struct VirtualStream {
    settings: TrackSettings,
    live: Arc<AtomicBool>,
    max_photo: Resolution,
    registry: Arc<Registry>,
    recording_types: Vec<String>,
    chunk_interval: Duration,
}

impl VirtualStream {
    pub(crate) fn new(
        settings: TrackSettings,
        live: Arc<AtomicBool>,
        max_photo: Resolution,
        registry: Arc<Registry>,
        recording_types: Vec<String>,
        chunk_interval: Duration,
    ) -> Self {
        Self {
            settings,
            live,
            max_photo,
            registry,
            recording_types,
            chunk_interval,
        }
    }
}

impl MediaStream for VirtualStream {
    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            log::debug!("Virtual stream on {} stopped", self.settings.device_id);
        }
    }

    fn create_recorder(&self, mime_type: &str) -> Result<Arc<dyn Recorder>, DeviceError> {
        if !self.recording_types.iter().any(|t| t == mime_type) {
            return Err(DeviceError::NotSatisfiable(format!("cannot record {}", mime_type)));
        }
        Ok(Arc::new(VirtualRecorder {
            live: Arc::clone(&self.live),
            interval: self.chunk_interval,
            frame: self.settings.resolution(),
            stop: Mutex::new(None),
        }))
    }

    fn create_image_capture(&self) -> Result<Arc<dyn ImageCapture>, DeviceError> {
        if !self.is_live() {
            return Err(DeviceError::Unavailable);
        }
        Ok(Arc::new(VirtualImageCapture::new(
            self.settings.device_id.clone(),
            self.settings.resolution(),
            self.max_photo,
            Arc::clone(&self.registry),
        )))
    }
}

/// Emits one synthetic chunk per interval while its stream is live.
pub struct VirtualRecorder {
    live: Arc<AtomicBool>,
    interval: Duration,
    frame: Resolution,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl Recorder for VirtualRecorder {
    fn start(&self, chunks: ChunkSender) -> Result<(), DeviceError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| DeviceError::Other(e.to_string()))?;
        let mut slot = self.stop.lock();
        if slot.is_some() {
            return Err(DeviceError::Other("recorder already started".into()));
        }
        if !self.live.load(Ordering::SeqCst) {
            return Err(DeviceError::Unavailable);
        }
        let (stop_tx, stop_rx) = oneshot::channel();
        *slot = Some(stop_tx);
        runtime.spawn(pump(Arc::clone(&self.live), self.interval, self.frame, chunks, stop_rx));
        Ok(())
    }

    fn stop(&self) {
        if let Some(stop) = self.stop.lock().take() {
            let _ = stop.send(());
        }
    }
}

/// Chunk `sequence` of a recording: a small header followed by filler.
fn chunk(frame: Resolution, sequence: u32) -> Vec<u8> {
    let mut data = format!("VCAM {}x{} #{:06}\n", frame.width, frame.height, sequence).into_bytes();
    data.resize(data.len() + 256, (sequence % 251) as u8);
    data
}

async fn pump(
    live: Arc<AtomicBool>,
    period: Duration,
    frame: Resolution,
    chunks: ChunkSender,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately.
    ticker.tick().await;
    let mut sequence = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => {
                // Flush what was buffered since the last chunk.
                if live.load(Ordering::SeqCst) {
                    let _ = chunks.send(chunk(frame, sequence));
                }
                break;
            }
            _ = ticker.tick() => {
                if !live.load(Ordering::SeqCst) {
                    log::warn!("Virtual recorder lost its stream after {} chunks", sequence);
                    break;
                }
                if chunks.send(chunk(frame, sequence)).is_err() {
                    break;
                }
                sequence += 1;
            }
        }
    }
}
