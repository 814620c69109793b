//! Takes on a live stream.
//!
//! A [`ModeController`] is created by the session for every stream it
//! settles on. It runs at most one take at a time:
//!
//! ```text
//! start_capture ─▶ countdown ─▶ record / snap ─▶ finalize ─▶ result sink
//!                      │              │
//! stop_capture ────────┴──────────────┘ (cancel countdown, stop recorder)
//! ```
//!
//! Square and portrait takes reuse the photo pipeline (`photo.rs`) and add a
//! processing step on top.

mod photo;
mod portrait;
mod square;
mod video;

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::models::config::Countdown;
use crate::models::error::TakeError;
use crate::models::mode::Mode;
use crate::models::resolution::Resolution;
use crate::models::take_result::TakeOutcome;
use crate::timer::TimerTick;
use crate::traits::capability_query::CapabilityQuery;
use crate::traits::cue_player::{Cue, CuePlayer};
use crate::traits::device_layer::{DeviceLayer, ImageCapture, MediaStream, Recorder};
use crate::traits::result_sink::ResultSink;
use crate::traits::session_delegate::SessionDelegate;

/// Resolves once the take it belongs to has finished. Cloneable.
pub type TakeHandle = Shared<BoxFuture<'static, Result<TakeOutcome, TakeError>>>;

/// Everything a mode controller needs from the session that created it.
#[derive(Clone)]
pub struct ModeContext {
    pub mode: Mode,
    pub device_id: String,
    pub stream: Arc<dyn MediaStream>,
    pub device_layer: Arc<dyn DeviceLayer>,
    pub capability_query: Option<Arc<dyn CapabilityQuery>>,
    pub sink: Arc<dyn ResultSink>,
    pub cues: Option<Arc<dyn CuePlayer>>,
    pub delegate: Option<Arc<dyn SessionDelegate>>,
    pub timer: Arc<TimerTick>,
    pub recording_mime_types: Vec<String>,
    /// Capture resolution negotiated for this stream, when known.
    pub capture_resolution: Option<Resolution>,
}

struct ActiveTake {
    id: u64,
    handle: TakeHandle,
    cancel: watch::Sender<bool>,
}

struct Inner {
    ctx: ModeContext,
    countdown: Mutex<Countdown>,
    take: Mutex<Option<ActiveTake>>,
    next_take_id: Mutex<u64>,
    recorder: Mutex<Option<Arc<dyn Recorder>>>,
    image_capture: Mutex<Option<Arc<dyn ImageCapture>>>,
}

/// Runs takes for one mode on one stream.
pub struct ModeController {
    inner: Arc<Inner>,
}

impl ModeController {
    pub fn new(ctx: ModeContext, countdown: Countdown) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                countdown: Mutex::new(countdown),
                take: Mutex::new(None),
                next_take_id: Mutex::new(0),
                recorder: Mutex::new(None),
                image_capture: Mutex::new(None),
            }),
        }
    }

    pub fn mode(&self) -> Mode {
        self.inner.ctx.mode
    }

    pub fn device_id(&self) -> &str {
        &self.inner.ctx.device_id
    }

    pub fn set_countdown(&self, countdown: Countdown) {
        *self.inner.countdown.lock() = countdown;
    }

    pub fn is_taking(&self) -> bool {
        self.inner.take.lock().is_some()
    }

    /// Start a take, or join the one already in flight.
    pub fn start_capture(&self) -> TakeHandle {
        let mut slot = self.inner.take.lock();
        if let Some(active) = slot.as_ref() {
            log::debug!("Take already in flight, joining it");
            return active.handle.clone();
        }

        let id = {
            let mut next = self.inner.next_take_id.lock();
            *next += 1;
            *next
        };
        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(run_take(Arc::clone(&self.inner), id, cancelled));
        let handle = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(TakeError::CaptureFailed(format!("take task failed: {}", e))),
            }
        }
        .boxed()
        .shared();

        *slot = Some(ActiveTake {
            id,
            handle: handle.clone(),
            cancel,
        });
        handle
    }

    /// Stop the take in flight and wait for its outcome.
    ///
    /// Cancels a running countdown and stops a recording. A photo already
    /// being taken is awaited and discarded. With no take in flight this
    /// resolves to [`TakeOutcome::Cancelled`].
    pub async fn stop_capture(&self) -> Result<TakeOutcome, TakeError> {
        let handle = {
            let slot = self.inner.take.lock();
            let Some(active) = slot.as_ref() else {
                return Ok(TakeOutcome::Cancelled);
            };
            active.cancel.send_replace(true);
            active.handle.clone()
        };
        self.inner.ctx.timer.cancel();
        handle.await
    }
}

async fn run_take(inner: Arc<Inner>, id: u64, mut cancelled: watch::Receiver<bool>) -> Result<TakeOutcome, TakeError> {
    let delegate = inner.ctx.delegate.clone();
    if let Some(d) = &delegate {
        d.on_taking_changed(true);
    }

    let outcome = inner.run(&mut cancelled).await;
    match &outcome {
        Ok(TakeOutcome::Saved(result)) => {
            log::info!("{} take saved", inner.ctx.mode);
            if let Some(d) = &delegate {
                d.on_take_finished(result);
            }
        }
        Ok(TakeOutcome::Cancelled) => log::info!("{} take cancelled", inner.ctx.mode),
        Err(e) => {
            log::warn!("{} take failed: {}", inner.ctx.mode, e);
            if let Some(d) = &delegate {
                d.on_take_error(e);
            }
        }
    }

    {
        let mut slot = inner.take.lock();
        if slot.as_ref().is_some_and(|active| active.id == id) {
            *slot = None;
        }
    }
    if let Some(d) = &delegate {
        d.on_taking_changed(false);
    }
    outcome
}

impl Inner {
    async fn run(&self, cancelled: &mut watch::Receiver<bool>) -> Result<TakeOutcome, TakeError> {
        let countdown = *self.countdown.lock();
        if countdown != Countdown::Off {
            let delegate = self.ctx.delegate.clone();
            let ticking = self.ctx.timer.start(countdown, move |remaining| {
                if let Some(d) = &delegate {
                    d.on_countdown_tick(remaining);
                }
            });
            let finished = tokio::select! {
                biased;
                result = ticking => result.is_ok(),
                _ = wait_cancelled(cancelled) => false,
            };
            if !finished {
                return Ok(TakeOutcome::Cancelled);
            }
        }
        if *cancelled.borrow() {
            return Ok(TakeOutcome::Cancelled);
        }

        match self.ctx.mode {
            Mode::Video => video::record(self, cancelled).await,
            Mode::Photo => photo::run(self, cancelled).await,
            Mode::Square => square::run(self, cancelled).await,
            Mode::Portrait => portrait::run(self, cancelled).await,
        }
    }

    /// Recorder for the first supported MIME type, created on first use.
    fn recorder(&self) -> Result<Arc<dyn Recorder>, TakeError> {
        let mut slot = self.recorder.lock();
        if let Some(recorder) = slot.as_ref() {
            return Ok(Arc::clone(recorder));
        }
        let mime_type = self
            .ctx
            .recording_mime_types
            .iter()
            .find(|mime| self.ctx.device_layer.is_recording_type_supported(mime))
            .ok_or_else(|| TakeError::UnsupportedFormat(self.ctx.recording_mime_types.join(", ")))?;
        log::debug!("Recording as {}", mime_type);

        let recorder = self
            .ctx
            .stream
            .create_recorder(mime_type)
            .map_err(|e| TakeError::CaptureFailed(e.to_string()))?;
        *slot = Some(Arc::clone(&recorder));
        Ok(recorder)
    }

    fn image_capture(&self) -> Result<Arc<dyn ImageCapture>, TakeError> {
        let mut slot = self.image_capture.lock();
        if let Some(capture) = slot.as_ref() {
            return Ok(Arc::clone(capture));
        }
        let capture = self
            .ctx
            .stream
            .create_image_capture()
            .map_err(|e| TakeError::CaptureFailed(e.to_string()))?;
        *slot = Some(Arc::clone(&capture));
        Ok(capture)
    }

    /// Play `cue` without waiting for it.
    fn play_detached(&self, cue: Cue) {
        if let Some(cues) = self.ctx.cues.clone() {
            tokio::spawn(async move { cues.play(cue).await });
        }
    }
}

/// Resolves once the take is cancelled. Never resolves if the sender is gone.
async fn wait_cancelled(cancelled: &mut watch::Receiver<bool>) {
    if cancelled.wait_for(|c| *c).await.is_err() {
        futures::future::pending::<()>().await;
    }
}
