use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::mode::{ModeContext, ModeController, TakeHandle};
use crate::models::capability::FpsRange;
use crate::models::config::{Countdown, SessionConfiguration};
use crate::models::constraints::StreamConstraints;
use crate::models::error::{CaptureError, DeviceError, TakeError};
use crate::models::mode::{CaptureKind, Mode};
use crate::models::resolution::Resolution;
use crate::models::state::SessionState;
use crate::models::take_result::TakeOutcome;
use crate::preference::ConstraintsPreferrer;
use crate::session::device_info;
use crate::timer::TimerTick;
use crate::traits::capability_query::CapabilityQuery;
use crate::traits::cue_player::CuePlayer;
use crate::traits::device_layer::{DeviceLayer, MediaStream};
use crate::traits::result_sink::ResultSink;
use crate::traits::session_delegate::SessionDelegate;

/// Collaborators injected into a session.
pub struct SessionCollaborators {
    pub device_layer: Arc<dyn DeviceLayer>,
    /// Without a capability query every device is negotiated with coarse defaults.
    pub capability_query: Option<Arc<dyn CapabilityQuery>>,
    pub photo_preferences: Arc<ConstraintsPreferrer>,
    pub video_preferences: Arc<ConstraintsPreferrer>,
    pub sink: Arc<dyn ResultSink>,
    pub cues: Option<Arc<dyn CuePlayer>>,
}

/// Mutable session bookkeeping, protected by `parking_lot::Mutex`.
struct Session {
    state: SessionState,
    mode: Mode,
    countdown: Countdown,
    locked: bool,
    /// Bumped by every stop. Work started under an older generation is discarded.
    generation: u64,
    devices: Vec<String>,
    preferred_device: Option<String>,
    stream: Option<Arc<dyn MediaStream>>,
    mode_controller: Option<Arc<ModeController>>,
    retry: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
}

struct Inner {
    collaborators: SessionCollaborators,
    /// Held across every start, stop and restart so they never interleave.
    ops: tokio::sync::Mutex<()>,
    config: SessionConfiguration,
    timer: Arc<TimerTick>,
    delegate: Mutex<Option<Arc<dyn SessionDelegate>>>,
    session: Mutex<Session>,
}

/// One stream request tried against the device layer.
struct Attempt {
    constraints: StreamConstraints,
    /// Set for candidates from the preference engine, `None` for coarse defaults.
    capture_resolution: Option<Resolution>,
}

enum Gate {
    Proceed,
    Locked,
    Stale,
}

/// Acquires a camera stream and runs takes on it.
///
/// State transitions:
/// ```text
/// idle ──start──▶ acquiring ──stream──▶ capturing
///  ▲                 │ exhausted / locked    │ stop, stream ended
///  └── retry timer ◀─┘                       ▼
///  └──────────────────────────────────── stopping
/// ```
///
/// Candidates are tried strictly in order: the preference engine's
/// candidates for devices it has capabilities for, coarse defaults for the
/// rest. When every candidate fails the delegate is told
/// [`CaptureError::NoCamera`] and `start` is retried after the configured
/// retry interval, until it succeeds or the session is stopped.
pub struct CaptureSessionController {
    inner: Arc<Inner>,
}

impl CaptureSessionController {
    pub fn new(collaborators: SessionCollaborators, config: SessionConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        if collaborators.photo_preferences.kind() != CaptureKind::Photo {
            return Err(CaptureError::ConfigurationFailed(
                "photo preferences must be a photo engine".into(),
            ));
        }
        if collaborators.video_preferences.kind() != CaptureKind::Video {
            return Err(CaptureError::ConfigurationFailed(
                "video preferences must be a video engine".into(),
            ));
        }

        let timer = Arc::new(TimerTick::new(collaborators.cues.clone(), config.tick_interval));
        let session = Session {
            state: SessionState::Idle,
            mode: config.initial_mode,
            countdown: config.countdown,
            locked: false,
            generation: 0,
            devices: Vec::new(),
            preferred_device: None,
            stream: None,
            mode_controller: None,
            retry: None,
            watchdog: None,
        };
        let inner = Arc::new(Inner {
            collaborators,
            ops: tokio::sync::Mutex::new(()),
            config,
            timer,
            delegate: Mutex::new(None),
            session: Mutex::new(session),
        });

        for engine in [&inner.collaborators.photo_preferences, &inner.collaborators.video_preferences] {
            let weak = Arc::downgrade(&inner);
            engine.set_reconfigure_handler(Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    spawn_restart(inner);
                }
            }));
        }

        Ok(Self { inner })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.inner.delegate.lock() = Some(delegate);
    }

    pub fn state(&self) -> SessionState {
        self.inner.session.lock().state.clone()
    }

    pub fn mode(&self) -> Mode {
        self.inner.session.lock().mode
    }

    pub fn countdown(&self) -> Countdown {
        self.inner.session.lock().countdown
    }

    /// Countdown used by the next take.
    pub fn set_countdown(&self, countdown: Countdown) {
        let controller = {
            let mut s = self.inner.session.lock();
            s.countdown = countdown;
            s.mode_controller.clone()
        };
        if let Some(controller) = controller {
            controller.set_countdown(countdown);
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.session.lock().locked
    }

    /// While locked, `start` defers itself instead of acquiring a stream.
    pub fn set_locked(&self, locked: bool) {
        self.inner.session.lock().locked = locked;
        log::debug!("Session {}", if locked { "locked" } else { "unlocked" });
    }

    pub fn is_taking(&self) -> bool {
        self.inner
            .session
            .lock()
            .mode_controller
            .as_ref()
            .is_some_and(|c| c.is_taking())
    }

    pub fn has_pending_retry(&self) -> bool {
        self.inner
            .session
            .lock()
            .retry
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Devices seen by the last enumeration, in platform order.
    pub fn devices(&self) -> Vec<String> {
        self.inner.session.lock().devices.clone()
    }

    pub async fn start(&self) {
        let _ops = self.inner.ops.lock().await;
        self.inner.start_locked().await;
    }

    /// A start still acquiring is abandoned and releases whatever it acquires.
    pub async fn stop(&self) {
        self.inner.stop().await;
    }

    /// Stop and renegotiate, picking up changed preferences.
    pub async fn restart(&self) {
        self.inner.restart().await;
    }

    /// Fails with [`CaptureError::InvalidState`] when switching to portrait
    /// on a device known not to support it. The session is left untouched.
    pub async fn switch_mode(&self, mode: Mode) -> Result<(), CaptureError> {
        let _ops = self.inner.ops.lock().await;
        if mode == Mode::Portrait {
            self.inner.check_portrait_support()?;
        }
        self.inner.stop_locked().await;
        self.inner.session.lock().mode = mode;
        log::info!("Switched to {} mode", mode);
        self.inner.start_locked().await;
        Ok(())
    }

    /// Restart on the device after the current one.
    pub async fn switch_device(&self) {
        let _ops = self.inner.ops.lock().await;
        {
            let mut s = self.inner.session.lock();
            let current = s.state.device_id().map(str::to_string).or_else(|| s.preferred_device.clone());
            if let Some(next) = next_device(&s.devices, current.as_deref()) {
                log::info!("Switching to device {}", next);
                s.preferred_device = Some(next);
            }
        }
        self.inner.stop_locked().await;
        self.inner.start_locked().await;
    }

    /// Start a take on the current stream, or join the one in flight.
    pub fn start_take(&self) -> Result<TakeHandle, TakeError> {
        let controller = self
            .inner
            .session
            .lock()
            .mode_controller
            .clone()
            .ok_or(TakeError::NoStream)?;
        Ok(controller.start_capture())
    }

    /// Stop the take in flight and wait for its outcome.
    pub async fn stop_take(&self) -> Result<TakeOutcome, TakeError> {
        let controller = self
            .inner
            .session
            .lock()
            .mode_controller
            .clone()
            .ok_or(TakeError::NoStream)?;
        controller.stop_capture().await
    }
}

impl Drop for CaptureSessionController {
    fn drop(&mut self) {
        let mut s = self.inner.session.lock();
        if let Some(retry) = s.retry.take() {
            retry.abort();
        }
        if let Some(watchdog) = s.watchdog.take() {
            watchdog.abort();
        }
        if let Some(stream) = s.stream.take() {
            stream.stop();
        }
    }
}

impl Inner {
    fn delegate(&self) -> Option<Arc<dyn SessionDelegate>> {
        self.delegate.lock().clone()
    }

    fn emit_state(&self, state: &SessionState) {
        log::debug!("Session state: {:?}", state);
        if let Some(d) = self.delegate() {
            d.on_state_changed(state);
        }
    }

    fn engine(&self, kind: CaptureKind) -> &Arc<ConstraintsPreferrer> {
        match kind {
            CaptureKind::Photo => &self.collaborators.photo_preferences,
            CaptureKind::Video => &self.collaborators.video_preferences,
        }
    }

    fn gate(&self, generation: u64) -> Gate {
        let s = self.session.lock();
        if s.generation != generation {
            Gate::Stale
        } else if s.locked {
            Gate::Locked
        } else {
            Gate::Proceed
        }
    }

    /// Portrait needs the current, or else the preferred, device to support it.
    /// Devices without known capabilities are let through.
    fn check_portrait_support(&self) -> Result<(), CaptureError> {
        let device = {
            let s = self.session.lock();
            s.state.device_id().map(str::to_string).or_else(|| s.preferred_device.clone())
        };
        let Some(device) = device else {
            return Ok(());
        };
        match self.collaborators.photo_preferences.capability(&device) {
            Some(capability) if !capability.portrait_mode_supported => Err(CaptureError::InvalidState(format!(
                "portrait mode is not supported on {}",
                device
            ))),
            _ => Ok(()),
        }
    }

    async fn stop(&self) {
        // Make a start in flight stale before queueing behind it.
        self.session.lock().generation += 1;
        let _ops = self.ops.lock().await;
        self.stop_locked().await;
    }

    async fn restart(self: &Arc<Self>) {
        let _ops = self.ops.lock().await;
        self.stop_locked().await;
        self.start_locked().await;
    }

    /// A stop arrived while starting: drop back to idle and leave the rest to it.
    fn abandon(&self) {
        {
            let mut s = self.session.lock();
            if s.state != SessionState::Acquiring {
                return;
            }
            s.state = SessionState::Idle;
        }
        log::debug!("Start abandoned for a pending stop");
        self.emit_state(&SessionState::Idle);
    }

    async fn start_locked(self: &Arc<Self>) {
        let (generation, mode) = {
            let mut s = self.session.lock();
            if !s.state.is_idle() {
                log::debug!("start ignored in state {:?}", s.state);
                return;
            }
            if let Some(retry) = s.retry.take() {
                retry.abort();
            }
            s.state = SessionState::Acquiring;
            (s.generation, s.mode)
        };
        self.emit_state(&SessionState::Acquiring);

        let devices = match self.collaborators.device_layer.enumerate_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                log::warn!("Failed to enumerate devices: {}", e);
                Vec::new()
            }
        };
        if let Some(query) = &self.collaborators.capability_query {
            let capabilities = device_info::collect(query.as_ref(), &devices).await;
            self.collaborators.photo_preferences.update_devices_info(&capabilities);
            self.collaborators.video_preferences.update_devices_info(&capabilities);
        }

        let ordered = {
            let mut s = self.session.lock();
            (s.generation == generation).then(|| {
                s.devices = devices.clone();
                order_devices(devices, s.preferred_device.as_deref())
            })
        };
        let Some(ordered) = ordered else {
            self.abandon();
            return;
        };

        let engine = Arc::clone(self.engine(mode.capture_kind()));
        for device_id in &ordered {
            for attempt in attempts_for(&engine, mode, device_id) {
                match self.gate(generation) {
                    Gate::Proceed => {}
                    Gate::Stale => {
                        self.abandon();
                        return;
                    }
                    Gate::Locked => {
                        self.defer(generation);
                        return;
                    }
                }
                match self.acquire(&attempt).await {
                    Ok(stream) => {
                        self.settle(generation, mode, &engine, attempt, stream);
                        return;
                    }
                    Err(e) if e.is_not_satisfiable() => log::debug!("{}: {}", attempt.constraints, e),
                    Err(e) => log::warn!("{}: {}", attempt.constraints, e),
                }
            }
        }

        self.exhausted(generation);
    }

    async fn acquire(&self, attempt: &Attempt) -> Result<Arc<dyn MediaStream>, DeviceError> {
        let constraints = &attempt.constraints;
        if let (Some(fps), Some(query)) = (constraints.frame_rate.exact(), &self.collaborators.capability_query) {
            query.set_fps_range(&constraints.device_id, FpsRange::fixed(fps)).await?;
        }
        log::debug!("Trying {}", constraints);
        self.collaborators.device_layer.acquire_stream(constraints).await
    }

    /// Install a freshly acquired stream, unless the session was stopped meanwhile.
    fn settle(
        self: &Arc<Self>,
        generation: u64,
        mode: Mode,
        engine: &ConstraintsPreferrer,
        attempt: Attempt,
        stream: Arc<dyn MediaStream>,
    ) {
        let device_id = attempt.constraints.device_id.clone();
        let settings = stream.settings();
        let context = ModeContext {
            mode,
            device_id: device_id.clone(),
            stream: Arc::clone(&stream),
            device_layer: Arc::clone(&self.collaborators.device_layer),
            capability_query: self.collaborators.capability_query.clone(),
            sink: Arc::clone(&self.collaborators.sink),
            cues: self.collaborators.cues.clone(),
            delegate: self.delegate(),
            timer: Arc::clone(&self.timer),
            recording_mime_types: self.config.recording_mime_types.clone(),
            capture_resolution: attempt.capture_resolution,
        };

        let state = SessionState::Capturing {
            device_id: device_id.clone(),
        };
        let (replaced_stream, replaced_watchdog) = {
            let mut s = self.session.lock();
            if s.generation != generation {
                drop(s);
                log::debug!("Discarding stream on {} acquired after stop", device_id);
                stream.stop();
                self.abandon();
                return;
            }
            let replaced = (s.stream.take(), s.watchdog.take());
            s.mode_controller = Some(Arc::new(ModeController::new(context, s.countdown)));
            s.watchdog = Some(spawn_watchdog(self, generation, Arc::clone(&stream)));
            s.stream = Some(stream);
            s.state = state.clone();
            s.preferred_device = Some(device_id.clone());
            replaced
        };
        if let Some(watchdog) = replaced_watchdog {
            watchdog.abort();
        }
        if let Some(old) = replaced_stream {
            log::warn!("Releasing stream on {} still installed", old.settings().device_id);
            old.stop();
        }
        log::info!(
            "Capturing on {} at {}x{} for {} mode",
            device_id,
            settings.width,
            settings.height,
            mode
        );

        if let Some(resolution) = attempt.capture_resolution {
            let facing = engine.facing(&device_id);
            engine.update_values(&device_id, &settings, facing, resolution);
        }
        let (active, other) = match mode.capture_kind() {
            CaptureKind::Photo => (&self.collaborators.photo_preferences, &self.collaborators.video_preferences),
            CaptureKind::Video => (&self.collaborators.video_preferences, &self.collaborators.photo_preferences),
        };
        active.set_active_device(Some(device_id));
        other.set_active_device(None);

        self.emit_state(&state);
    }

    /// Locked: go back to idle and try the whole start again later.
    fn defer(self: &Arc<Self>, generation: u64) {
        {
            let mut s = self.session.lock();
            if s.generation != generation {
                drop(s);
                self.abandon();
                return;
            }
            s.state = SessionState::Idle;
            schedule_retry(self, &mut s, generation);
        }
        log::debug!("Session locked, deferring start");
        self.emit_state(&SessionState::Idle);
    }

    fn exhausted(self: &Arc<Self>, generation: u64) {
        {
            let mut s = self.session.lock();
            if s.generation != generation {
                drop(s);
                self.abandon();
                return;
            }
            s.state = SessionState::Idle;
            schedule_retry(self, &mut s, generation);
        }
        log::warn!(
            "No camera could be acquired, retrying in {:?}",
            self.config.retry_interval
        );
        self.emit_state(&SessionState::Idle);
        if let Some(d) = self.delegate() {
            d.on_error(&CaptureError::NoCamera);
        }
    }

    async fn stop_locked(&self) {
        let (generation, previous, stream, controller, retry, watchdog) = {
            let mut s = self.session.lock();
            s.generation += 1;
            let previous = s.state.clone();
            if !previous.is_idle() {
                s.state = SessionState::Stopping;
            }
            (
                s.generation,
                previous,
                s.stream.take(),
                s.mode_controller.take(),
                s.retry.take(),
                s.watchdog.take(),
            )
        };
        if let Some(retry) = retry {
            retry.abort();
        }
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        if previous.is_idle() {
            return;
        }
        self.emit_state(&SessionState::Stopping);

        if let Some(controller) = controller {
            if controller.is_taking() {
                match controller.stop_capture().await {
                    Ok(outcome) => log::debug!("Take ended by stop: cancelled={}", outcome.is_cancelled()),
                    Err(e) => log::debug!("Take ended by stop with error: {}", e),
                }
            }
        }
        self.collaborators.photo_preferences.set_active_device(None);
        self.collaborators.video_preferences.set_active_device(None);
        if let Some(stream) = stream {
            stream.stop();
        }

        {
            let mut s = self.session.lock();
            if s.generation != generation {
                log::debug!("Stop superseded by a newer one");
                return;
            }
            s.state = SessionState::Idle;
        }
        self.emit_state(&SessionState::Idle);
    }
}

/// Stream requests for one device, in the order they are tried.
fn attempts_for(engine: &ConstraintsPreferrer, mode: Mode, device_id: &str) -> Vec<Attempt> {
    let previews = engine
        .capability(device_id)
        .map(|c| c.video_resolutions())
        .unwrap_or_default();
    let candidates = engine.get_sorted_candidates(device_id, &previews);
    if candidates.is_empty() {
        log::debug!("Using coarse constraints for {}", device_id);
        return StreamConstraints::coarse_defaults(device_id, mode.default_aspect_ratio())
            .into_iter()
            .map(|constraints| Attempt {
                constraints,
                capture_resolution: None,
            })
            .collect();
    }

    candidates
        .into_iter()
        .flat_map(|candidate| {
            let resolution = candidate.resolution;
            candidate.preview_requests.into_iter().map(move |constraints| Attempt {
                constraints,
                capture_resolution: Some(resolution),
            })
        })
        .collect()
}

/// `devices` with `preferred` moved to the front.
fn order_devices(mut devices: Vec<String>, preferred: Option<&str>) -> Vec<String> {
    if let Some(pos) = preferred.and_then(|p| devices.iter().position(|d| d == p)) {
        let device = devices.remove(pos);
        devices.insert(0, device);
    }
    devices
}

fn next_device(devices: &[String], current: Option<&str>) -> Option<String> {
    if devices.is_empty() {
        return None;
    }
    let index = current
        .and_then(|c| devices.iter().position(|d| d == c))
        .map_or(0, |i| (i + 1) % devices.len());
    Some(devices[index].clone())
}

/// Replace any pending retry with a new one.
fn schedule_retry(inner: &Arc<Inner>, session: &mut Session, generation: u64) {
    if let Some(previous) = session.retry.take() {
        previous.abort();
    }
    let delay = inner.config.retry_interval;
    session.retry = Some(tokio::spawn(retry_after(Arc::downgrade(inner), delay, generation)));
}

fn retry_after(inner: Weak<Inner>, delay: Duration, generation: u64) -> BoxFuture<'static, ()> {
    async move {
        tokio::time::sleep(delay).await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let _ops = inner.ops.lock().await;
        {
            let mut s = inner.session.lock();
            if s.generation != generation {
                return;
            }
            // Detach our own handle so `start` does not abort this task.
            s.retry = None;
        }
        inner.start_locked().await;
    }
    .boxed()
}

fn spawn_watchdog(inner: &Arc<Inner>, generation: u64, stream: Arc<dyn MediaStream>) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    let period = inner.config.watchdog_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            if !stream.is_live() {
                break;
            }
        }
        log::warn!("Stream on {} ended, restarting", stream.settings().device_id);
        if let Some(inner) = weak.upgrade() {
            tokio::spawn(recover(inner, generation));
        }
    })
}

fn recover(inner: Arc<Inner>, generation: u64) -> BoxFuture<'static, ()> {
    async move {
        let _ops = inner.ops.lock().await;
        if inner.session.lock().generation != generation {
            return;
        }
        inner.stop_locked().await;
        inner.start_locked().await;
    }
    .boxed()
}

fn spawn_restart(inner: Arc<Inner>) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        log::warn!("No runtime available, reconfiguration skipped");
        return;
    };
    runtime.spawn(restart(inner));
}

fn restart(inner: Arc<Inner>) -> BoxFuture<'static, ()> {
    async move {
        log::info!("Reconfiguring capture session");
        inner.restart().await;
    }
    .boxed()
}
