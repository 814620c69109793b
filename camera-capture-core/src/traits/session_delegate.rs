use crate::models::error::{CaptureError, TakeError};
use crate::models::state::SessionState;
use crate::models::take_result::TakeResult;

/// Event delegate for capture session notifications.
///
/// Methods are called from runtime tasks, never while a session lock is held.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &SessionState);

    /// Called when no candidate could be acquired. The session keeps retrying.
    fn on_error(&self, error: &CaptureError);

    /// Called when a take starts or ends.
    fn on_taking_changed(&self, taking: bool);

    /// Called when a take has been saved.
    fn on_take_finished(&self, result: &TakeResult);

    /// Called once when a take is abandoned.
    fn on_take_error(&self, error: &TakeError);

    /// Called on every countdown tick with the ticks remaining.
    fn on_countdown_tick(&self, _remaining: u32) {}

    /// Called every second while recording.
    fn on_record_time(&self, _elapsed_secs: u64) {}
}
