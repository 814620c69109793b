//! Countdown run before a take.
//!
//! One [`TimerTick`] is shared by every mode controller of a session. Only the
//! most recently started countdown can be cancelled.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::models::config::Countdown;
use crate::traits::cue_player::{Cue, CuePlayer};

/// The countdown was cancelled before reaching zero.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("countdown cancelled")]
pub struct Cancelled;

pub struct TimerTick {
    cues: Option<Arc<dyn CuePlayer>>,
    tick_interval: Duration,
    cancel: Mutex<Option<Arc<Notify>>>,
}

impl TimerTick {
    pub fn new(cues: Option<Arc<dyn CuePlayer>>, tick_interval: Duration) -> Self {
        Self {
            cues,
            tick_interval,
            cancel: Mutex::new(None),
        }
    }

    /// Count down, calling `on_tick` with the ticks remaining at each step.
    ///
    /// Resolves once the count reaches zero, or with [`Cancelled`] if
    /// [`TimerTick::cancel`] is called first.
    pub async fn start<F>(&self, countdown: Countdown, on_tick: F) -> Result<(), Cancelled>
    where
        F: Fn(u32),
    {
        let notify = Arc::new(Notify::new());
        *self.cancel.lock() = Some(Arc::clone(&notify));

        let mut result = Ok(());
        for remaining in (1..=countdown.ticks()).rev() {
            on_tick(remaining);
            let cue = self.play_cue(tick_cue(remaining));

            let cancelled = tokio::select! {
                _ = notify.notified() => true,
                _ = tokio::time::sleep(self.tick_interval) => false,
            };
            if cancelled {
                if let Some(cue) = cue {
                    cue.abort();
                }
                log::debug!("Countdown cancelled with {} ticks left", remaining);
                result = Err(Cancelled);
                break;
            }
        }

        let mut slot = self.cancel.lock();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, &notify)) {
            *slot = None;
        }
        result
    }

    /// Cancel the most recent countdown, if it is still running.
    pub fn cancel(&self) {
        if let Some(notify) = self.cancel.lock().take() {
            notify.notify_one();
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.lock().is_some()
    }

    fn play_cue(&self, cue: Cue) -> Option<JoinHandle<()>> {
        let cues = Arc::clone(self.cues.as_ref()?);
        Some(tokio::spawn(async move { cues.play(cue).await }))
    }
}

fn tick_cue(remaining: u32) -> Cue {
    match remaining {
        1 => Cue::TickFinal,
        2 | 3 => Cue::TickIncrement,
        _ => Cue::TickStart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingCues(Mutex<Vec<Cue>>);

    #[async_trait]
    impl CuePlayer for RecordingCues {
        async fn play(&self, cue: Cue) {
            self.0.lock().push(cue);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn three_second_countdown_plays_cues() {
        let cues = Arc::new(RecordingCues::default());
        let timer = TimerTick::new(Some(cues.clone() as Arc<dyn CuePlayer>), Duration::from_secs(1));
        let ticks = Mutex::new(Vec::new());

        let started = Instant::now();
        timer.start(Countdown::Three, |n| ticks.lock().push(n)).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(*ticks.lock(), vec![3, 2, 1]);
        tokio::task::yield_now().await;
        assert_eq!(
            *cues.0.lock(),
            vec![Cue::TickIncrement, Cue::TickIncrement, Cue::TickFinal]
        );
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ten_second_countdown_starts_with_start_cue() {
        let cues = Arc::new(RecordingCues::default());
        let timer = TimerTick::new(Some(cues.clone() as Arc<dyn CuePlayer>), Duration::from_secs(1));
        timer.start(Countdown::Ten, |_| {}).await.unwrap();
        tokio::task::yield_now().await;

        let played = cues.0.lock().clone();
        assert_eq!(played.len(), 10);
        assert_eq!(played[0], Cue::TickStart);
        assert_eq!(played[6], Cue::TickStart);
        assert_eq!(played[7], Cue::TickIncrement);
        assert_eq!(played[9], Cue::TickFinal);
    }

    #[tokio::test(start_paused = true)]
    async fn off_resolves_immediately() {
        let timer = TimerTick::new(None, Duration::from_secs(1));
        let started = Instant::now();
        timer.start(Countdown::Off, |_| panic!("no ticks expected")).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_rejects_outstanding_countdown() {
        let timer = Arc::new(TimerTick::new(None, Duration::from_secs(1)));
        let running = Arc::clone(&timer);
        let task = tokio::spawn(async move { running.start(Countdown::Ten, |_| {}).await });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        timer.cancel();

        assert_eq!(task.await.unwrap(), Err(Cancelled));
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn new_countdown_takes_over_cancel_handle() {
        let timer = Arc::new(TimerTick::new(None, Duration::from_secs(1)));
        let first = {
            let timer = Arc::clone(&timer);
            tokio::spawn(async move { timer.start(Countdown::Three, |_| {}).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        let second = {
            let timer = Arc::clone(&timer);
            tokio::spawn(async move { timer.start(Countdown::Ten, |_| {}).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;

        timer.cancel();

        assert_eq!(second.await.unwrap(), Err(Cancelled));
        assert_eq!(first.await.unwrap(), Ok(()));
    }
}
