use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::models::error::TakeError;
use crate::models::take_result::{elapsed_minutes, TakeMetadata, TakeOutcome, TakeResult};
use crate::traits::cue_player::Cue;

use super::{wait_cancelled, Inner};

enum Event {
    Chunk(Option<Vec<u8>>),
    Stop,
    Tick,
}

/// Record until the take is stopped or the recorder closes its channel.
pub(super) async fn record(inner: &Inner, cancelled: &mut watch::Receiver<bool>) -> Result<TakeOutcome, TakeError> {
    if let Some(cues) = &inner.ctx.cues {
        tokio::select! {
            biased;
            _ = wait_cancelled(cancelled) => return Ok(TakeOutcome::Cancelled),
            _ = cues.play(Cue::RecordStart) => {}
        }
    }

    let recorder = inner.recorder()?;
    let metadata = TakeMetadata::new(inner.ctx.mode, &inner.ctx.device_id, inner.ctx.capture_resolution);
    let mut saver = inner.ctx.sink.start_save_video(&metadata).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Err(e) = recorder.start(tx) {
        discard(saver).await;
        return Err(TakeError::CaptureFailed(e.to_string()));
    }
    log::info!("Recording started on {}", inner.ctx.device_id);

    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + Duration::from_secs(1), Duration::from_secs(1));
    let mut stopping = false;
    let mut written: u64 = 0;

    loop {
        let event = tokio::select! {
            chunk = rx.recv() => Event::Chunk(chunk),
            _ = wait_cancelled(cancelled), if !stopping => Event::Stop,
            _ = ticker.tick() => Event::Tick,
        };
        match event {
            Event::Chunk(Some(chunk)) => {
                if chunk.is_empty() {
                    continue;
                }
                if let Err(e) = saver.write(&chunk).await {
                    recorder.stop();
                    discard(saver).await;
                    return Err(e.into());
                }
                written += chunk.len() as u64;
            }
            Event::Chunk(None) => break,
            Event::Stop => {
                stopping = true;
                recorder.stop();
            }
            Event::Tick => {
                if let Some(d) = &inner.ctx.delegate {
                    d.on_record_time(started.elapsed().as_secs());
                }
            }
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    log::info!("Recording stopped after {:.1}s, {} bytes", elapsed, written);
    if let Some(cues) = &inner.ctx.cues {
        cues.play(Cue::RecordEnd).await;
    }

    if written == 0 {
        discard(saver).await;
        return Err(TakeError::EmptyRecording);
    }
    let file = saver.end_write().await?;
    Ok(TakeOutcome::Saved(TakeResult::Video {
        file,
        duration_minutes: elapsed_minutes(elapsed),
        metadata,
    }))
}

async fn discard(saver: Box<dyn crate::traits::result_sink::VideoSaver>) {
    if let Err(e) = saver.cancel().await {
        log::warn!("Failed to discard recording: {}", e);
    }
}
