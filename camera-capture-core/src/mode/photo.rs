use tokio::sync::watch;

use crate::models::constraints::PhotoSettings;
use crate::models::error::TakeError;
use crate::models::resolution::Resolution;
use crate::models::take_result::{TakeMetadata, TakeOutcome, TakeResult};
use crate::traits::cue_player::Cue;

use super::Inner;

/// A photo as it came off the device.
pub(super) struct Snapshot {
    pub blob: Vec<u8>,
    pub resolution: Option<Resolution>,
}

/// Take one photo at the largest size matching the capture aspect ratio.
pub(super) async fn snap(inner: &Inner) -> Result<Snapshot, TakeError> {
    let capture = inner.image_capture()?;
    let capabilities = capture
        .photo_capabilities()
        .await
        .map_err(|e| TakeError::CapabilityQueryFailed(e.to_string()))?;

    let aspect = inner
        .ctx
        .capture_resolution
        .unwrap_or_else(|| inner.ctx.stream.settings().resolution());
    let resolution = capabilities.max_matching(aspect);
    log::debug!("Taking photo at {:?} on {}", resolution, inner.ctx.device_id);

    inner.play_detached(Cue::Shutter);
    let blob = capture
        .take_photo(PhotoSettings::for_resolution(resolution))
        .await
        .map_err(|e| TakeError::CaptureFailed(e.to_string()))?;
    Ok(Snapshot { blob, resolution })
}

pub(super) async fn run(inner: &Inner, cancelled: &mut watch::Receiver<bool>) -> Result<TakeOutcome, TakeError> {
    let snapshot = snap(inner).await?;
    if *cancelled.borrow() {
        return Ok(TakeOutcome::Cancelled);
    }

    let metadata = TakeMetadata::new(inner.ctx.mode, &inner.ctx.device_id, snapshot.resolution);
    let file = inner.ctx.sink.save_photo(snapshot.blob, &metadata).await?;
    Ok(TakeOutcome::Saved(TakeResult::Photo { file, metadata }))
}
