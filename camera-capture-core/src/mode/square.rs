use tokio::sync::watch;

use crate::models::error::TakeError;
use crate::models::resolution::Resolution;
use crate::models::take_result::{TakeMetadata, TakeOutcome, TakeResult};
use crate::processing::square_crop;

use super::{photo, Inner};

/// A photo cropped to its largest centered square.
pub(super) async fn run(inner: &Inner, cancelled: &mut watch::Receiver<bool>) -> Result<TakeOutcome, TakeError> {
    let snapshot = photo::snap(inner).await?;
    if *cancelled.borrow() {
        return Ok(TakeOutcome::Cancelled);
    }

    let blob = snapshot.blob;
    let (cropped, side) = tokio::task::spawn_blocking(move || square_crop::crop_center_square(&blob))
        .await
        .map_err(|e| TakeError::CaptureFailed(format!("crop task failed: {}", e)))?
        .map_err(TakeError::CaptureFailed)?;

    let metadata = TakeMetadata::new(inner.ctx.mode, &inner.ctx.device_id, Some(Resolution::new(side, side)));
    let file = inner.ctx.sink.save_photo(cropped, &metadata).await?;
    Ok(TakeOutcome::Saved(TakeResult::Photo { file, metadata }))
}
