use tokio::sync::watch;

use crate::models::error::TakeError;
use crate::models::take_result::{TakeMetadata, TakeOutcome, TakeResult};
use crate::traits::capability_query::ReprocessEffect;

use super::{photo, Inner};

const PORTRAIT_EFFECT: &str = "portrait";

/// A photo plus, when the device manages it, its portrait-effect version.
///
/// The reference photo is always saved. A failed effect only drops the
/// effect file.
pub(super) async fn run(inner: &Inner, cancelled: &mut watch::Receiver<bool>) -> Result<TakeOutcome, TakeError> {
    let query = inner
        .ctx
        .capability_query
        .clone()
        .ok_or_else(|| TakeError::CaptureFailed("portrait mode needs a capability query".into()))?;

    let supported = query
        .is_portrait_mode_supported(&inner.ctx.device_id)
        .await
        .map_err(|e| TakeError::CapabilityQueryFailed(e.to_string()))?;
    if !supported {
        return Err(TakeError::PortraitUnsupported(inner.ctx.device_id.clone()));
    }

    let (effect, snapshot) = tokio::join!(
        query.set_reprocess_option(&inner.ctx.device_id, ReprocessEffect::Portrait),
        photo::snap(inner),
    );
    let snapshot = snapshot?;
    if *cancelled.borrow() {
        return Ok(TakeOutcome::Cancelled);
    }

    let metadata = TakeMetadata::new(inner.ctx.mode, &inner.ctx.device_id, snapshot.resolution);
    let reference = inner.ctx.sink.save_photo(snapshot.blob, &metadata).await?;

    let effect = match effect {
        Ok(blob) => {
            let effect_metadata = metadata.with_effect(PORTRAIT_EFFECT);
            match inner.ctx.sink.save_photo(blob, &effect_metadata).await {
                Ok(file) => Some(file),
                Err(e) => {
                    log::warn!("Failed to save portrait effect: {}", e);
                    None
                }
            }
        }
        Err(e) => {
            log::warn!("Portrait effect failed on {}: {}", inner.ctx.device_id, e);
            None
        }
    };

    Ok(TakeOutcome::Saved(TakeResult::Portrait {
        reference,
        effect,
        metadata,
    }))
}
