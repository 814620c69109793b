use std::collections::HashMap;

use crate::models::capability::DeviceCapability;
use crate::models::constraints::{CaptureCandidate, FrameRate, StreamConstraints};
use crate::models::resolution::Resolution;

use super::sort_by_preference;

const FPS_30: u32 = 30;
const FPS_60: u32 = 60;

/// Video candidates: one per (resolution, frame rate) pair, best first.
///
/// The recorded stream is the preview, so every candidate carries exactly
/// one stream request at its capture resolution.
pub fn sorted_candidates(
    device_id: &str,
    capability: &DeviceCapability,
    preferred: Option<Resolution>,
    preferred_fps: &HashMap<Resolution, u32>,
) -> Vec<CaptureCandidate> {
    let mut resolutions = capability.video_resolutions();
    sort_by_preference(&mut resolutions, preferred);

    resolutions
        .into_iter()
        .flat_map(|resolution| {
            let fixed = capability.fixed_fps_for(resolution);
            fps_candidates(&fixed, preferred_fps.get(&resolution).copied())
                .into_iter()
                .map(move |fps| CaptureCandidate {
                    resolution,
                    preview_requests: vec![StreamConstraints::exact(
                        device_id,
                        resolution,
                        FrameRate::fixed(fps),
                    )],
                })
        })
        .collect()
}

/// Frame rates to try for one resolution. `None` means no fixed rate.
///
/// When both 30 and 60 are fixed rates only those two are tried, the last
/// chosen one first (30 by default). Otherwise every fixed rate of at least
/// 30 is tried from fastest to slowest. `None` always comes last.
pub fn fps_candidates(fixed: &[u32], preferred: Option<u32>) -> Vec<Option<u32>> {
    if fixed.contains(&FPS_30) && fixed.contains(&FPS_60) {
        let first = match preferred {
            Some(FPS_60) => FPS_60,
            _ => FPS_30,
        };
        let second = if first == FPS_30 { FPS_60 } else { FPS_30 };
        return vec![Some(first), Some(second), None];
    }

    let mut fpses: Vec<u32> = fixed.iter().copied().filter(|fps| *fps >= FPS_30).collect();
    fpses.sort_unstable_by(|a, b| b.cmp(a));
    fpses.dedup();
    fpses.into_iter().map(Some).chain(std::iter::once(None)).collect()
}
