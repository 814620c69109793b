use std::collections::BTreeMap;

use crate::models::constraints::{CaptureCandidate, FrameRate, StreamConstraints};
use crate::models::resolution::{AspectRatioKey, Resolution};

use super::sort_by_preference;

/// Photo candidates: one per aspect ratio offered by both the photo and the
/// preview resolutions, best first.
///
/// Each candidate pairs a capture resolution with every preview resolution
/// of the same shape, ordered by [`sort_previews`].
pub fn sorted_candidates(
    device_id: &str,
    photo_resolutions: &[Resolution],
    preview_resolutions: &[Resolution],
    preferred: Option<Resolution>,
    screen_width: u32,
) -> Vec<CaptureCandidate> {
    let captures = group_by_aspect(photo_resolutions, AspectRatioKey::of);
    let previews = group_by_aspect(preview_resolutions, AspectRatioKey::of_preview);

    let mut picked: Vec<(Resolution, &Vec<Resolution>)> = captures
        .iter()
        .filter_map(|(key, bucket)| {
            let previews = previews.get(key)?;
            let capture = preferred
                .filter(|p| bucket.contains(p))
                .or_else(|| bucket.iter().copied().max_by_key(|r| (r.width, r.height)))?;
            Some((capture, previews))
        })
        .collect();

    let mut order: Vec<Resolution> = picked.iter().map(|(capture, _)| *capture).collect();
    sort_by_preference(&mut order, preferred);
    picked.sort_by_key(|(capture, _)| order.iter().position(|r| r == capture));

    picked
        .into_iter()
        .map(|(capture, previews)| CaptureCandidate {
            resolution: capture,
            preview_requests: sort_previews(previews, capture.width, screen_width)
                .into_iter()
                .map(|preview| StreamConstraints::exact(device_id, preview, FrameRate::fallback()))
                .collect(),
        })
        .collect()
}

/// Order preview resolutions for a capture of width `capture_width` shown on
/// a screen `screen_width` physical pixels wide.
///
/// With `Rc = capture_width` and `Rs = screen_width`:
/// - `Rc <= Rs`: previews `<= Rc` descending, then `> Rc` ascending.
/// - `Rc > Rs`: previews in `[Rs, Rc]` ascending, then `< Rs` descending,
///   then `> Rc` ascending.
pub fn sort_previews(previews: &[Resolution], capture_width: u32, screen_width: u32) -> Vec<Resolution> {
    let rc = capture_width;
    let rs = screen_width;

    let descending = |mut v: Vec<Resolution>| {
        v.sort_by(|a, b| b.width.cmp(&a.width));
        v
    };
    let ascending = |mut v: Vec<Resolution>| {
        v.sort_by(|a, b| a.width.cmp(&b.width));
        v
    };
    let select = |pred: &dyn Fn(u32) -> bool| -> Vec<Resolution> {
        previews.iter().copied().filter(|r| pred(r.width)).collect()
    };

    if rc <= rs {
        let mut out = descending(select(&|w: u32| w <= rc));
        out.extend(ascending(select(&|w: u32| w > rc)));
        out
    } else {
        let mut out = ascending(select(&|w: u32| rs <= w && w <= rc));
        out.extend(descending(select(&|w: u32| w < rs)));
        out.extend(ascending(select(&|w: u32| w > rc)));
        out
    }
}

fn group_by_aspect(
    resolutions: &[Resolution],
    key_of: fn(Resolution) -> AspectRatioKey,
) -> BTreeMap<AspectRatioKey, Vec<Resolution>> {
    let mut groups: BTreeMap<AspectRatioKey, Vec<Resolution>> = BTreeMap::new();
    for r in resolutions {
        let bucket = groups.entry(key_of(*r)).or_default();
        if !bucket.contains(r) {
            bucket.push(*r);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widths(rs: &[Resolution]) -> Vec<u32> {
        rs.iter().map(|r| r.width).collect()
    }

    fn preview_widths(candidate: &CaptureCandidate) -> Vec<u32> {
        candidate
            .preview_requests
            .iter()
            .map(|c| match c.width {
                crate::models::constraints::Dimension::Exact(w) => w,
                other => panic!("unexpected width constraint {:?}", other),
            })
            .collect()
    }

    #[test]
    fn capture_not_wider_than_screen() {
        let previews = [
            Resolution::new(320, 180),
            Resolution::new(1920, 1080),
            Resolution::new(640, 360),
            Resolution::new(1280, 720),
            Resolution::new(3840, 2160),
        ];
        let sorted = sort_previews(&previews, 1280, 1920);
        assert_eq!(widths(&sorted), vec![1280, 640, 320, 1920, 3840]);

        let boundary = sorted.iter().position(|r| r.width > 1280).unwrap();
        assert!(sorted[..boundary].iter().all(|r| r.width <= 1280));
        assert!(sorted[boundary..].iter().all(|r| r.width > 1280));
    }

    #[test]
    fn capture_wider_than_screen() {
        let previews = [
            Resolution::new(320, 180),
            Resolution::new(1920, 1080),
            Resolution::new(640, 360),
            Resolution::new(1280, 720),
            Resolution::new(3840, 2160),
            Resolution::new(1600, 900),
        ];
        let sorted = sort_previews(&previews, 1920, 1280);
        assert_eq!(widths(&sorted), vec![1280, 1600, 1920, 640, 320, 3840]);
    }

    #[test]
    fn scenario_photo_pairs_only_shared_aspect_ratios() {
        let photos = [Resolution::new(4032, 3024), Resolution::new(1920, 1080)];
        let previews = [Resolution::new(1920, 1080), Resolution::new(1280, 720)];

        let candidates = sorted_candidates("cam", &photos, &previews, None, 1280);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].resolution, Resolution::new(1920, 1080));
        // Rc = 1920 > Rs = 1280: both previews lie in [Rs, Rc] and go ascending.
        assert_eq!(preview_widths(&candidates[0]), vec![1280, 1920]);
        assert!(candidates[0]
            .preview_requests
            .iter()
            .all(|c| c.frame_rate == FrameRate::fallback() && c.device_id == "cam"));
    }

    #[test]
    fn preferred_bucket_first_and_preferred_capture_kept() {
        let photos = [
            Resolution::new(4032, 3024),
            Resolution::new(2048, 1536),
            Resolution::new(3840, 2160),
            Resolution::new(2000, 2000),
        ];
        let previews = [
            Resolution::new(640, 480),
            Resolution::new(1280, 720),
            Resolution::new(1080, 1080),
        ];

        let none = sorted_candidates("cam", &photos, &previews, None, 1920);
        assert_eq!(
            none.iter().map(|c| c.resolution).collect::<Vec<_>>(),
            vec![Resolution::new(4032, 3024), Resolution::new(3840, 2160), Resolution::new(2000, 2000)]
        );

        let preferred = sorted_candidates("cam", &photos, &previews, Some(Resolution::new(2048, 1536)), 1920);
        assert_eq!(preferred[0].resolution, Resolution::new(2048, 1536));
        assert_eq!(preferred.len(), 3);
    }

    #[test]
    fn quirky_848_preview_joins_sixteen_nine() {
        let photos = [Resolution::new(1920, 1080)];
        let previews = [Resolution::new(848, 480)];
        let candidates = sorted_candidates("cam", &photos, &previews, None, 1920);
        assert_eq!(candidates.len(), 1);
        assert_eq!(preview_widths(&candidates[0]), vec![848]);
    }

    #[test]
    fn empty_inputs_yield_no_candidates() {
        assert!(sorted_candidates("cam", &[], &[Resolution::new(640, 480)], None, 1280).is_empty());
        assert!(sorted_candidates("cam", &[Resolution::new(640, 480)], &[], None, 1280).is_empty());
    }
}
