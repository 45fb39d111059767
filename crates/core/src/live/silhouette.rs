use image::RgbaImage;

use super::recognition_coordinator::DetectedFace;
use crate::masking::domain::edge_extractor::extract_edges;
use crate::masking::domain::region_isolation::{isolate_subject, IsolationProfile};
use crate::masking::domain::segmentation_mask::SegmentationMask;
use crate::shared::frame::FrameSize;

/// Outlines every identified person in their identity color.
///
/// Each identified face isolates its own subject from the shared mask, so
/// two people standing apart get separate colored outlines. Returns `None`
/// when no face is identified; the renderer then falls back to boxes.
pub fn build_silhouette(
    mask: &SegmentationMask,
    faces: &[DetectedFace],
    size: FrameSize,
) -> Option<RgbaImage> {
    let mut identified = faces
        .iter()
        .filter_map(|face| face.identity.as_ref().map(|m| (face, m)))
        .peekable();
    identified.peek()?;

    let mut out = RgbaImage::new(size.width, size.height);
    for (face, identity) in identified {
        let isolated = isolate_subject(mask, &face.bounds, size, IsolationProfile::Live);
        let edges = extract_edges(&isolated, identity.color);
        for (dst, src) in out.pixels_mut().zip(edges.pixels()) {
            if src.0[3] != 0 {
                *dst = *src;
            }
        }
    }
    Some(out)
}
