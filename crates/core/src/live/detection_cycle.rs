use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::person_segmenter::{PersonSegmenter, SegmentationQuality};
use crate::masking::domain::segmentation_mask::SegmentationMask;
use crate::shared::frame::{Frame, FrameSize};
use crate::shared::region::FaceRegion;

/// Outcome of running the local detectors on one admitted frame.
///
/// A failing detector does not end the session: the cycle is reported as
/// `Skipped` and the overlay shows no faces until the next cycle succeeds.
#[derive(Clone, Debug)]
pub enum CycleResult {
    Detected {
        /// Face rectangles in top-left pixel space of the frame.
        faces: Vec<FaceRegion>,
        /// Top-down mask at frame resolution, when segmentation ran.
        mask: Option<SegmentationMask>,
    },
    Skipped {
        reason: String,
    },
}

impl CycleResult {
    pub fn faces(&self) -> &[FaceRegion] {
        match self {
            CycleResult::Detected { faces, .. } => faces,
            CycleResult::Skipped { .. } => &[],
        }
    }

    pub fn mask(&self) -> Option<&SegmentationMask> {
        match self {
            CycleResult::Detected { mask, .. } => mask.as_ref(),
            CycleResult::Skipped { .. } => None,
        }
    }
}

/// Runs the face detector, and the segmenter when given, on `frame`.
///
/// Both calls are synchronous. Rectangles are converted to pixel space and
/// the mask is normalized to the frame so the owner never has to know what
/// convention a detector uses.
pub fn run_detection_cycle(
    frame: &Frame,
    detector: &mut dyn FaceDetector,
    segmenter: Option<&mut (dyn PersonSegmenter + '_)>,
) -> CycleResult {
    let size = frame.size();

    let faces = match detector.detect(frame) {
        Ok(rects) => to_pixel_regions(&rects, size),
        Err(e) => {
            log::warn!("Face detection failed on frame {}: {e}", frame.index());
            return CycleResult::Skipped {
                reason: format!("face detection: {e}"),
            };
        }
    };

    let mask = match segmenter {
        Some(segmenter) => match segmenter.segment(frame, SegmentationQuality::Realtime) {
            Ok(mask) => Some(mask.normalized_to(size)),
            Err(e) => {
                log::warn!("Segmentation failed on frame {}: {e}", frame.index());
                return CycleResult::Skipped {
                    reason: format!("segmentation: {e}"),
                };
            }
        },
        None => None,
    };

    CycleResult::Detected { faces, mask }
}

fn to_pixel_regions(
    rects: &[crate::shared::region::NormalizedRect],
    size: FrameSize,
) -> Vec<FaceRegion> {
    rects
        .iter()
        .map(|r| r.to_pixel_region(size))
        .filter(|r| !r.is_empty())
        .collect()
}
