use crate::masking::domain::segmentation_mask::SegmentationMask;
use crate::shared::frame::Frame;

/// Speed/accuracy trade-off for person segmentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SegmentationQuality {
    /// Cheap enough to run on every admitted live frame.
    #[default]
    Realtime,
    /// Single still image; latency does not matter.
    Best,
}

/// Domain interface for the local person-segmentation detector.
///
/// The returned mask is in whatever resolution and row order the model
/// produces; consumers normalize it before drawing.
pub trait PersonSegmenter: Send {
    fn segment(
        &mut self,
        frame: &Frame,
        quality: SegmentationQuality,
    ) -> Result<SegmentationMask, Box<dyn std::error::Error>>;
}
