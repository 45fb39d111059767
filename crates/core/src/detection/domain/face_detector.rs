use crate::shared::frame::Frame;
use crate::shared::region::NormalizedRect;

/// Domain interface for the local per-frame face detector.
///
/// Rectangles are unit-normalized with a bottom-left origin, the
/// convention of on-device vision APIs. Callers convert them with
/// [`NormalizedRect::to_pixel_region`]. Implementations may keep scratch
/// buffers between frames, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<NormalizedRect>, Box<dyn std::error::Error>>;
}
