use crate::shared::frame::FrameSize;
use crate::shared::region::FaceRegion;

/// Maps frame pixel space onto a display surface with aspect-fill.
///
/// The frame is scaled uniformly until it covers the whole target; the
/// overflow is split evenly so the frame stays centered. Face boxes and the
/// silhouette rect go through the same mapping so they stay registered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayTransform {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl DisplayTransform {
    pub const IDENTITY: DisplayTransform = DisplayTransform {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// Returns the identity transform when either size is empty.
    pub fn aspect_fill(source: FrameSize, target: FrameSize) -> Self {
        if source.is_empty() || target.is_empty() {
            return Self::IDENTITY;
        }
        let (sw, sh) = (source.width as f64, source.height as f64);
        let (tw, th) = (target.width as f64, target.height as f64);
        let scale = (tw / sw).max(th / sh);
        Self {
            scale,
            offset_x: (tw - sw * scale) / 2.0,
            offset_y: (th - sh * scale) / 2.0,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Top-left offset of the scaled frame; non-positive under aspect-fill.
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    pub fn apply_point(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.offset_x, y * self.scale + self.offset_y)
    }

    pub fn apply_region(&self, region: &FaceRegion) -> FaceRegion {
        let (x, y) = self.apply_point(region.x, region.y);
        FaceRegion::new(x, y, region.width * self.scale, region.height * self.scale)
    }

    /// Where the whole source frame (and any mask aligned with it) lands.
    pub fn frame_rect(&self, source: FrameSize) -> FaceRegion {
        self.apply_region(&FaceRegion::new(
            0.0,
            0.0,
            source.width as f64,
            source.height as f64,
        ))
    }
}
