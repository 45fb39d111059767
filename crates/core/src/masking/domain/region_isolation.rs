use super::segmentation_mask::SegmentationMask;
use crate::shared::frame::FrameSize;
use crate::shared::region::FaceRegion;

/// Parameters for isolating one subject around its face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IsolationProfile {
    /// Silhouette overlay: generous bounds reaching down over the torso.
    Live,
    /// Still-photo cutout: tighter, square-ish bounds.
    Cutout,
}

/// Radial weight field: 1 inside `inner`, 0 beyond `outer`, linear between.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadialFalloff {
    pub center: (f64, f64),
    pub inner: f64,
    pub outer: f64,
}

impl RadialFalloff {
    pub fn for_face(face: &FaceRegion, profile: IsolationProfile) -> Self {
        let (inner, outer) = match profile {
            IsolationProfile::Live => {
                // Two face widths to each side, half a face above, six below.
                let expanded_width = face.width * 5.0;
                let expanded_height = face.height * 7.5;
                let extent = expanded_width.max(expanded_height);
                (extent * 0.6, extent)
            }
            IsolationProfile::Cutout => {
                let extent = face.width.max(face.height) * 4.0;
                (extent * 0.8, extent * 1.2)
            }
        };
        Self {
            center: face.center(),
            inner,
            outer,
        }
    }

    pub fn weight_at(&self, x: f64, y: f64) -> f32 {
        let dx = x - self.center.0;
        let dy = y - self.center.1;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance <= self.inner {
            1.0
        } else if distance >= self.outer {
            0.0
        } else {
            (1.0 - (distance - self.inner) / (self.outer - self.inner)) as f32
        }
    }
}

/// Keeps only the person around `anchor`, fading out with distance.
///
/// The mask is first brought to `target` size and top-down row order, so
/// `anchor` is interpreted in that space. An anchor that misses the target
/// entirely yields an all-zero mask.
pub fn isolate_subject(
    mask: &SegmentationMask,
    anchor: &FaceRegion,
    target: FrameSize,
    profile: IsolationProfile,
) -> SegmentationMask {
    if anchor.is_empty() || !anchor.intersects_size(target) {
        return SegmentationMask::zeros(target.width, target.height);
    }

    let falloff = RadialFalloff::for_face(anchor, profile);
    mask.normalized_to(target)
        .multiplied_by(|x, y| falloff.weight_at(x as f64 + 0.5, y as f64 + 0.5))
}
