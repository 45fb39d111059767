use super::frame::FrameSize;

/// A face rectangle in top-left-origin pixel coordinates.
///
/// Fractional so that display-space transforms stay exact; carries no
/// identity of its own.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FaceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Overlapping rectangle, or `None` when the two only touch or are apart.
    pub fn intersection(&self, other: &FaceRegion) -> Option<FaceRegion> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.max_x().min(other.max_x());
        let y2 = self.max_y().min(other.max_y());
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(FaceRegion::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn union(&self, other: &FaceRegion) -> FaceRegion {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.max_x().max(other.max_x());
        let y2 = self.max_y().max(other.max_y());
        FaceRegion::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Fraction of this region's area covered by `other`.
    ///
    /// Asymmetric on purpose: measured against `self`, not the union.
    pub fn overlap_ratio(&self, other: &FaceRegion) -> f64 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection(other)
            .map_or(0.0, |inter| inter.area() / area)
    }

    pub fn intersects_size(&self, size: FrameSize) -> bool {
        let bounds = FaceRegion::new(0.0, 0.0, size.width as f64, size.height as f64);
        self.intersection(&bounds).is_some()
    }
}

/// A detector-native rectangle: unit-normalized, origin at the bottom-left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts to a top-left-origin pixel rectangle for a frame of `size`.
    pub fn to_pixel_region(&self, size: FrameSize) -> FaceRegion {
        let w = size.width as f64;
        let h = size.height as f64;
        FaceRegion::new(
            self.x * w,
            (1.0 - self.y - self.height) * h,
            self.width * w,
            self.height * h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn region(x: f64, y: f64, w: f64, h: f64) -> FaceRegion {
        FaceRegion::new(x, y, w, h)
    }

    #[test]
    fn test_intersection_partial_overlap() {
        let a = region(100.0, 100.0, 100.0, 100.0);
        let b = region(150.0, 150.0, 100.0, 100.0);
        let inter = a.intersection(&b).unwrap();
        assert_eq!(inter, region(150.0, 150.0, 50.0, 50.0));
        assert_relative_eq!(inter.area(), 2500.0);
    }

    #[test]
    fn test_intersection_touching_edges_is_none() {
        let a = region(0.0, 0.0, 50.0, 50.0);
        let b = region(50.0, 0.0, 50.0, 50.0);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_union_covers_both() {
        let a = region(0.0, 0.0, 10.0, 10.0);
        let b = region(20.0, 5.0, 10.0, 20.0);
        assert_eq!(a.union(&b), region(0.0, 0.0, 30.0, 25.0));
    }

    #[test]
    fn test_overlap_ratio_is_relative_to_self() {
        let small = region(0.0, 0.0, 10.0, 10.0);
        let big = region(0.0, 0.0, 100.0, 100.0);
        assert_relative_eq!(small.overlap_ratio(&big), 1.0);
        assert_relative_eq!(big.overlap_ratio(&small), 0.01);
    }

    #[rstest]
    #[case::zero_width(region(0.0, 0.0, 0.0, 100.0))]
    #[case::zero_height(region(0.0, 0.0, 100.0, 0.0))]
    #[case::negative(region(0.0, 0.0, -5.0, 10.0))]
    fn test_overlap_ratio_degenerate_is_zero(#[case] face: FaceRegion) {
        let other = region(0.0, 0.0, 50.0, 50.0);
        assert_relative_eq!(face.overlap_ratio(&other), 0.0);
    }

    #[test]
    fn test_center() {
        let (cx, cy) = region(10.0, 20.0, 40.0, 60.0).center();
        assert_relative_eq!(cx, 30.0);
        assert_relative_eq!(cy, 50.0);
    }

    #[test]
    fn test_normalized_bottom_left_to_top_left_pixels() {
        // Bottom-left origin: a box hugging the bottom edge of the unit square.
        let rect = NormalizedRect::new(0.25, 0.0, 0.5, 0.25);
        let px = rect.to_pixel_region(FrameSize::new(200, 100));
        assert_relative_eq!(px.x, 50.0);
        assert_relative_eq!(px.y, 75.0);
        assert_relative_eq!(px.width, 100.0);
        assert_relative_eq!(px.height, 25.0);
    }

    #[test]
    fn test_normalized_top_band_maps_to_row_zero() {
        let rect = NormalizedRect::new(0.0, 0.9, 1.0, 0.1);
        let px = rect.to_pixel_region(FrameSize::new(10, 10));
        assert_relative_eq!(px.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(px.height, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_intersects_size() {
        let size = FrameSize::new(100, 100);
        assert!(region(90.0, 90.0, 20.0, 20.0).intersects_size(size));
        assert!(!region(100.0, 0.0, 20.0, 20.0).intersects_size(size));
        assert!(!region(-30.0, -30.0, 20.0, 20.0).intersects_size(size));
    }
}
