use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::shared::frame::FrameSize;

/// Row order of a mask buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOrder {
    /// First row is the top of the image (display convention).
    TopDown,
    /// First row is the bottom of the image (segmentation-service convention).
    BottomUp,
}

impl RowOrder {
    fn flipped(self) -> Self {
        match self {
            RowOrder::TopDown => RowOrder::BottomUp,
            RowOrder::BottomUp => RowOrder::TopDown,
        }
    }
}

/// Single-channel person probability buffer, 0 = background, 255 = person.
///
/// Drawing code only accepts top-down masks at frame resolution; use
/// [`SegmentationMask::normalized_to`] to get there from whatever the
/// segmenter emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentationMask {
    image: GrayImage,
    row_order: RowOrder,
}

impl SegmentationMask {
    pub fn new(data: Vec<u8>, width: u32, height: u32, row_order: RowOrder) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "mask length must equal width * height"
        );
        let image =
            GrayImage::from_raw(width, height, data).unwrap_or_else(|| GrayImage::new(width, height));
        Self { image, row_order }
    }

    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
            row_order: RowOrder::TopDown,
        }
    }

    pub fn data(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width(), self.height())
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y).0[0]
    }

    pub fn is_blank(&self) -> bool {
        self.data().iter().all(|&v| v == 0)
    }

    /// Reverses row order. Applying it twice yields the original mask.
    pub fn flipped_vertically(&self) -> Self {
        Self {
            image: imageops::flip_vertical(&self.image),
            row_order: self.row_order.flipped(),
        }
    }

    /// Triangle-filter resample to `size`, keeping the row order.
    pub fn resized(&self, size: FrameSize) -> Self {
        if size == self.size() {
            return self.clone();
        }
        let image = if self.size().is_empty() || size.is_empty() {
            GrayImage::new(size.width, size.height)
        } else {
            imageops::resize(&self.image, size.width, size.height, FilterType::Triangle)
        };
        Self {
            image,
            row_order: self.row_order,
        }
    }

    /// Scales to `size` and flips to top-down if needed.
    ///
    /// Every drawing path goes through here first so mask, frame and
    /// face rectangles share one coordinate space.
    pub fn normalized_to(&self, size: FrameSize) -> Self {
        let resized = self.resized(size);
        match resized.row_order {
            RowOrder::TopDown => resized,
            RowOrder::BottomUp => resized.flipped_vertically(),
        }
    }

    /// Per-pixel product with a weight field in `[0, 1]`.
    pub(crate) fn multiplied_by(&self, weight: impl Fn(u32, u32) -> f32) -> Self {
        let mut image = self.image.clone();
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let v = pixel.0[0];
            if v != 0 {
                pixel.0[0] = (v as f32 * weight(x, y).clamp(0.0, 1.0)).round() as u8;
            }
        }
        Self {
            image,
            row_order: self.row_order,
        }
    }
}
