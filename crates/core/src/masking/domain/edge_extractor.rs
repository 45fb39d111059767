use image::RgbaImage;

use super::segmentation_mask::SegmentationMask;
use crate::shared::color::Color;
use crate::shared::constants::{MASK_EDGE_CONTRAST, MASK_PRESENCE_THRESHOLD};

/// Traces the person boundary of `mask` in `accent`.
///
/// An interior pixel is an edge when it is at least
/// [`MASK_PRESENCE_THRESHOLD`] and one of its 4-neighbours differs from it by
/// more than [`MASK_EDGE_CONTRAST`]. Each edge pixel stamps a 3×3 block of
/// fully opaque accent color; everything else stays transparent. The output
/// has the mask's dimensions.
pub fn extract_edges(mask: &SegmentationMask, accent: Color) -> RgbaImage {
    let width = mask.width();
    let height = mask.height();
    let mut out = RgbaImage::new(width, height);
    if width < 3 || height < 3 {
        return out;
    }

    let paint = Color { a: 255, ..accent }.to_rgba();
    let data = mask.data();
    let w = width as usize;

    for y in 1..height as usize - 1 {
        for x in 1..w - 1 {
            let center = data[y * w + x];
            if center < MASK_PRESENCE_THRESHOLD {
                continue;
            }
            let neighbours = [
                data[(y - 1) * w + x],
                data[(y + 1) * w + x],
                data[y * w + x - 1],
                data[y * w + x + 1],
            ];
            let is_edge = neighbours
                .iter()
                .any(|&n| center.abs_diff(n) > MASK_EDGE_CONTRAST);
            if !is_edge {
                continue;
            }
            // Interior pixel, so the 3×3 block is always in bounds.
            for py in y - 1..=y + 1 {
                for px in x - 1..=x + 1 {
                    out.put_pixel(px as u32, py as u32, paint);
                }
            }
        }
    }

    out
}
