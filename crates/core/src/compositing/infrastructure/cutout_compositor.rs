use image::imageops::{self, FilterType};
use image::{Rgba, RgbImage, RgbaImage};

use super::gaussian::GaussianBlur;
use crate::compositing::domain::portrait_layout::PortraitLayout;
use crate::detection::domain::person_segmenter::{PersonSegmenter, SegmentationQuality};
use crate::masking::domain::region_isolation::{isolate_subject, IsolationProfile};
use crate::masking::domain::segmentation_mask::SegmentationMask;
use crate::rendering::infrastructure::raster_canvas::{blend_pixel, draw_text};
use crate::shared::color::Color;
use crate::shared::error::OverlayError;
use crate::shared::frame::{Frame, FrameSize};
use crate::shared::region::FaceRegion;

const WIDE_SHADOW_KERNEL: usize = 121;
const WIDE_SHADOW_OFFSET: i64 = 24;
const WIDE_SHADOW_OPACITY: f32 = 0.55;
const NARROW_SHADOW_KERNEL: usize = 25;
const NARROW_SHADOW_OFFSET: i64 = 8;
const NARROW_SHADOW_OPACITY: f32 = 0.8;
const NAME_GLOW_KERNEL: usize = 31;
const NAME_GLOW_OPACITY: f32 = 0.9;
const NAME_SHADOW_OPACITY: f32 = 0.6;

/// Who to cut out and how to label them.
#[derive(Clone, Debug, PartialEq)]
pub struct CutoutRequest {
    /// Face box in the source image's pixel space.
    pub face: FaceRegion,
    pub color: Color,
    pub display_name: String,
}

pub struct CutoutOutput {
    /// Subject on a transparent background, cropped to its extent.
    pub cutout: RgbaImage,
    /// The fixed-size portrait card.
    pub presentation: RgbaImage,
}

/// Still-photo cutout: segment once at best quality, isolate the subject
/// around `request.face`, and composite the portrait card.
///
/// Either both images are produced or the first failing stage is returned.
pub fn compose_cutout(
    image: &RgbImage,
    request: &CutoutRequest,
    segmenter: &mut dyn PersonSegmenter,
) -> Result<CutoutOutput, OverlayError> {
    let (width, height) = image.dimensions();
    let size = FrameSize::new(width, height);
    if size.is_empty() {
        return Err(OverlayError::InvalidImage("image has no pixels".into()));
    }
    if request.face.is_empty() || !request.face.intersects_size(size) {
        return Err(OverlayError::InvalidImage(format!(
            "face box {:?} is not inside the {width}x{height} image",
            request.face
        )));
    }

    let frame = Frame::from_rgb_image(image.clone(), 0);
    let mask = segmenter
        .segment(&frame, SegmentationQuality::Best)
        .map_err(|e| OverlayError::SegmentationFailed(e.to_string()))?;
    if mask.size().is_empty() {
        return Err(OverlayError::SegmentationFailed(
            "segmenter returned an empty mask".into(),
        ));
    }
    log::debug!(
        "Cutout mask {}x{} for {}x{} image",
        mask.width(),
        mask.height(),
        width,
        height
    );

    let cutout = extract_cutout(image, &mask, &request.face)?;
    let presentation = render_presentation(&cutout, request.color, &request.display_name)?;
    Ok(CutoutOutput {
        cutout,
        presentation,
    })
}

/// Uses the isolated mask as an alpha stencil over `image` and crops to
/// the pixels that survived.
pub fn extract_cutout(
    image: &RgbImage,
    mask: &SegmentationMask,
    face: &FaceRegion,
) -> Result<RgbaImage, OverlayError> {
    let (width, height) = image.dimensions();
    let isolated = isolate_subject(mask, face, FrameSize::new(width, height), IsolationProfile::Cutout);

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in 0..height {
        for x in 0..width {
            if isolated.get(x, y) == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    let (x0, y0, x1, y1) = bounds.ok_or_else(|| {
        OverlayError::CompositingFailed("no person found around the selected face".into())
    })?;

    Ok(RgbaImage::from_fn(x1 - x0 + 1, y1 - y0 + 1, |x, y| {
        let [r, g, b] = image.get_pixel(x0 + x, y0 + y).0;
        Rgba([r, g, b, isolated.get(x0 + x, y0 + y)])
    }))
}

/// Composites `cutout` onto the portrait card.
///
/// Paint order: gradient, wide soft shadow, narrow saturated shadow, the
/// crisp subject, then the uppercased name with glow and drop shadow.
pub fn render_presentation(
    cutout: &RgbaImage,
    color: Color,
    display_name: &str,
) -> Result<RgbaImage, OverlayError> {
    let (cw, ch) = cutout.dimensions();
    if cw == 0 || ch == 0 {
        return Err(OverlayError::CompositingFailed("cutout is empty".into()));
    }
    let layout = PortraitLayout::compute(FrameSize::new(cw, ch), display_name);
    let canvas_size = layout.canvas;

    let mut canvas = diagonal_gradient(canvas_size, color.darkened(0.3), color.lightened(0.35));

    let subject_w = layout.subject.width.round() as u32;
    let subject_h = layout.subject.height.round() as u32;
    if subject_w == 0 || subject_h == 0 {
        return Err(OverlayError::CompositingFailed(format!(
            "cutout {cw}x{ch} does not fit the card"
        )));
    }
    let subject = imageops::resize(cutout, subject_w, subject_h, FilterType::CatmullRom);
    let sx = layout.subject.x.round() as i64;
    let sy = layout.subject.y.round() as i64;

    let mut temp = Vec::new();
    let mut stencil = alpha_stencil(canvas_size, &subject, sx, sy + WIDE_SHADOW_OFFSET);
    GaussianBlur::new(WIDE_SHADOW_KERNEL).apply(
        &mut stencil,
        canvas_size.width as usize,
        canvas_size.height as usize,
        1,
        &mut temp,
    );
    tint(&mut canvas, &stencil, color.darkened(0.25), WIDE_SHADOW_OPACITY);

    let mut stencil = alpha_stencil(canvas_size, &subject, sx, sy + NARROW_SHADOW_OFFSET);
    GaussianBlur::new(NARROW_SHADOW_KERNEL).apply(
        &mut stencil,
        canvas_size.width as usize,
        canvas_size.height as usize,
        1,
        &mut temp,
    );
    tint(&mut canvas, &stencil, color.saturated(0.6), NARROW_SHADOW_OPACITY);

    imageops::overlay(&mut canvas, &subject, sx, sy);

    draw_name(&mut canvas, &layout, color, &mut temp);
    seal_alpha(&mut canvas);
    Ok(canvas)
}

/// The card is drawn over an opaque gradient; `Rgba::blend` can round the
/// composite alpha down to 254, so pin it back to fully opaque.
fn seal_alpha(canvas: &mut RgbaImage) {
    for pixel in canvas.pixels_mut() {
        pixel.0[3] = 255;
    }
}

fn draw_name(canvas: &mut RgbaImage, layout: &PortraitLayout, color: Color, temp: &mut Vec<f32>) {
    let (nx, ny) = layout.name_origin;
    let scale = layout.text_scale;
    let size = layout.canvas;

    let mut glow = RgbaImage::new(size.width, size.height);
    draw_text(&mut glow, &layout.name, nx, ny, scale, Color::WHITE);
    let mut stencil: Vec<u8> = glow.pixels().map(|p| p.0[3]).collect();
    GaussianBlur::new(NAME_GLOW_KERNEL).apply(
        &mut stencil,
        size.width as usize,
        size.height as usize,
        1,
        temp,
    );
    tint(canvas, &stencil, color.lightened(0.3), NAME_GLOW_OPACITY);

    let offset = (scale as i64 / 2).max(2);
    draw_text(
        canvas,
        &layout.name,
        nx + offset,
        ny + offset,
        scale,
        Color::BLACK.with_alpha(NAME_SHADOW_OPACITY),
    );
    draw_text(canvas, &layout.name, nx, ny, scale, Color::WHITE);
}

/// Two-stop gradient from the top-left corner to the bottom-right one.
fn diagonal_gradient(size: FrameSize, from: Color, to: Color) -> RgbaImage {
    let w = (size.width.max(2) - 1) as f32;
    let h = (size.height.max(2) - 1) as f32;
    RgbaImage::from_fn(size.width, size.height, |x, y| {
        let t = (x as f32 / w + y as f32 / h) / 2.0;
        let mut c = from.lerp(&to, t);
        c.a = 255;
        c.to_rgba()
    })
}

/// Canvas-sized single-channel copy of `layer`'s alpha placed at (x, y).
fn alpha_stencil(size: FrameSize, layer: &RgbaImage, x: i64, y: i64) -> Vec<u8> {
    let mut out = vec![0u8; size.width as usize * size.height as usize];
    for (lx, ly, px) in layer.enumerate_pixels() {
        let cx = x + lx as i64;
        let cy = y + ly as i64;
        if cx < 0 || cy < 0 || cx >= size.width as i64 || cy >= size.height as i64 {
            continue;
        }
        out[cy as usize * size.width as usize + cx as usize] = px.0[3];
    }
    out
}

fn tint(canvas: &mut RgbaImage, stencil: &[u8], color: Color, opacity: f32) {
    let width = canvas.width() as usize;
    for (i, &a) in stencil.iter().enumerate() {
        if a == 0 {
            continue;
        }
        let x = (i % width) as i64;
        let y = (i / width) as i64;
        blend_pixel(canvas, x, y, color, a as f32 / 255.0 * opacity);
    }
}
