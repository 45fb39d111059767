use image::imageops::{self, FilterType};
use image::{Pixel, RgbaImage};

use crate::rendering::domain::bitmap_font::{for_each_text_pixel, text_size};
use crate::rendering::domain::display_transform::DisplayTransform;
use crate::rendering::domain::overlay_layers::{OverlayLayer, OverlayScene};
use crate::shared::color::Color;
use crate::shared::error::OverlayError;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Paints the scene onto a transparent canvas of `scene.size`.
pub fn render_scene(scene: &OverlayScene) -> RgbaImage {
    let mut canvas = RgbaImage::new(scene.size.width, scene.size.height);
    paint_scene(&mut canvas, scene);
    canvas
}

/// Aspect-fills `frame` into the scene's size and paints the overlay on top.
pub fn compose_display(frame: &Frame, scene: &OverlayScene) -> Result<RgbaImage, OverlayError> {
    let rgb = frame.to_rgb_image().ok_or_else(|| {
        OverlayError::InvalidImage(format!(
            "frame {} is not a {}x{} RGB buffer",
            frame.index(),
            frame.width(),
            frame.height()
        ))
    })?;
    let mut canvas = RgbaImage::new(scene.size.width, scene.size.height);
    let transform = DisplayTransform::aspect_fill(frame.size(), scene.size);
    let rect = transform.frame_rect(frame.size());
    let rgba = image::DynamicImage::ImageRgb8(rgb).to_rgba8();
    place_stretched(&mut canvas, &rgba, &rect);
    paint_scene(&mut canvas, scene);
    Ok(canvas)
}

pub fn paint_scene(canvas: &mut RgbaImage, scene: &OverlayScene) {
    for layer in &scene.layers {
        match layer {
            OverlayLayer::Silhouette { rect, image } => place_stretched(canvas, image, rect),
            OverlayLayer::FaceBox {
                rect,
                color,
                corner_radius,
                stroke_width,
                glow_width,
                glow_opacity,
            } => {
                if *glow_width > 0.0 && *glow_opacity > 0.0 {
                    glow_rounded_rect(canvas, rect, *corner_radius, *glow_width, *color, *glow_opacity);
                }
                stroke_rounded_rect(canvas, rect, *corner_radius, *stroke_width, *color);
            }
            OverlayLayer::NamePill {
                rect,
                text,
                fill,
                text_color,
                text_scale,
            } => {
                fill_rounded_rect(canvas, rect, rect.height / 2.0, *fill);
                let (tw, th) = text_size(text, *text_scale);
                let (cx, cy) = rect.center();
                let x = (cx - tw as f64 / 2.0).round() as i64;
                let y = (cy - th as f64 / 2.0).round() as i64;
                draw_text(canvas, text, x, y, *text_scale, *text_color);
            }
        }
    }
}

/// Scales `image` to cover `rect` and alpha-composites it there.
fn place_stretched(canvas: &mut RgbaImage, image: &RgbaImage, rect: &FaceRegion) {
    let width = rect.width.round().max(0.0) as u32;
    let height = rect.height.round().max(0.0) as u32;
    if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
        return;
    }
    let x = rect.x.round() as i64;
    let y = rect.y.round() as i64;
    if (width, height) == image.dimensions() {
        imageops::overlay(canvas, image, x, y);
    } else {
        let resized = imageops::resize(image, width, height, FilterType::Triangle);
        imageops::overlay(canvas, &resized, x, y);
    }
}

/// Source-over blend of `color` at `coverage` into one pixel; ignores
/// coordinates outside the canvas.
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Color, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = color.a as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let src = color.with_alpha(alpha).to_rgba();
    canvas.get_pixel_mut(x as u32, y as u32).blend(&src);
}

/// Signed distance from a point to a rounded rectangle: negative inside.
fn rounded_rect_distance(px: f64, py: f64, rect: &FaceRegion, radius: f64) -> f64 {
    let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    let (cx, cy) = rect.center();
    let qx = (px - cx).abs() - (rect.width / 2.0 - radius);
    let qy = (py - cy).abs() - (rect.height / 2.0 - radius);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    outside + inside - radius
}

/// Visits every pixel within `pad` of `rect` with its center's signed distance.
fn for_each_near(
    canvas: &mut RgbaImage,
    rect: &FaceRegion,
    radius: f64,
    pad: f64,
    mut visit: impl FnMut(&mut RgbaImage, i64, i64, f64),
) {
    let x0 = ((rect.x - pad).floor() as i64).max(0);
    let y0 = ((rect.y - pad).floor() as i64).max(0);
    let x1 = ((rect.max_x() + pad).ceil() as i64).min(canvas.width() as i64);
    let y1 = ((rect.max_y() + pad).ceil() as i64).min(canvas.height() as i64);
    for y in y0..y1 {
        for x in x0..x1 {
            let d = rounded_rect_distance(x as f64 + 0.5, y as f64 + 0.5, rect, radius);
            visit(canvas, x, y, d);
        }
    }
}

fn stroke_rounded_rect(
    canvas: &mut RgbaImage,
    rect: &FaceRegion,
    radius: f64,
    width: f64,
    color: Color,
) {
    let half = width / 2.0;
    for_each_near(canvas, rect, radius, half + 1.0, |canvas, x, y, d| {
        let coverage = (half + 0.5 - d.abs()).clamp(0.0, 1.0) as f32;
        blend_pixel(canvas, x, y, color, coverage);
    });
}

/// Soft band centered on the border, fading linearly to nothing at
/// `width / 2` from it.
fn glow_rounded_rect(
    canvas: &mut RgbaImage,
    rect: &FaceRegion,
    radius: f64,
    width: f64,
    color: Color,
    opacity: f32,
) {
    let half = width / 2.0;
    for_each_near(canvas, rect, radius, half + 1.0, |canvas, x, y, d| {
        let falloff = (1.0 - d.abs() / half).clamp(0.0, 1.0) as f32;
        blend_pixel(canvas, x, y, color, falloff * opacity);
    });
}

fn fill_rounded_rect(canvas: &mut RgbaImage, rect: &FaceRegion, radius: f64, color: Color) {
    for_each_near(canvas, rect, radius, 1.0, |canvas, x, y, d| {
        let coverage = (0.5 - d).clamp(0.0, 1.0) as f32;
        blend_pixel(canvas, x, y, color, coverage);
    });
}

pub(crate) fn draw_text(canvas: &mut RgbaImage, text: &str, x: i64, y: i64, scale: u32, color: Color) {
    for_each_text_pixel(text, scale, |dx, dy| {
        blend_pixel(canvas, x + dx as i64, y + dy as i64, color, 1.0);
    });
}
