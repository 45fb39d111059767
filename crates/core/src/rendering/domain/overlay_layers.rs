use std::sync::Arc;

use image::RgbaImage;

use super::bitmap_font::text_size;
use super::display_transform::DisplayTransform;
use crate::live::recognition_coordinator::DetectedFace;
use crate::shared::color::Color;
use crate::shared::frame::FrameSize;
use crate::shared::region::FaceRegion;

/// Visual constants for the overlay, in display pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    pub corner_radius: f64,
    pub stroke_width: f64,
    pub glow_width: f64,
    pub glow_opacity: f32,
    /// Space between the bottom of a box and the top of its label.
    pub label_gap: f64,
    pub label_padding_x: f64,
    pub label_padding_y: f64,
    pub label_text_scale: u32,
    pub unmatched_color: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            corner_radius: 12.0,
            stroke_width: 3.0,
            glow_width: 12.0,
            glow_opacity: 0.3,
            label_gap: 8.0,
            label_padding_x: 12.0,
            label_padding_y: 6.0,
            label_text_scale: 2,
            unmatched_color: Color::WHITE,
        }
    }
}

/// One drawable element, in display coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayLayer {
    /// Colored edge image stretched over `rect`.
    Silhouette {
        rect: FaceRegion,
        image: Arc<RgbaImage>,
    },
    /// Rounded border: a wide translucent glow under a solid stroke.
    FaceBox {
        rect: FaceRegion,
        color: Color,
        corner_radius: f64,
        stroke_width: f64,
        glow_width: f64,
        glow_opacity: f32,
    },
    /// Filled pill with the name centered inside.
    NamePill {
        rect: FaceRegion,
        text: String,
        fill: Color,
        text_color: Color,
        text_scale: u32,
    },
}

/// Invisible hit area bound to one identity.
#[derive(Clone, Debug, PartialEq)]
pub struct TapTarget {
    pub rect: FaceRegion,
    pub identity_id: String,
    pub display_name: String,
}

/// Layers in paint order plus the tap targets for one redraw.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayScene {
    pub size: FrameSize,
    pub layers: Vec<OverlayLayer>,
    pub tap_targets: Vec<TapTarget>,
}

impl OverlayScene {
    /// Topmost tap target containing the point.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&TapTarget> {
        self.tap_targets.iter().rev().find(|t| {
            x >= t.rect.x && x < t.rect.max_x() && y >= t.rect.y && y < t.rect.max_y()
        })
    }
}

/// Builds the overlay for one redraw.
///
/// `source` is the frame space the faces and silhouette were computed in,
/// `target` the display surface. A box is drawn for every face without an
/// identity, and for every face at all when there is no silhouette to
/// outline the identified ones. Identified faces always get a name pill and
/// a tap target covering box and pill.
pub fn build_overlay(
    faces: &[DetectedFace],
    silhouette: Option<&Arc<RgbaImage>>,
    source: FrameSize,
    target: FrameSize,
    style: &OverlayStyle,
) -> OverlayScene {
    let transform = DisplayTransform::aspect_fill(source, target);
    let mut scene = OverlayScene {
        size: target,
        ..OverlayScene::default()
    };

    if let Some(image) = silhouette {
        scene.layers.push(OverlayLayer::Silhouette {
            rect: transform.frame_rect(source),
            image: image.clone(),
        });
    }

    let mut pills = Vec::new();
    for face in faces {
        let rect = transform.apply_region(&face.bounds);
        let color = face
            .identity
            .as_ref()
            .map_or(style.unmatched_color, |m| m.color);

        if face.identity.is_none() || silhouette.is_none() {
            scene.layers.push(OverlayLayer::FaceBox {
                rect,
                color,
                corner_radius: style.corner_radius,
                stroke_width: style.stroke_width,
                glow_width: style.glow_width,
                glow_opacity: style.glow_opacity,
            });
        }

        if let Some(identity) = &face.identity {
            let pill = pill_rect(&rect, &identity.display_name, style);
            scene.tap_targets.push(TapTarget {
                rect: rect.union(&pill),
                identity_id: identity.identity_id.clone(),
                display_name: identity.display_name.clone(),
            });
            pills.push(OverlayLayer::NamePill {
                rect: pill,
                text: identity.display_name.clone(),
                fill: color,
                text_color: readable_text_color(color),
                text_scale: style.label_text_scale,
            });
        }
    }

    // Labels paint above every box so a neighbour's glow never covers a name.
    scene.layers.extend(pills);
    scene
}

fn pill_rect(face: &FaceRegion, text: &str, style: &OverlayStyle) -> FaceRegion {
    let (text_w, text_h) = text_size(text, style.label_text_scale);
    let width = text_w as f64 + 2.0 * style.label_padding_x;
    let height = text_h as f64 + 2.0 * style.label_padding_y;
    let (cx, _) = face.center();
    FaceRegion::new(cx - width / 2.0, face.max_y() + style.label_gap, width, height)
}

/// Black on light fills, white on dark ones.
pub fn readable_text_color(fill: Color) -> Color {
    let luma = 0.299 * fill.r as f32 + 0.587 * fill.g as f32 + 0.114 * fill.b as f32;
    if luma > 150.0 {
        Color::BLACK
    } else {
        Color::WHITE
    }
}
