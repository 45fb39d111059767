use crate::rendering::domain::bitmap_font::text_size;
use crate::shared::constants::{CUTOUT_CANVAS_HEIGHT, CUTOUT_CANVAS_WIDTH};
use crate::shared::frame::FrameSize;
use crate::shared::region::FaceRegion;

/// Share of the canvas height reserved for the name at the bottom.
const NAME_BAND: f64 = 0.18;
const SIDE_MARGIN: f64 = 0.06;
const TOP_MARGIN: f64 = 0.05;
const MAX_TEXT_SCALE: u32 = 12;
const MIN_TEXT_SCALE: u32 = 2;

/// Placement of the subject and the name on the portrait card.
#[derive(Clone, Debug, PartialEq)]
pub struct PortraitLayout {
    pub canvas: FrameSize,
    /// Where the cutout is drawn, already scaled.
    pub subject: FaceRegion,
    /// Uppercased name as drawn.
    pub name: String,
    pub text_scale: u32,
    /// Top-left corner of the name text.
    pub name_origin: (i64, i64),
}

impl PortraitLayout {
    /// Fits a cutout of `cutout` size and the name into the fixed card.
    ///
    /// The subject is scaled to fill the area above the name band (up or
    /// down) and centered in it. The name is scaled to the largest integer
    /// font size that fits the card width.
    pub fn compute(cutout: FrameSize, display_name: &str) -> Self {
        Self::compute_on(
            FrameSize::new(CUTOUT_CANVAS_WIDTH, CUTOUT_CANVAS_HEIGHT),
            cutout,
            display_name,
        )
    }

    pub fn compute_on(canvas: FrameSize, cutout: FrameSize, display_name: &str) -> Self {
        let cw = canvas.width as f64;
        let ch = canvas.height as f64;

        let area_x = cw * SIDE_MARGIN;
        let area_y = ch * TOP_MARGIN;
        let area_w = cw - 2.0 * area_x;
        let area_h = ch * (1.0 - NAME_BAND) - area_y;

        let subject = if cutout.is_empty() {
            FaceRegion::new(cw / 2.0, area_y + area_h / 2.0, 0.0, 0.0)
        } else {
            let scale = (area_w / cutout.width as f64).min(area_h / cutout.height as f64);
            let w = cutout.width as f64 * scale;
            let h = cutout.height as f64 * scale;
            FaceRegion::new(area_x + (area_w - w) / 2.0, area_y + (area_h - h) / 2.0, w, h)
        };

        let name = display_name.trim().to_uppercase();
        let (unit_w, _) = text_size(&name, 1);
        let text_scale = if unit_w == 0 {
            MIN_TEXT_SCALE
        } else {
            ((area_w / unit_w as f64).floor() as u32).clamp(MIN_TEXT_SCALE, MAX_TEXT_SCALE)
        };
        let (tw, th) = text_size(&name, text_scale);
        let band_top = ch * (1.0 - NAME_BAND);
        let band_h = ch * NAME_BAND;
        let name_origin = (
            ((cw - tw as f64) / 2.0).round() as i64,
            (band_top + (band_h - th as f64) / 2.0).round() as i64,
        );

        Self {
            canvas,
            subject,
            name,
            text_scale,
            name_origin,
        }
    }
}
