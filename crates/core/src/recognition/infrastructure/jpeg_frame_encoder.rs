use image::codecs::jpeg::JpegEncoder;

use crate::shared::error::OverlayError;
use crate::shared::frame::Frame;

/// Quality used for frames sent to the recognition service.
pub const RECOGNITION_JPEG_QUALITY: u8 = 80;

/// Encodes a frame as a baseline JPEG for upload.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, OverlayError> {
    let rgb = frame.to_rgb_image().ok_or_else(|| {
        OverlayError::InvalidImage(format!(
            "cannot encode {}x{} frame with {} channels",
            frame.width(),
            frame.height(),
            frame.channels()
        ))
    })?;

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| OverlayError::InvalidImage(e.to_string()))?;
    Ok(buf)
}
