use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};

use super::onnx_session::open_session;
use crate::detection::domain::person_segmenter::{PersonSegmenter, SegmentationQuality};
use crate::masking::domain::segmentation_mask::{RowOrder, SegmentationMask};
use crate::shared::frame::{Frame, FrameSize};

/// Input resolution of the bundled selfie-segmentation model.
pub const DEFAULT_INPUT_SIZE: u32 = 256;

/// Memory layout of the model's image input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, 3, H, W]`
    Nchw,
    /// `[1, H, W, 3]`
    Nhwc,
}

/// Person segmentation on ONNX Runtime.
///
/// Expects a single image input in `[0, 1]` and a single output holding one
/// (sigmoid) or two (background/person) channels per pixel. Realtime mode
/// returns the mask at model resolution; best mode upsamples the
/// probabilities to frame resolution before quantizing, which keeps
/// boundaries smooth on large stills.
pub struct OnnxPersonSegmenter {
    session: ort::session::Session,
    input_size: u32,
    layout: TensorLayout,
}

impl OnnxPersonSegmenter {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_input(model_path, DEFAULT_INPUT_SIZE, TensorLayout::Nhwc)
    }

    pub fn with_input(
        model_path: &Path,
        input_size: u32,
        layout: TensorLayout,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
            input_size,
            layout,
        })
    }
}

impl PersonSegmenter for OnnxPersonSegmenter {
    fn segment(
        &mut self,
        frame: &Frame,
        quality: SegmentationQuality,
    ) -> Result<SegmentationMask, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err("cannot segment an empty frame".into());
        }

        let input = preprocess(frame, self.input_size, self.layout);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("segmentation model produced no outputs".into());
        }

        let output = outputs[0].try_extract_array::<f32>()?;
        let shape = output.shape().to_vec();
        let values: Vec<f32> = output.iter().copied().collect();
        let probabilities = person_probabilities(&shape, &values)?;

        let size = self.input_size;
        match quality {
            SegmentationQuality::Realtime => Ok(SegmentationMask::new(
                quantize(&probabilities),
                size,
                size,
                RowOrder::TopDown,
            )),
            SegmentationQuality::Best => {
                let target = frame.size();
                let upsampled = upsample(probabilities, size, target);
                Ok(SegmentationMask::new(
                    quantize(&upsampled),
                    target.width,
                    target.height,
                    RowOrder::TopDown,
                ))
            }
        }
    }
}

/// Resizes to `size × size` (nearest) and normalizes to [0,1] float32.
fn preprocess(frame: &Frame, size: u32, layout: TensorLayout) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = match layout {
        TensorLayout::Nchw => ndarray::Array4::<f32>::zeros((1, 3, s, s)),
        TensorLayout::Nhwc => ndarray::Array4::<f32>::zeros((1, s, s, 3)),
    };
    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                let value = src[[src_y, src_x, c]] as f32 / 255.0;
                match layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                }
            }
        }
    }
    tensor
}

/// Extracts the person channel as probabilities in `[0, 1]`.
///
/// Accepts `[1, H, W]`, `[1, H, W, C]` and `[1, C, H, W]` with `C` of 1 or 2.
/// Values outside `[0, 1]` are treated as logits.
fn person_probabilities(shape: &[usize], values: &[f32]) -> Result<Vec<f32>, String> {
    let (h, w, channels, channels_last) = match *shape {
        [1, h, w] => (h, w, 1, true),
        [1, h, w, c] if c <= 2 => (h, w, c, true),
        [1, c, h, w] if c <= 2 => (h, w, c, false),
        _ => return Err(format!("unsupported segmentation output shape {shape:?}")),
    };
    if values.len() != h * w * channels {
        return Err(format!(
            "segmentation output has {} values, expected {}",
            values.len(),
            h * w * channels
        ));
    }

    // Person is the last channel.
    let person = channels - 1;
    let raw: Vec<f32> = (0..h * w)
        .map(|i| {
            if channels_last {
                values[i * channels + person]
            } else {
                values[person * h * w + i]
            }
        })
        .collect();

    let are_logits = raw.iter().any(|&v| !(0.0..=1.0).contains(&v));
    Ok(if are_logits {
        raw.into_iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect()
    } else {
        raw
    })
}

fn quantize(probabilities: &[f32]) -> Vec<u8> {
    probabilities
        .iter()
        .map(|&p| (p * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Triangle-filter resample of a square probability map to `target`.
fn upsample(probabilities: Vec<f32>, size: u32, target: FrameSize) -> Vec<f32> {
    let len = (target.width as usize) * (target.height as usize);
    match ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(size, size, probabilities) {
        Some(map) if !target.is_empty() && size > 0 => {
            imageops::resize(&map, target.width, target.height, FilterType::Triangle).into_raw()
        }
        _ => vec![0.0; len],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_preprocess_layouts() {
        let mut data = vec![0u8; 4 * 4 * 3];
        data[0] = 255; // top-left red
        let frame = Frame::new(data, 4, 4, 3, 0);

        let nhwc = preprocess(&frame, 4, TensorLayout::Nhwc);
        assert_eq!(nhwc.shape(), &[1, 4, 4, 3]);
        assert_relative_eq!(nhwc[[0, 0, 0, 0]], 1.0);

        let nchw = preprocess(&frame, 4, TensorLayout::Nchw);
        assert_eq!(nchw.shape(), &[1, 3, 4, 4]);
        assert_relative_eq!(nchw[[0, 0, 0, 0]], 1.0);
        assert_relative_eq!(nchw[[0, 1, 0, 0]], 0.0);
    }

    #[test]
    fn test_probabilities_single_channel_passthrough() {
        let probs = person_probabilities(&[1, 2, 2, 1], &[0.0, 0.5, 1.0, 0.25]).unwrap();
        assert_eq!(probs, vec![0.0, 0.5, 1.0, 0.25]);
    }

    #[test]
    fn test_probabilities_two_channel_takes_person() {
        // Channels-first: a 3x3 background plane, then the person plane.
        let mut values = vec![0.8; 9];
        values.extend([0.2; 9]);
        values[9] = 0.7;
        let probs = person_probabilities(&[1, 2, 3, 3], &values).unwrap();
        assert_eq!(probs.len(), 9);
        assert_eq!(probs[0], 0.7);
        assert_eq!(probs[8], 0.2);

        // Channels-last: interleaved (background, person) pairs.
        let probs = person_probabilities(&[1, 1, 2, 2], &[0.9, 0.1, 0.3, 0.6]).unwrap();
        assert_eq!(probs, vec![0.1, 0.6]);
    }

    #[test]
    fn test_probabilities_logits_are_squashed() {
        let probs = person_probabilities(&[1, 1, 2], &[-8.0, 8.0]).unwrap();
        assert!(probs[0] < 0.01);
        assert!(probs[1] > 0.99);
    }

    #[test]
    fn test_probabilities_reject_bad_shapes() {
        assert!(person_probabilities(&[1, 4, 4, 3], &[0.0; 48]).is_err());
        assert!(person_probabilities(&[1, 2, 2], &[0.0; 3]).is_err());
    }

    #[test]
    fn test_quantize_bounds() {
        assert_eq!(quantize(&[0.0, 0.5, 1.0, 1.5]), vec![0, 128, 255, 255]);
    }

    #[test]
    fn test_upsample_preserves_uniform() {
        let out = upsample(vec![0.5; 4], 2, FrameSize::new(7, 5));
        assert_eq!(out.len(), 35);
        assert!(out.iter().all(|&v| (v - 0.5).abs() < 1e-5));
    }

    #[test]
    fn test_upsample_short_buffer_yields_zeros() {
        let out = upsample(vec![1.0; 3], 2, FrameSize::new(4, 4));
        assert_eq!(out, vec![0.0; 16]);
    }
}
