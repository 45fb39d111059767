use thiserror::Error;

/// Failures that reach the caller of an overlay or cutout operation.
///
/// Local detection failures never appear here: the live loop absorbs them
/// per cycle (see `live::detection_cycle::CycleResult`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("image has no decodable pixel data: {0}")]
    InvalidImage(String),
    #[error("person segmentation failed: {0}")]
    SegmentationFailed(String),
    #[error("compositing failed: {0}")]
    CompositingFailed(String),
    #[error("recognition request failed: {0}")]
    RecognitionTransportFailed(String),
    #[error("recognition response could not be decoded: {0}")]
    RecognitionDecodeFailed(String),
}
