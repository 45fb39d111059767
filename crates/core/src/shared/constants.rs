use std::time::Duration;

/// Minimum spacing between frames admitted for detection (~10 Hz).
pub const DEFAULT_PROCESS_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum spacing between frames admitted for redraw (~30 Hz).
pub const DEFAULT_DISPLAY_INTERVAL: Duration = Duration::from_millis(33);

/// Minimum spacing between remote recognition calls.
pub const DEFAULT_RECOGNITION_INTERVAL: Duration = Duration::from_secs(1);

/// Remote inference is slow; anything shorter cuts off legitimate responses.
pub const RECOGNITION_TIMEOUT: Duration = Duration::from_secs(30);

/// A face takes a match's identity when more than this share of the face is covered.
pub const OVERLAP_THRESHOLD: f64 = 0.30;

/// Mask probability (8-bit) at which a pixel counts as person.
pub const MASK_PRESENCE_THRESHOLD: u8 = 50;

/// Neighbour difference (8-bit) above which a person pixel is on the boundary.
pub const MASK_EDGE_CONTRAST: u8 = 50;

pub const CUTOUT_CANVAS_WIDTH: u32 = 1080;
pub const CUTOUT_CANVAS_HEIGHT: u32 = 1350;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

pub const FACE_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const SEGMENTATION_MODEL_NAME: &str = "person_segmentation.onnx";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
