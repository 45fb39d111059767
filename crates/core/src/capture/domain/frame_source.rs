use std::ops::ControlFlow;

use crate::shared::frame::Frame;

/// Static properties of a frame source, known once it is open.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Native frame rate, 0 when the container does not declare one.
    pub fps: f64,
    pub description: String,
}

/// Push-based camera stand-in.
///
/// `stream` blocks, handing every frame to `on_frame` at the source's own
/// pace until the source ends or the callback breaks. A source that stalls
/// simply stops calling back.
pub trait FrameSource: Send {
    fn info(&self) -> &SourceInfo;

    fn stream(
        &mut self,
        on_frame: &mut dyn FnMut(Frame) -> ControlFlow<()>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
