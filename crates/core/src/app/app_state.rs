use std::fmt;
use std::sync::Arc;

use image::{RgbImage, RgbaImage};

use crate::live::recognition_coordinator::DetectedFace;
use crate::recognition::domain::recognition_match::RecognitionMatch;
use crate::rendering::domain::overlay_layers::{build_overlay, OverlayScene, OverlayStyle};
use crate::shared::error::OverlayError;
use crate::shared::frame::FrameSize;

/// Outcome of recognizing one still photo.
#[derive(Clone, Debug)]
pub struct PhotoResults {
    pub image: Arc<RgbImage>,
    pub faces: Vec<DetectedFace>,
    pub matches: Vec<RecognitionMatch>,
}

impl PhotoResults {
    pub fn size(&self) -> FrameSize {
        let (w, h) = self.image.dimensions();
        FrameSize::new(w, h)
    }

    /// Full overlay at the photo's own size.
    pub fn scene(&self, style: &OverlayStyle) -> OverlayScene {
        let size = self.size();
        build_overlay(&self.faces, None, size, size, style)
    }

    pub fn identified(&self) -> impl Iterator<Item = (&DetectedFace, &RecognitionMatch)> {
        self.faces
            .iter()
            .filter_map(|f| f.identity.as_ref().map(|m| (f, m)))
    }
}

/// A finished cutout, shown on top of the results it came from.
#[derive(Clone, Debug)]
pub struct CutoutView {
    pub results: PhotoResults,
    pub identity_id: String,
    pub cutout: Arc<RgbaImage>,
    pub presentation: Arc<RgbaImage>,
}

#[derive(Clone, Debug)]
pub enum AppState {
    Idle,
    Capturing,
    Processing,
    Results(PhotoResults),
    LiveMode,
    CutoutPresentation(CutoutView),
    Error(String),
}

/// User actions and pipeline completions that move the app along.
#[derive(Debug)]
pub enum AppEvent {
    StartCapture,
    PhotoCaptured,
    ProcessingFinished(Result<PhotoResults, OverlayError>),
    StartLive,
    StopLive,
    CutoutFinished(Result<CutoutView, OverlayError>),
    Dismiss,
}

impl AppState {
    /// Applies `event`. Events that make no sense in the current state leave
    /// it unchanged.
    pub fn transition(self, event: AppEvent) -> AppState {
        use AppEvent as E;
        use AppState as S;

        match (self, event) {
            (S::Idle, E::StartCapture) => S::Capturing,
            (S::Idle, E::StartLive) => S::LiveMode,
            (S::Capturing, E::PhotoCaptured) => S::Processing,
            (S::Capturing, E::Dismiss) => S::Idle,
            (S::Processing, E::ProcessingFinished(Ok(results))) => S::Results(results),
            (S::Processing, E::ProcessingFinished(Err(e))) => S::Error(e.to_string()),
            (S::Results(_), E::CutoutFinished(Ok(view))) => S::CutoutPresentation(view),
            (S::Results(results), E::CutoutFinished(Err(e))) => {
                // Only the cutout action failed; the results stay on screen.
                log::warn!("Cutout failed: {e}");
                S::Results(results)
            }
            (S::Results(_), E::Dismiss) => S::Idle,
            (S::CutoutPresentation(view), E::Dismiss) => S::Results(view.results),
            (S::LiveMode, E::StopLive) => S::Idle,
            (S::Error(_), E::Dismiss) => S::Idle,
            (state, event) => {
                log::debug!("Ignoring {} in state {state}", event_name(&event));
                state
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        match self {
            AppState::Capturing | AppState::Processing => true,
            AppState::Idle
            | AppState::Results(_)
            | AppState::LiveMode
            | AppState::CutoutPresentation(_)
            | AppState::Error(_) => false,
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Idle => write!(f, "idle"),
            AppState::Capturing => write!(f, "capturing"),
            AppState::Processing => write!(f, "processing"),
            AppState::Results(r) => write!(f, "results ({} faces)", r.faces.len()),
            AppState::LiveMode => write!(f, "live"),
            AppState::CutoutPresentation(v) => write!(f, "cutout of {}", v.identity_id),
            AppState::Error(message) => write!(f, "error: {message}"),
        }
    }
}

fn event_name(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::StartCapture => "StartCapture",
        AppEvent::PhotoCaptured => "PhotoCaptured",
        AppEvent::ProcessingFinished(_) => "ProcessingFinished",
        AppEvent::StartLive => "StartLive",
        AppEvent::StopLive => "StopLive",
        AppEvent::CutoutFinished(_) => "CutoutFinished",
        AppEvent::Dismiss => "Dismiss",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> PhotoResults {
        PhotoResults {
            image: Arc::new(RgbImage::new(4, 4)),
            faces: vec![],
            matches: vec![],
        }
    }

    fn view() -> CutoutView {
        CutoutView {
            results: results(),
            identity_id: "ada".into(),
            cutout: Arc::new(RgbaImage::new(1, 1)),
            presentation: Arc::new(RgbaImage::new(1, 1)),
        }
    }

    #[test]
    fn test_photo_flow() {
        let state = AppState::Idle
            .transition(AppEvent::StartCapture)
            .transition(AppEvent::PhotoCaptured);
        assert!(matches!(state, AppState::Processing));
        assert!(state.is_busy());

        let state = state.transition(AppEvent::ProcessingFinished(Ok(results())));
        assert!(matches!(state, AppState::Results(_)));
        assert!(!state.is_busy());
    }

    #[test]
    fn test_processing_error_then_dismiss() {
        let state = AppState::Processing.transition(AppEvent::ProcessingFinished(Err(
            OverlayError::RecognitionTransportFailed("connection refused".into()),
        )));
        assert!(matches!(&state, AppState::Error(m) if m.contains("connection refused")));
        assert!(matches!(state.transition(AppEvent::Dismiss), AppState::Idle));
    }

    #[test]
    fn test_cutout_failure_keeps_results() {
        let state = AppState::Results(results()).transition(AppEvent::CutoutFinished(Err(
            OverlayError::CompositingFailed("empty".into()),
        )));
        assert!(matches!(state, AppState::Results(_)));
    }

    #[test]
    fn test_cutout_dismiss_returns_to_results() {
        let state = AppState::Results(results())
            .transition(AppEvent::CutoutFinished(Ok(view())));
        assert!(matches!(&state, AppState::CutoutPresentation(v) if v.identity_id == "ada"));
        assert!(matches!(state.transition(AppEvent::Dismiss), AppState::Results(_)));
    }

    #[test]
    fn test_live_mode_round_trip() {
        let state = AppState::Idle.transition(AppEvent::StartLive);
        assert!(matches!(state, AppState::LiveMode));
        assert!(matches!(state.transition(AppEvent::StopLive), AppState::Idle));
    }

    #[test]
    fn test_unexpected_event_is_ignored() {
        assert!(matches!(
            AppState::LiveMode.transition(AppEvent::PhotoCaptured),
            AppState::LiveMode
        ));
        assert!(matches!(
            AppState::Idle.transition(AppEvent::ProcessingFinished(Ok(results()))),
            AppState::Idle
        ));
    }

    #[test]
    fn test_display_names_state() {
        assert_eq!(AppState::Error("boom".into()).to_string(), "error: boom");
        assert_eq!(AppState::Results(results()).to_string(), "results (0 faces)");
    }
}
