use std::sync::Arc;

use image::RgbImage;

use super::app_state::PhotoResults;
use crate::detection::domain::face_detector::FaceDetector;
use crate::live::recognition_coordinator::DetectedFace;
use crate::recognition::domain::overlap_matcher::match_face;
use crate::recognition::domain::recognition_service::RecognitionService;
use crate::recognition::infrastructure::jpeg_frame_encoder::{
    encode_jpeg, RECOGNITION_JPEG_QUALITY,
};
use crate::shared::error::OverlayError;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Still-photo pipeline: detect → recognize once → reconcile.
///
/// Local detection is optional. Without a detector, or when it finds
/// nothing, the faces the service reports are used as the regions.
pub struct StillPhotoUseCase {
    detector: Option<Box<dyn FaceDetector>>,
    service: Arc<dyn RecognitionService>,
    jpeg_quality: u8,
}

impl StillPhotoUseCase {
    pub fn new(detector: Option<Box<dyn FaceDetector>>, service: Arc<dyn RecognitionService>) -> Self {
        Self {
            detector,
            service,
            jpeg_quality: RECOGNITION_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn execute(&mut self, image: RgbImage) -> Result<PhotoResults, OverlayError> {
        let frame = Frame::from_rgb_image(image, 0);
        let local = self.detect_locally(&frame);

        let jpeg = encode_jpeg(&frame, self.jpeg_quality)?;
        let response = self.service.recognize(&jpeg)?;
        log::info!(
            "Recognized {} of {} faces",
            response.matches.len(),
            response.faces.len()
        );

        let regions = if local.is_empty() { response.faces.clone() } else { local };
        let faces = regions
            .iter()
            .enumerate()
            .map(|(id, bounds)| DetectedFace {
                id,
                bounds: *bounds,
                identity: match_face(bounds, &response.matches),
            })
            .collect();

        let image = frame
            .to_rgb_image()
            .ok_or_else(|| OverlayError::InvalidImage("photo buffer lost its shape".into()))?;
        Ok(PhotoResults {
            image: Arc::new(image),
            faces,
            matches: response.matches,
        })
    }

    fn detect_locally(&mut self, frame: &Frame) -> Vec<FaceRegion> {
        let Some(detector) = self.detector.as_mut() else {
            return Vec::new();
        };
        match detector.detect(frame) {
            Ok(rects) => rects
                .iter()
                .map(|r| r.to_pixel_region(frame.size()))
                .filter(|r| !r.is_empty())
                .collect(),
            Err(e) => {
                log::warn!("Local face detection failed, using service faces: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::recognition_match::{
        IdentityDetails, RecognitionMatch, RecognitionResponse,
    };
    use crate::shared::color::Color;
    use crate::shared::region::NormalizedRect;
    use std::sync::Mutex;

    struct StubService {
        response: Result<RecognitionResponse, OverlayError>,
        uploads: Mutex<Vec<usize>>,
    }

    impl RecognitionService for StubService {
        fn recognize(&self, jpeg: &[u8]) -> Result<RecognitionResponse, OverlayError> {
            self.uploads.lock().unwrap().push(jpeg.len());
            self.response.clone()
        }

        fn details(&self, _identity_id: &str) -> Result<IdentityDetails, OverlayError> {
            Ok(IdentityDetails::default())
        }
    }

    struct StubDetector(Vec<NormalizedRect>);

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<NormalizedRect>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    fn grace(bounds: FaceRegion) -> RecognitionMatch {
        RecognitionMatch {
            identity_id: "grace".into(),
            display_name: "Grace Hopper".into(),
            confidence: 0.88,
            color: Color::from_hex("#FFE66D").unwrap(),
            face_index: Some(0),
            bounds,
            brief: Some("Computer scientist".into()),
        }
    }

    fn service(response: Result<RecognitionResponse, OverlayError>) -> Arc<StubService> {
        Arc::new(StubService {
            response,
            uploads: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_service_faces_used_without_detector() {
        let bounds = FaceRegion::new(10.0, 10.0, 20.0, 20.0);
        let svc = service(Ok(RecognitionResponse {
            faces: vec![bounds, FaceRegion::new(60.0, 10.0, 20.0, 20.0)],
            matches: vec![grace(bounds)],
        }));
        let mut use_case = StillPhotoUseCase::new(None, svc.clone());
        let results = use_case.execute(RgbImage::new(100, 50)).unwrap();

        assert_eq!(svc.uploads.lock().unwrap().len(), 1);
        assert_eq!(results.faces.len(), 2);
        assert_eq!(results.identified().count(), 1);
        assert_eq!(results.size().width, 100);
    }

    #[test]
    fn test_local_regions_reconciled_against_matches() {
        // Local box (bottom-left origin) maps to pixels (10, 10, 20, 20) on 100x50.
        let detector = StubDetector(vec![NormalizedRect::new(0.1, 0.4, 0.2, 0.4)]);
        let svc = service(Ok(RecognitionResponse {
            faces: vec![],
            matches: vec![grace(FaceRegion::new(12.0, 12.0, 20.0, 20.0))],
        }));
        let mut use_case = StillPhotoUseCase::new(Some(Box::new(detector)), svc);
        let results = use_case.execute(RgbImage::new(100, 50)).unwrap();

        assert_eq!(results.faces.len(), 1);
        assert_eq!(
            results.faces[0].identity.as_ref().map(|m| m.identity_id.as_str()),
            Some("grace")
        );
        let scene = results.scene(&Default::default());
        assert_eq!(scene.tap_targets.len(), 1);
        assert_eq!(scene.size, results.size());
    }

    #[test]
    fn test_recognition_failure_propagates() {
        let svc = service(Err(OverlayError::RecognitionTransportFailed("refused".into())));
        let mut use_case = StillPhotoUseCase::new(None, svc);
        let err = use_case.execute(RgbImage::new(10, 10)).unwrap_err();
        assert!(matches!(err, OverlayError::RecognitionTransportFailed(_)));
    }
}
