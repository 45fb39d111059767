use super::recognition_match::{IdentityDetails, RecognitionResponse};
use crate::shared::error::OverlayError;

/// Domain interface for the remote identity service.
///
/// Calls block for up to the service timeout and are made from worker
/// threads, hence `Send + Sync`.
pub trait RecognitionService: Send + Sync {
    /// Identifies the faces in one JPEG-encoded image.
    fn recognize(&self, jpeg: &[u8]) -> Result<RecognitionResponse, OverlayError>;

    /// Fetches the profile behind an identity id.
    fn details(&self, identity_id: &str) -> Result<IdentityDetails, OverlayError>;
}
