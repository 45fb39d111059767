use super::recognition_match::RecognitionMatch;
use crate::shared::constants::OVERLAP_THRESHOLD;
use crate::shared::region::FaceRegion;

/// Returns the first match covering more than 30% of `face`.
///
/// Coverage is `intersection / face area`. Matches are tried in input
/// order and the first qualifying one wins, even if a later one overlaps
/// more. A degenerate face never matches.
pub fn match_face(face: &FaceRegion, matches: &[RecognitionMatch]) -> Option<RecognitionMatch> {
    matches
        .iter()
        .find(|m| face.overlap_ratio(&m.bounds) > OVERLAP_THRESHOLD)
        .cloned()
}
