use crate::shared::color::Color;
use crate::shared::region::FaceRegion;

/// One identity the remote service found in a submitted frame.
///
/// `bounds` is in the pixel space of the submitted image, which is the
/// frame the local detector saw, so it can be compared with local faces
/// directly.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognitionMatch {
    pub identity_id: String,
    pub display_name: String,
    pub confidence: f32,
    pub color: Color,
    pub face_index: Option<usize>,
    pub bounds: FaceRegion,
    /// Short description (e.g. top professions), when the service has one.
    pub brief: Option<String>,
}

/// Result of one recognition round-trip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecognitionResponse {
    /// Every face the service located, identified or not.
    pub faces: Vec<FaceRegion>,
    pub matches: Vec<RecognitionMatch>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovieCredit {
    pub title: String,
    pub year: i32,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MusicCredit {
    pub title: String,
    pub year: i32,
    pub kind: String,
}

/// Full profile for one identity, fetched on demand when a face is tapped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityDetails {
    pub id: String,
    pub name: String,
    pub date_of_birth: Option<String>,
    pub birthplace: Option<String>,
    pub profession: Vec<String>,
    pub biography: String,
    pub movies: Vec<MovieCredit>,
    pub music: Vec<MusicCredit>,
    pub awards: Vec<String>,
    pub image_url: Option<String>,
}

impl IdentityDetails {
    /// One-line summary: name plus up to two professions.
    pub fn headline(&self) -> String {
        let professions: Vec<&str> = self.profession.iter().take(2).map(String::as_str).collect();
        if professions.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, professions.join(", "))
        }
    }
}
