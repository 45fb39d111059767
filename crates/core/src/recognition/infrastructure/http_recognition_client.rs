use std::time::Duration;

use serde::Deserialize;

use crate::recognition::domain::recognition_match::{
    IdentityDetails, MovieCredit, MusicCredit, RecognitionMatch, RecognitionResponse,
};
use crate::recognition::domain::recognition_service::RecognitionService;
use crate::shared::color::{palette_color, Color};
use crate::shared::constants::RECOGNITION_TIMEOUT;
use crate::shared::error::OverlayError;
use crate::shared::region::FaceRegion;

/// Talks to the identity service over HTTP.
///
/// `POST {base}/recognize` with a multipart `image` field,
/// `GET {base}/celebrity/{id}` for profiles and `GET {base}/` as a health
/// check.
pub struct HttpRecognitionClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpRecognitionClient {
    pub fn new(base_url: &str) -> Result<Self, OverlayError> {
        Self::with_timeout(base_url, RECOGNITION_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, OverlayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Succeeds when the service answers its root endpoint with 2xx.
    pub fn check_health(&self) -> Result<(), OverlayError> {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(transport_error)?;
        Ok(())
    }

    fn fetch_text(&self, request: reqwest::blocking::RequestBuilder) -> Result<String, OverlayError> {
        request
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(transport_error)
    }
}

impl RecognitionService for HttpRecognitionClient {
    fn recognize(&self, jpeg: &[u8]) -> Result<RecognitionResponse, OverlayError> {
        let part = reqwest::blocking::multipart::Part::bytes(jpeg.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(transport_error)?;
        let form = reqwest::blocking::multipart::Form::new().part("image", part);

        let started = std::time::Instant::now();
        let body = self.fetch_text(
            self.client
                .post(format!("{}/recognize", self.base_url))
                .multipart(form),
        )?;
        log::debug!(
            "Recognition round-trip took {:.0}ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        decode_response(&body)
    }

    fn details(&self, identity_id: &str) -> Result<IdentityDetails, OverlayError> {
        let body = self.fetch_text(
            self.client
                .get(format!("{}/celebrity/{identity_id}", self.base_url)),
        )?;
        decode_details(&body)
    }
}

fn transport_error(e: reqwest::Error) -> OverlayError {
    OverlayError::RecognitionTransportFailed(e.to_string())
}

fn decode_error(e: impl std::fmt::Display) -> OverlayError {
    OverlayError::RecognitionDecodeFailed(e.to_string())
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BoxDto {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl From<BoxDto> for FaceRegion {
    fn from(b: BoxDto) -> Self {
        FaceRegion::new(b.x, b.y, b.width, b.height)
    }
}

#[derive(Deserialize)]
struct FaceDto {
    #[serde(alias = "bounding_box")]
    bbox: BoxDto,
}

#[derive(Deserialize)]
struct MatchDto {
    #[serde(alias = "id")]
    celebrity_id: String,
    name: String,
    confidence: f32,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    face_index: Option<usize>,
    #[serde(alias = "bounding_box")]
    bbox: BoxDto,
    #[serde(default)]
    brief: Option<String>,
}

#[derive(Deserialize)]
struct ResponseDto {
    #[serde(default)]
    faces: Vec<FaceDto>,
    // The photo endpoint names the list `celebrities`.
    #[serde(default, alias = "celebrities")]
    matches: Vec<MatchDto>,
}

#[derive(Deserialize)]
struct MovieDto {
    title: String,
    year: i32,
    #[serde(default)]
    role: String,
}

#[derive(Deserialize)]
struct MusicDto {
    title: String,
    year: i32,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Deserialize)]
struct DetailsDto {
    id: String,
    name: String,
    #[serde(default)]
    date_of_birth: Option<String>,
    #[serde(default)]
    birthplace: Option<String>,
    #[serde(default)]
    profession: Vec<String>,
    #[serde(default)]
    biography: String,
    #[serde(default)]
    movies: Vec<MovieDto>,
    #[serde(default)]
    music: Vec<MusicDto>,
    #[serde(default)]
    awards: Vec<String>,
    #[serde(default)]
    image_url: Option<String>,
}

/// Parses a `/recognize` body.
///
/// Matches without a color take the palette entry for their position.
/// A color that is present but not `#RRGGBB` rejects the whole body.
pub fn decode_response(body: &str) -> Result<RecognitionResponse, OverlayError> {
    let dto: ResponseDto = serde_json::from_str(body).map_err(decode_error)?;

    let matches = dto
        .matches
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let color = match m.color.as_deref() {
                Some(hex) => Color::from_hex(hex)
                    .ok_or_else(|| decode_error(format!("invalid color {hex:?} for {}", m.name)))?,
                None => palette_color(i),
            };
            Ok(RecognitionMatch {
                identity_id: m.celebrity_id,
                display_name: m.name,
                confidence: m.confidence.clamp(0.0, 1.0),
                color,
                face_index: m.face_index,
                bounds: m.bbox.into(),
                brief: m.brief,
            })
        })
        .collect::<Result<Vec<_>, OverlayError>>()?;

    Ok(RecognitionResponse {
        faces: dto.faces.into_iter().map(|f| f.bbox.into()).collect(),
        matches,
    })
}

/// Parses a `/celebrity/{id}` body.
pub fn decode_details(body: &str) -> Result<IdentityDetails, OverlayError> {
    let dto: DetailsDto = serde_json::from_str(body).map_err(decode_error)?;
    Ok(IdentityDetails {
        id: dto.id,
        name: dto.name,
        date_of_birth: dto.date_of_birth,
        birthplace: dto.birthplace,
        profession: dto.profession,
        biography: dto.biography,
        movies: dto
            .movies
            .into_iter()
            .map(|m| MovieCredit {
                title: m.title,
                year: m.year,
                role: m.role,
            })
            .collect(),
        music: dto
            .music
            .into_iter()
            .map(|m| MusicCredit {
                title: m.title,
                year: m.year,
                kind: m.kind,
            })
            .collect(),
        awards: dto.awards,
        image_url: dto.image_url,
    })
}
