use std::time::Duration;

use crate::recognition::domain::overlap_matcher::match_face;
use crate::recognition::domain::recognition_match::{RecognitionMatch, RecognitionResponse};
use crate::shared::error::OverlayError;
use crate::shared::region::FaceRegion;

/// A locally detected face, with the identity it currently overlaps.
///
/// Rebuilt on every detection cycle and after every recognition response.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    /// Position in the cycle's detection order.
    pub id: usize,
    pub bounds: FaceRegion,
    pub identity: Option<RecognitionMatch>,
}

/// What the overlay should say about the remote service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RecognitionStatus {
    #[default]
    Idle,
    InFlight,
    /// The last call failed; cleared when the next one starts.
    Failed(String),
}

/// Interval-gated remote recognition with stale-but-displayed results.
///
/// At most one call is in flight. A successful response replaces the
/// known matches wholesale; a failure keeps them. Detections arriving
/// while a call is in flight are reconciled against the old matches and
/// never queue another call.
#[derive(Debug)]
pub struct RecognitionCoordinator {
    interval: Duration,
    last_call: Option<Duration>,
    in_flight: bool,
    last_known_matches: Vec<RecognitionMatch>,
    status: RecognitionStatus,
    calls_started: usize,
}

impl RecognitionCoordinator {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: None,
            in_flight: false,
            last_known_matches: Vec::new(),
            status: RecognitionStatus::Idle,
            calls_started: 0,
        }
    }

    pub fn last_known_matches(&self) -> &[RecognitionMatch] {
        &self.last_known_matches
    }

    pub fn status(&self) -> &RecognitionStatus {
        &self.status
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn calls_started(&self) -> usize {
        self.calls_started
    }

    /// A `now` earlier than the last call means the source restarted; the
    /// gate re-arms like the frame admission gate does.
    pub fn should_request(&self, now: Duration, face_count: usize) -> bool {
        if self.in_flight || face_count == 0 {
            return false;
        }
        match self.last_call {
            None => true,
            Some(last) if now < last => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// Starts a call if one is due. Returns whether the caller should
    /// actually send the request.
    pub fn try_begin(&mut self, now: Duration, face_count: usize) -> bool {
        if !self.should_request(now, face_count) {
            return false;
        }
        self.in_flight = true;
        self.last_call = Some(now);
        self.calls_started += 1;
        self.status = RecognitionStatus::InFlight;
        true
    }

    /// Applies a finished call. Returns `true` when the known matches changed.
    pub fn complete(&mut self, result: Result<RecognitionResponse, OverlayError>) -> bool {
        self.in_flight = false;
        match result {
            Ok(response) => {
                log::debug!("Recognition returned {} matches", response.matches.len());
                self.last_known_matches = response.matches;
                self.status = RecognitionStatus::Idle;
                true
            }
            Err(e) => {
                log::warn!("Recognition failed, keeping previous matches: {e}");
                self.status = RecognitionStatus::Failed(e.to_string());
                false
            }
        }
    }

    /// Pairs each region with the first known match that covers it.
    pub fn reconcile(&self, regions: &[FaceRegion]) -> Vec<DetectedFace> {
        regions
            .iter()
            .enumerate()
            .map(|(id, bounds)| DetectedFace {
                id,
                bounds: *bounds,
                identity: match_face(bounds, &self.last_known_matches),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::color::Color;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn identity(id: &str, bounds: FaceRegion) -> RecognitionMatch {
        RecognitionMatch {
            identity_id: id.to_string(),
            display_name: id.to_string(),
            confidence: 0.8,
            color: Color::WHITE,
            face_index: Some(0),
            bounds,
            brief: None,
        }
    }

    fn response(matches: Vec<RecognitionMatch>) -> RecognitionResponse {
        RecognitionResponse {
            faces: matches.iter().map(|m| m.bounds).collect(),
            matches,
        }
    }

    #[test]
    fn test_no_faces_no_request() {
        let coordinator = RecognitionCoordinator::new(ms(1000));
        assert!(!coordinator.should_request(ms(0), 0));
        assert!(coordinator.should_request(ms(0), 1));
    }

    #[test]
    fn test_twenty_frames_in_one_interval_start_one_call() {
        let mut coordinator = RecognitionCoordinator::new(ms(1000));
        let started = (0..20u64)
            .filter(|i| coordinator.try_begin(ms(i * 40), 2))
            .count();
        assert_eq!(started, 1);

        // Even once the first call finishes, the interval still gates.
        coordinator.complete(Ok(response(vec![])));
        assert!(!coordinator.try_begin(ms(900), 2));
        assert!(coordinator.try_begin(ms(1000), 2));
        assert_eq!(coordinator.calls_started(), 2);
    }

    #[test]
    fn test_source_restart_rearms_recognition() {
        let mut coordinator = RecognitionCoordinator::new(ms(1000));
        assert!(coordinator.try_begin(ms(10_000), 1));
        coordinator.complete(Ok(response(vec![])));

        let first_after_restart = (0..50u64)
            .map(|i| ms(i * 200))
            .find(|&t| coordinator.try_begin(t, 1));
        assert_eq!(first_after_restart, Some(ms(0)));
        coordinator.complete(Ok(response(vec![])));
        // Normal spacing resumes from the restart point.
        assert!(!coordinator.try_begin(ms(400), 1));
        assert!(coordinator.try_begin(ms(1000), 1));
    }

    #[test]
    fn test_in_flight_blocks_even_after_interval() {
        let mut coordinator = RecognitionCoordinator::new(ms(1000));
        assert!(coordinator.try_begin(ms(0), 1));
        assert!(!coordinator.try_begin(ms(5000), 1));
        assert_eq!(coordinator.status(), &RecognitionStatus::InFlight);
    }

    #[test]
    fn test_failure_keeps_previous_matches() {
        let mut coordinator = RecognitionCoordinator::new(ms(1000));
        let first = vec![identity("ada", FaceRegion::new(0.0, 0.0, 100.0, 100.0))];

        coordinator.try_begin(ms(0), 1);
        assert!(coordinator.complete(Ok(response(first.clone()))));
        coordinator.try_begin(ms(1000), 1);
        let changed = coordinator.complete(Err(OverlayError::RecognitionTransportFailed(
            "timed out".into(),
        )));

        assert!(!changed);
        assert_eq!(coordinator.last_known_matches(), &first[..]);
        assert!(matches!(coordinator.status(), RecognitionStatus::Failed(msg) if msg.contains("timed out")));
        assert!(!coordinator.is_in_flight());
    }

    #[test]
    fn test_success_replaces_wholesale() {
        let mut coordinator = RecognitionCoordinator::new(ms(1000));
        coordinator.complete(Ok(response(vec![
            identity("a", FaceRegion::new(0.0, 0.0, 10.0, 10.0)),
            identity("b", FaceRegion::new(50.0, 0.0, 10.0, 10.0)),
        ])));
        coordinator.complete(Ok(response(vec![])));
        assert!(coordinator.last_known_matches().is_empty());
        assert_eq!(coordinator.status(), &RecognitionStatus::Idle);
    }

    #[test]
    fn test_next_call_clears_failed_status() {
        let mut coordinator = RecognitionCoordinator::new(ms(100));
        coordinator.try_begin(ms(0), 1);
        coordinator.complete(Err(OverlayError::RecognitionDecodeFailed("bad".into())));
        coordinator.try_begin(ms(100), 1);
        assert_eq!(coordinator.status(), &RecognitionStatus::InFlight);
    }

    #[test]
    fn test_reconcile_uses_stale_matches_for_new_regions() {
        let mut coordinator = RecognitionCoordinator::new(ms(1000));
        coordinator.complete(Ok(response(vec![identity(
            "ada",
            FaceRegion::new(100.0, 100.0, 100.0, 100.0),
        )])));

        // The face moved a little since the request; still overlaps > 30%.
        let faces = coordinator.reconcile(&[
            FaceRegion::new(120.0, 110.0, 100.0, 100.0),
            FaceRegion::new(600.0, 100.0, 100.0, 100.0),
        ]);
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].id, 0);
        assert_eq!(faces[0].identity.as_ref().unwrap().identity_id, "ada");
        assert_eq!(faces[1].id, 1);
        assert!(faces[1].identity.is_none());
    }
}
