use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use image::RgbaImage;

use super::detection_cycle::{run_detection_cycle, CycleResult};
use super::frame_admission::FrameAdmissionScheduler;
use super::recognition_coordinator::{DetectedFace, RecognitionCoordinator, RecognitionStatus};
use super::session_logger::SessionLogger;
use super::silhouette::build_silhouette;
use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::person_segmenter::PersonSegmenter;
use crate::masking::domain::segmentation_mask::SegmentationMask;
use crate::recognition::domain::recognition_match::{RecognitionMatch, RecognitionResponse};
use crate::recognition::domain::recognition_service::RecognitionService;
use crate::recognition::infrastructure::jpeg_frame_encoder::{
    encode_jpeg, RECOGNITION_JPEG_QUALITY,
};
use crate::shared::constants::{
    DEFAULT_DISPLAY_INTERVAL, DEFAULT_PROCESS_INTERVAL, DEFAULT_RECOGNITION_INTERVAL,
};
use crate::shared::error::OverlayError;
use crate::shared::frame::{Frame, FrameSize};
use crate::shared::region::FaceRegion;

#[derive(Clone, Debug)]
pub struct LiveConfig {
    pub process_interval: Duration,
    pub display_interval: Duration,
    pub recognition_interval: Duration,
    /// Outline identified people instead of boxing them.
    pub silhouette: bool,
    pub jpeg_quality: u8,
    /// Snapshots buffered for the display before new ones are dropped.
    pub snapshot_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            process_interval: DEFAULT_PROCESS_INTERVAL,
            display_interval: DEFAULT_DISPLAY_INTERVAL,
            recognition_interval: DEFAULT_RECOGNITION_INTERVAL,
            silhouette: false,
            jpeg_quality: RECOGNITION_JPEG_QUALITY,
            snapshot_capacity: 4,
        }
    }
}

/// Everything the display needs for one redraw.
#[derive(Clone, Debug)]
pub struct OverlaySnapshot {
    /// Frame admitted for display.
    pub frame: Arc<Frame>,
    /// Size of the last frame admitted for inference; face bounds and the
    /// silhouette live in this space.
    pub frame_size: FrameSize,
    pub faces: Vec<DetectedFace>,
    pub silhouette: Option<Arc<RgbaImage>>,
    pub status: RecognitionStatus,
}

/// Counters reported when the session ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSummary {
    pub cycles: usize,
    pub skipped_cycles: usize,
    pub recognitions_started: usize,
    pub recognitions_failed: usize,
    pub snapshots_sent: usize,
    pub last_known_matches: Vec<RecognitionMatch>,
    /// Set when the frame source stopped with an error.
    pub source_error: Option<String>,
}

/// Messages into the owner thread. The owner is the only place session
/// state is mutated.
enum SessionEvent {
    Cycle {
        frame: Frame,
        result: CycleResult,
        detect_ms: f64,
    },
    Display(Frame),
    RecognitionCompleted {
        result: Result<RecognitionResponse, OverlayError>,
        elapsed_ms: f64,
    },
    SourceEnded {
        error: Option<String>,
    },
    Stop,
}

/// Local detectors and the camera stand-in for one session.
pub struct LiveInputs {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn FaceDetector>,
    /// Only used when the config asks for silhouettes.
    pub segmenter: Option<Box<dyn PersonSegmenter>>,
}

/// A running live overlay session.
///
/// Layout: `capture [admit → detect] → owner [reconcile/recognize] → display`,
/// with one short-lived worker thread per recognition call. Dropping the
/// session cancels it without waiting.
pub struct LiveSession {
    cancelled: Arc<AtomicBool>,
    events_tx: Sender<SessionEvent>,
    snapshots_rx: Receiver<OverlaySnapshot>,
    capture_handle: Option<JoinHandle<()>>,
    owner_handle: Option<JoinHandle<SessionSummary>>,
}

impl LiveSession {
    pub fn start(
        inputs: LiveInputs,
        service: Arc<dyn RecognitionService>,
        config: LiveConfig,
        logger: Box<dyn SessionLogger>,
    ) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = crossbeam_channel::unbounded::<SessionEvent>();
        let (snapshots_tx, snapshots_rx) =
            crossbeam_channel::bounded::<OverlaySnapshot>(config.snapshot_capacity.max(1));

        let capture_handle = spawn_capture(inputs, &config, events_tx.clone(), cancelled.clone());

        let owner = SessionOwner::new(config, logger);
        let worker_tx = events_tx.clone();
        let owner_cancelled = cancelled.clone();
        let owner_handle = std::thread::spawn(move || {
            run_owner(owner, events_rx, worker_tx, snapshots_tx, service, owner_cancelled)
        });

        Self {
            cancelled,
            events_tx,
            snapshots_rx,
            capture_handle: Some(capture_handle),
            owner_handle: Some(owner_handle),
        }
    }

    pub fn snapshots(&self) -> &Receiver<OverlaySnapshot> {
        &self.snapshots_rx
    }

    /// Shared flag that, once set, makes every session thread wind down.
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Tears the session down now. In-flight recognition results are
    /// discarded.
    pub fn stop(mut self) -> SessionSummary {
        self.cancelled.store(true, Ordering::Relaxed);
        let _ = self.events_tx.send(SessionEvent::Stop);
        self.join_threads()
    }

    /// Waits for the source to run out, including any recognition call
    /// still in flight at that point.
    pub fn wait(mut self) -> SessionSummary {
        self.join_threads()
    }

    fn join_threads(&mut self) -> SessionSummary {
        if let Some(handle) = self.capture_handle.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
        match self.owner_handle.take().map(JoinHandle::join) {
            Some(Ok(summary)) => summary,
            Some(Err(_)) => {
                log::error!("Session owner thread panicked");
                SessionSummary::default()
            }
            None => SessionSummary::default(),
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        if self.owner_handle.is_some() {
            self.cancelled.store(true, Ordering::Relaxed);
            let _ = self.events_tx.send(SessionEvent::Stop);
        }
    }
}

fn spawn_capture(
    inputs: LiveInputs,
    config: &LiveConfig,
    events_tx: Sender<SessionEvent>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let LiveInputs {
        mut source,
        mut detector,
        segmenter,
    } = inputs;
    let mut segmenter = if config.silhouette { segmenter } else { None };
    let mut scheduler = FrameAdmissionScheduler::new(config.process_interval, config.display_interval);

    std::thread::spawn(move || {
        let _unwind_notice = CaptureUnwindNotice(events_tx.clone());
        let outcome = source.stream(&mut |frame| {
            if cancelled.load(Ordering::Relaxed) {
                return ControlFlow::Break(());
            }
            let admission = scheduler.admit(frame.timestamp());

            let display_frame = admission.display.then(|| frame.clone());
            if admission.inference {
                let started = Instant::now();
                let segmenter = segmenter
                    .as_mut()
                    .map(|s| &mut **s as &mut dyn PersonSegmenter);
                let result = run_detection_cycle(&frame, detector.as_mut(), segmenter);
                let detect_ms = started.elapsed().as_secs_f64() * 1000.0;
                if events_tx
                    .send(SessionEvent::Cycle {
                        frame,
                        result,
                        detect_ms,
                    })
                    .is_err()
                {
                    return ControlFlow::Break(());
                }
            }
            if let Some(display_frame) = display_frame {
                if events_tx.send(SessionEvent::Display(display_frame)).is_err() {
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        });

        let error = outcome.err().map(|e| e.to_string());
        if let Some(e) = &error {
            log::error!("Frame source failed: {e}");
        }
        log::debug!(
            "Capture finished: {} admitted, {} dropped",
            scheduler.admitted(),
            scheduler.dropped()
        );
        let _ = events_tx.send(SessionEvent::SourceEnded { error });
    })
}

/// Tells the owner the source is gone when a detector or the source
/// panics mid-stream, so the session still winds down.
struct CaptureUnwindNotice(Sender<SessionEvent>);

impl Drop for CaptureUnwindNotice {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let _ = self.0.send(SessionEvent::SourceEnded {
                error: Some(CAPTURE_PANIC_MESSAGE.to_string()),
            });
        }
    }
}

const CAPTURE_PANIC_MESSAGE: &str = "capture thread panicked";

fn run_owner(
    mut owner: SessionOwner,
    events_rx: Receiver<SessionEvent>,
    worker_tx: Sender<SessionEvent>,
    snapshots_tx: Sender<OverlaySnapshot>,
    service: Arc<dyn RecognitionService>,
    cancelled: Arc<AtomicBool>,
) -> SessionSummary {
    let mut source_done = false;
    owner.logger.info(&format!(
        "Live session started (process every {:?}, recognize every {:?})",
        owner.config.process_interval, owner.config.recognition_interval
    ));

    for event in events_rx.iter() {
        match event {
            SessionEvent::Cycle {
                frame,
                result,
                detect_ms,
            } => {
                owner.logger.timing("detect", detect_ms);
                if owner.apply_cycle(frame.size(), frame.timestamp(), result) {
                    spawn_recognition(
                        frame,
                        owner.config.jpeg_quality,
                        service.clone(),
                        worker_tx.clone(),
                        cancelled.clone(),
                    );
                }
            }
            SessionEvent::Display(frame) => {
                let snapshot = owner.snapshot(Arc::new(frame));
                match snapshots_tx.try_send(snapshot) {
                    Ok(()) => owner.summary.snapshots_sent += 1,
                    Err(TrySendError::Full(_)) => log::debug!("Display is behind, dropping snapshot"),
                    Err(TrySendError::Disconnected(_)) => {}
                }
            }
            SessionEvent::RecognitionCompleted { result, elapsed_ms } => {
                owner.logger.timing("recognize", elapsed_ms);
                owner.apply_recognition(result);
                if source_done {
                    break;
                }
            }
            SessionEvent::SourceEnded { error } => {
                owner.summary.source_error = error;
                source_done = true;
                if !owner.coordinator.is_in_flight() {
                    break;
                }
            }
            SessionEvent::Stop => break,
        }
    }

    // Anything still in flight belongs to a session that no longer exists.
    cancelled.store(true, Ordering::Relaxed);
    owner.finish()
}

fn spawn_recognition(
    frame: Frame,
    jpeg_quality: u8,
    service: Arc<dyn RecognitionService>,
    events_tx: Sender<SessionEvent>,
    cancelled: Arc<AtomicBool>,
) {
    std::thread::spawn(move || {
        let started = Instant::now();
        let result = encode_jpeg(&frame, jpeg_quality).and_then(|jpeg| service.recognize(&jpeg));
        if cancelled.load(Ordering::Relaxed) {
            log::debug!("Discarding recognition result for a cancelled session");
            return;
        }
        let _ = events_tx.send(SessionEvent::RecognitionCompleted {
            result,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        });
    });
}

/// State owned by the owner thread.
struct SessionOwner {
    config: LiveConfig,
    coordinator: RecognitionCoordinator,
    frame_size: FrameSize,
    regions: Vec<FaceRegion>,
    faces: Vec<DetectedFace>,
    mask: Option<SegmentationMask>,
    silhouette: Option<Arc<RgbaImage>>,
    logger: Box<dyn SessionLogger>,
    summary: SessionSummary,
}

impl SessionOwner {
    fn new(config: LiveConfig, logger: Box<dyn SessionLogger>) -> Self {
        Self {
            coordinator: RecognitionCoordinator::new(config.recognition_interval),
            config,
            frame_size: FrameSize::default(),
            regions: Vec::new(),
            faces: Vec::new(),
            mask: None,
            silhouette: None,
            logger,
            summary: SessionSummary::default(),
        }
    }

    /// Takes in a detection cycle. Returns whether a recognition call for
    /// this frame should be sent.
    fn apply_cycle(&mut self, size: FrameSize, timestamp: Duration, result: CycleResult) -> bool {
        self.frame_size = size;
        self.summary.cycles += 1;
        self.logger.count("cycles");

        match result {
            CycleResult::Detected { faces, mask } => {
                self.regions = faces;
                self.mask = mask;
            }
            CycleResult::Skipped { reason } => {
                log::debug!("Cycle skipped: {reason}");
                self.summary.skipped_cycles += 1;
                self.logger.count("skipped");
                self.regions.clear();
                self.mask = None;
            }
        }
        self.refresh_faces();

        let start = self.coordinator.try_begin(timestamp, self.regions.len());
        if start {
            self.summary.recognitions_started += 1;
            self.logger.count("recognition_started");
        }
        start
    }

    fn apply_recognition(&mut self, result: Result<RecognitionResponse, OverlayError>) {
        if result.is_err() {
            self.summary.recognitions_failed += 1;
            self.logger.count("recognition_failed");
        }
        if self.coordinator.complete(result) {
            self.refresh_faces();
        }
    }

    fn refresh_faces(&mut self) {
        self.faces = self.coordinator.reconcile(&self.regions);
        self.silhouette = match (&self.mask, self.config.silhouette) {
            (Some(mask), true) => {
                let started = Instant::now();
                let silhouette = build_silhouette(mask, &self.faces, self.frame_size);
                self.logger
                    .timing("edges", started.elapsed().as_secs_f64() * 1000.0);
                silhouette.map(Arc::new)
            }
            _ => None,
        };
    }

    fn snapshot(&self, frame: Arc<Frame>) -> OverlaySnapshot {
        OverlaySnapshot {
            frame,
            frame_size: self.frame_size,
            faces: self.faces.clone(),
            silhouette: self.silhouette.clone(),
            status: self.coordinator.status().clone(),
        }
    }

    fn finish(mut self) -> SessionSummary {
        self.logger.summary();
        self.summary.last_known_matches = self.coordinator.last_known_matches().to_vec();
        self.summary
    }
}
