mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use facelens_core::app::app_state::{AppEvent, AppState, PhotoResults};
use facelens_core::app::still_photo_use_case::StillPhotoUseCase;
use facelens_core::capture::domain::frame_source::FrameSource;
use facelens_core::capture::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use facelens_core::compositing::infrastructure::cutout_compositor::{compose_cutout, CutoutRequest};
use facelens_core::detection::domain::face_detector::FaceDetector;
use facelens_core::detection::domain::person_segmenter::PersonSegmenter;
use facelens_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use facelens_core::detection::infrastructure::onnx_person_segmenter::OnnxPersonSegmenter;
use facelens_core::live::live_session::{LiveInputs, LiveSession, OverlaySnapshot};
use facelens_core::live::recognition_coordinator::RecognitionStatus;
use facelens_core::live::session_logger::LogSessionLogger;
use facelens_core::recognition::domain::recognition_service::RecognitionService;
use facelens_core::recognition::infrastructure::http_recognition_client::HttpRecognitionClient;
use facelens_core::rendering::domain::overlay_layers::{build_overlay, OverlayStyle};
use facelens_core::rendering::infrastructure::raster_canvas::compose_display;
use facelens_core::shared::color::{palette_color, Color};
use facelens_core::shared::constants::{
    FACE_MODEL_NAME, IMAGE_EXTENSIONS, RECOGNITION_TIMEOUT, SEGMENTATION_MODEL_NAME,
};
use facelens_core::shared::frame::{Frame, FrameSize};
use facelens_core::shared::model_resolver;
use facelens_core::shared::region::FaceRegion;

use settings::Settings;

/// Live identity overlays and still-photo cutouts.
#[derive(Parser)]
#[command(name = "facelens")]
struct Cli {
    /// Recognition server base URL (overrides the saved setting).
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the live overlay over a video file or capture device.
    Live {
        /// Video file or device path.
        input: PathBuf,

        /// Outline identified people instead of boxing them.
        #[arg(long)]
        silhouette: bool,

        /// Display size as WIDTHxHEIGHT (defaults to the frame size).
        #[arg(long, value_parser = parse_size)]
        view: Option<FrameSize>,

        /// Write rendered overlay frames to this directory.
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Write every Nth displayed frame when --snapshots is set.
        #[arg(long, default_value = "30")]
        snapshot_every: usize,

        /// Decode as fast as possible instead of at the native frame rate.
        #[arg(long)]
        unpaced: bool,

        /// Face detection model: path, URL, or file name in the model cache.
        #[arg(long)]
        face_model: Option<String>,

        /// Person segmentation model: path, URL, or file name in the model cache.
        #[arg(long)]
        segmentation_model: Option<String>,
    },

    /// Recognize the faces in one photo and render the overlay.
    Recognize {
        image: PathBuf,

        /// Write the annotated photo here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also detect faces locally with this model instead of relying on
        /// the server's face boxes.
        #[arg(long)]
        face_model: Option<String>,
    },

    /// Cut one person out of a photo and build a portrait card.
    Cutout {
        image: PathBuf,

        /// Face box as X,Y,WIDTH,HEIGHT in image pixels.
        #[arg(long, value_parser = parse_face_box)]
        face: FaceRegion,

        /// Name printed on the card.
        #[arg(long)]
        name: String,

        /// Accent color as #RRGGBB (defaults to the first palette color).
        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        segmentation_model: Option<String>,

        /// Directory for cutout.png and presentation.png.
        #[arg(long)]
        output_dir: PathBuf,
    },

    /// Print the effective settings as JSON.
    Config {
        /// Persist the effective settings (including --server).
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = Settings::load();
    if let Some(server) = cli.server {
        settings.server_url = server;
    }

    match cli.command {
        Command::Live {
            input,
            silhouette,
            view,
            snapshots,
            snapshot_every,
            unpaced,
            face_model,
            segmentation_model,
        } => {
            settings.silhouette |= silhouette;
            settings.validate()?;
            if !input.exists() {
                return Err(format!("Input not found: {}", input.display()).into());
            }
            if snapshot_every == 0 {
                return Err("--snapshot-every must be at least 1".into());
            }
            let options = LiveOptions {
                input,
                view,
                snapshots,
                snapshot_every,
                paced: !unpaced,
                face_model,
                segmentation_model,
            };
            run_live(&settings, options)
        }
        Command::Recognize {
            image,
            output,
            face_model,
        } => {
            settings.validate()?;
            validate_image_path(&image)?;
            run_recognize(&settings, &image, output.as_deref(), face_model.as_deref())
        }
        Command::Cutout {
            image,
            face,
            name,
            color,
            segmentation_model,
            output_dir,
        } => {
            validate_image_path(&image)?;
            let color = match color {
                Some(hex) => Color::from_hex(&hex)
                    .ok_or_else(|| format!("Color must be #RRGGBB, got '{hex}'"))?,
                None => palette_color(0),
            };
            let request = CutoutRequest {
                face,
                color,
                display_name: name,
            };
            run_cutout(&image, &request, segmentation_model.as_deref(), &output_dir)
        }
        Command::Config { save } => {
            settings.validate()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if save {
                let path = settings.save()?;
                log::info!("Settings saved to {}", path.display());
            }
            Ok(())
        }
    }
}

struct LiveOptions {
    input: PathBuf,
    view: Option<FrameSize>,
    snapshots: Option<PathBuf>,
    snapshot_every: usize,
    paced: bool,
    face_model: Option<String>,
    segmentation_model: Option<String>,
}

fn run_live(settings: &Settings, options: LiveOptions) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpRecognitionClient::with_timeout(&settings.server_url, RECOGNITION_TIMEOUT)?;
    if let Err(e) = client.check_health() {
        log::warn!(
            "Recognition server at {} is not responding ({e}); faces will stay unidentified",
            client.base_url()
        );
    }

    let detector = build_detector(options.face_model.as_deref(), settings.face_confidence)?;
    let segmenter = if settings.silhouette {
        Some(build_segmenter(options.segmentation_model.as_deref())?)
    } else {
        None
    };
    let source = FfmpegFrameSource::open(&options.input, options.paced)?;
    log::info!("Opened {}", source.info().description);

    if let Some(dir) = &options.snapshots {
        fs::create_dir_all(dir)?;
    }

    let session = LiveSession::start(
        LiveInputs {
            source: Box::new(source),
            detector,
            segmenter,
        },
        Arc::new(client),
        settings.live_config(),
        Box::new(LogSessionLogger::new()),
    );

    let style = OverlayStyle::default();
    let snapshots = session.snapshots().clone();
    let mut last_status = RecognitionStatus::Idle;
    for (i, snapshot) in snapshots.iter().enumerate() {
        if snapshot.status != last_status {
            report_status(&snapshot.status);
            last_status = snapshot.status.clone();
        }
        if let Some(dir) = &options.snapshots {
            if i % options.snapshot_every == 0 {
                write_snapshot(dir, &snapshot, options.view, &style)?;
            }
        }
    }

    let summary = session.wait();
    if let Some(error) = &summary.source_error {
        return Err(format!("Capture stopped: {error}").into());
    }
    eprintln!(
        "{} detection cycles ({} skipped), {} recognition calls ({} failed)",
        summary.cycles,
        summary.skipped_cycles,
        summary.recognitions_started,
        summary.recognitions_failed
    );
    for m in &summary.last_known_matches {
        println!("{} ({:.0}%)", m.display_name, m.confidence * 100.0);
    }
    Ok(())
}

fn report_status(status: &RecognitionStatus) {
    match status {
        RecognitionStatus::Idle => log::debug!("Recognition idle"),
        RecognitionStatus::InFlight => log::debug!("Recognition in flight"),
        RecognitionStatus::Failed(message) => log::warn!("Recognition failed: {message}"),
    }
}

fn write_snapshot(
    dir: &Path,
    snapshot: &OverlaySnapshot,
    view: Option<FrameSize>,
    style: &OverlayStyle,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = view.unwrap_or(snapshot.frame.size());
    let scene = build_overlay(
        &snapshot.faces,
        snapshot.silhouette.as_ref(),
        snapshot.frame_size,
        target,
        style,
    );
    let canvas = compose_display(&snapshot.frame, &scene)?;
    let path = dir.join(format!("overlay_{:06}.png", snapshot.frame.index()));
    canvas.save(&path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

fn run_recognize(
    settings: &Settings,
    image_path: &Path,
    output: Option<&Path>,
    face_model: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = Arc::new(HttpRecognitionClient::with_timeout(
        &settings.server_url,
        RECOGNITION_TIMEOUT,
    )?);
    let detector = match face_model {
        Some(spec) => Some(build_detector(Some(spec), settings.face_confidence)?),
        None => None,
    };

    let mut state = AppState::Idle.transition(AppEvent::StartCapture);
    let photo = image::open(image_path)?.to_rgb8();
    state = state.transition(AppEvent::PhotoCaptured);
    log::info!("State: {state}");

    let service: Arc<dyn RecognitionService> = client.clone();
    let mut use_case = StillPhotoUseCase::new(detector, service)
        .with_jpeg_quality(settings.jpeg_quality);
    state = state.transition(AppEvent::ProcessingFinished(use_case.execute(photo)));

    match &state {
        AppState::Results(results) => {
            print_results(results, client.as_ref());
            if let Some(output) = output {
                let scene = results.scene(&OverlayStyle::default());
                let frame = Frame::from_rgb_image((*results.image).clone(), 0);
                compose_display(&frame, &scene)?.save(output)?;
                log::info!("Output written to {}", output.display());
            }
            Ok(())
        }
        AppState::Error(message) => Err(message.clone().into()),
        other => Err(format!("Unexpected state after processing: {other}").into()),
    }
}

fn print_results(results: &PhotoResults, service: &dyn RecognitionService) {
    let scene = results.scene(&OverlayStyle::default());
    println!(
        "{} faces, {} identified",
        results.faces.len(),
        scene.tap_targets.len()
    );
    for target in &scene.tap_targets {
        let r = &target.rect;
        println!(
            "- {} [{}] at {:.0},{:.0} {:.0}x{:.0}",
            target.display_name, target.identity_id, r.x, r.y, r.width, r.height
        );
        match service.details(&target.identity_id) {
            Ok(details) => {
                println!("  {}", details.headline());
                if !details.biography.is_empty() {
                    println!("  {}", details.biography);
                }
            }
            Err(e) => log::warn!("No details for {}: {e}", target.identity_id),
        }
    }
}

fn run_cutout(
    image_path: &Path,
    request: &CutoutRequest,
    segmentation_model: Option<&str>,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let photo = image::open(image_path)?.to_rgb8();
    let mut segmenter = build_segmenter(segmentation_model)?;
    let output = compose_cutout(&photo, request, segmenter.as_mut())?;

    fs::create_dir_all(output_dir)?;
    let cutout_path = output_dir.join("cutout.png");
    let presentation_path = output_dir.join("presentation.png");
    output.cutout.save(&cutout_path)?;
    output.presentation.save(&presentation_path)?;
    log::info!(
        "Wrote {} and {}",
        cutout_path.display(),
        presentation_path.display()
    );
    Ok(())
}

fn build_detector(
    spec: Option<&str>,
    confidence: f32,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", spec.unwrap_or(FACE_MODEL_NAME));
    let path = model_resolver::resolve(spec, FACE_MODEL_NAME, None, Some(Box::new(download_progress)))?;
    Ok(Box::new(OnnxBlazefaceDetector::new(&path, confidence)?))
}

fn build_segmenter(
    spec: Option<&str>,
) -> Result<Box<dyn PersonSegmenter>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", spec.unwrap_or(SEGMENTATION_MODEL_NAME));
    let path = model_resolver::resolve(
        spec,
        SEGMENTATION_MODEL_NAME,
        None,
        Some(Box::new(download_progress)),
    )?;
    Ok(Box::new(OnnxPersonSegmenter::new(&path)?))
}

fn validate_image_path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("Image not found: {}", path.display()).into());
    }
    if !is_image(path) {
        return Err(format!(
            "Unsupported image type: {} (expected one of {})",
            path.display(),
            IMAGE_EXTENSIONS.join(", ")
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn parse_size(s: &str) -> Result<FrameSize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.trim().parse().map_err(|_| format!("bad width '{w}'"))?;
    let height: u32 = h.trim().parse().map_err(|_| format!("bad height '{h}'"))?;
    let size = FrameSize::new(width, height);
    if size.is_empty() {
        return Err("view size must be non-zero".into());
    }
    Ok(size)
}

fn parse_face_box(s: &str) -> Result<FaceRegion, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("expected X,Y,WIDTH,HEIGHT, got '{s}'"))?;
    let [x, y, width, height] = values[..] else {
        return Err(format!("expected four numbers, got {}", values.len()));
    };
    let region = FaceRegion::new(x, y, width, height);
    if region.is_empty() {
        return Err("face box must have a positive size".into());
    }
    Ok(region)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
