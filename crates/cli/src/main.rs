mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;

use facemask_core::capture::domain::camera_device::{select_device, CameraPosition, DeviceCatalog};
use facemask_core::capture::domain::capture_device::CaptureDevice;
use facemask_core::capture::infrastructure::ffmpeg_capture_device::{CameraConfig, FfmpegCaptureDevice};
use facemask_core::capture::infrastructure::system_device_catalog::SystemDeviceCatalog;
use facemask_core::capture::infrastructure::threaded_frame_source::ThreadedFrameSource;
use facemask_core::compositing::domain::overlay_placement::OverlayGeometry;
use facemask_core::compositing::infrastructure::cpu_overlay_compositor::CpuOverlayCompositor;
use facemask_core::detection::domain::face_detector::{FaceDetector, NoFaceDetector};
use facemask_core::detection::infrastructure::cached_face_detector::CachedFaceDetector;
use facemask_core::pipeline::masking_pipeline::{load_overlay, MaskingPipeline};
use facemask_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facemask_core::presentation::domain::presenter::Presenter;
use facemask_core::presentation::frame_dispatcher;
use facemask_core::presentation::infrastructure::frame_sequence_presenter::FrameSequencePresenter;
use facemask_core::presentation::infrastructure::image_file_writer::ImageFileWriter;
use facemask_core::presentation::infrastructure::latest_image_presenter::LatestImagePresenter;
use facemask_core::shared::constants::FACE_OUTLINE_COLOR;

use settings::Settings;

/// How often the presentation loop re-checks whether to keep running.
const PRESENT_POLL: Duration = Duration::from_millis(50);

/// Draws a mustache over every detected mouth in a live camera feed.
#[derive(Parser, Debug)]
#[command(name = "facemask")]
struct Cli {
    /// Camera locator (`/dev/video0`, `0`, `video=<name>`). Overrides --position.
    #[arg(long, conflicts_with = "input")]
    device: Option<String>,

    /// Replay a video file instead of opening a camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Camera to pick when no device is given: front, back, external, any.
    #[arg(long)]
    position: Option<CameraPosition>,

    /// Requested capture width.
    #[arg(long)]
    width: Option<u32>,

    /// Requested capture height.
    #[arg(long)]
    height: Option<u32>,

    /// Requested capture frame rate.
    #[arg(long)]
    framerate: Option<u32>,

    /// Overlay image file name.
    #[arg(long)]
    asset: Option<String>,

    /// Directory holding the overlay asset. Without it the user data
    /// directory and `assets/` next to the executable are searched.
    #[arg(long)]
    asset_dir: Option<PathBuf>,

    /// Recorded detector output (JSON, features keyed by frame number).
    #[arg(long)]
    features: Option<PathBuf>,

    /// Keep the latest masked frame in this image file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Save every presented frame into this directory.
    #[arg(long)]
    save_frames: Option<PathBuf>,

    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Outline each detected face in red.
    #[arg(long)]
    show_face_bounds: bool,

    /// Print the available cameras and exit.
    #[arg(long)]
    list_devices: bool,

    /// Store the effective camera and overlay options as the new defaults.
    #[arg(long)]
    save_settings: bool,
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

    if cli.list_devices {
        return list_devices(&SystemDeviceCatalog::new());
    }
    validate(&cli)?;

    let settings = effective_settings(&cli, Settings::load());
    if cli.save_settings {
        let path = settings.save()?;
        log::info!("Saved settings to {}", path.display());
    }

    let asset = load_overlay(&settings.asset, settings.asset_dir.as_deref())?;

    let device = build_device(&cli, &settings)?;
    let detector = build_detector(cli.features.as_deref())?;
    let mut compositor = CpuOverlayCompositor::new(asset, OverlayGeometry::default());
    if settings.show_face_bounds {
        compositor = compositor.with_face_outline(FACE_OUTLINE_COLOR);
    }

    let (dispatcher, mut presentation) = frame_dispatcher::channel();
    let mut pipeline = MaskingPipeline::new(
        Box::new(ThreadedFrameSource::new(device)),
        detector,
        Box::new(compositor),
        dispatcher,
        Box::new(StdoutPipelineLogger::default()),
    );
    let mut presenter = build_presenter(&cli)?;

    pipeline.start()?;
    let deadline = cli
        .duration
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    presentation.run_while(
        presenter.as_mut(),
        || pipeline.is_running() && deadline.map_or(true, |d| Instant::now() < d),
        PRESENT_POLL,
    );
    pipeline.stop();
    presentation.pump(presenter.as_mut());

    let capture = pipeline.stats();
    let shown = presentation.stats();
    log::info!(
        "Captured {} frames: {} dropped, {} processed, {} presented, {} superseded",
        capture.captured,
        capture.dropped,
        capture.delivered,
        shown.presented,
        shown.superseded
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if let Some(features) = &cli.features {
        if !features.exists() {
            return Err(format!("Features file not found: {}", features.display()).into());
        }
    }
    match (&cli.output, &cli.save_frames) {
        (None, None) => return Err("One of --output or --save-frames is required".into()),
        (Some(_), Some(_)) => {
            return Err("--output and --save-frames are mutually exclusive".into())
        }
        _ => {}
    }
    if cli.width == Some(0) || cli.height == Some(0) {
        return Err("Capture width and height must be positive".into());
    }
    if let Some(fps) = cli.framerate {
        if !(1..=240).contains(&fps) {
            return Err(format!("Frame rate must be between 1 and 240, got {fps}").into());
        }
    }
    if let Some(secs) = cli.duration {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(format!("Duration must be a positive number of seconds, got {secs}").into());
        }
    }
    Ok(())
}

/// Flags override persisted settings field by field.
fn effective_settings(cli: &Cli, mut settings: Settings) -> Settings {
    if let Some(device) = &cli.device {
        settings.device = Some(device.clone());
    }
    if let Some(position) = cli.position {
        settings.position = position;
        if cli.device.is_none() {
            settings.device = None;
        }
    }
    if let Some(width) = cli.width {
        settings.width = width;
    }
    if let Some(height) = cli.height {
        settings.height = height;
    }
    if let Some(framerate) = cli.framerate {
        settings.framerate = framerate;
    }
    if let Some(asset) = &cli.asset {
        settings.asset = asset.clone();
    }
    if let Some(dir) = &cli.asset_dir {
        settings.asset_dir = Some(dir.clone());
    }
    settings.show_face_bounds |= cli.show_face_bounds;
    settings
}

fn build_device(
    cli: &Cli,
    settings: &Settings,
) -> Result<Box<dyn CaptureDevice>, Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        log::info!("Replaying {}", input.display());
        return Ok(Box::new(FfmpegCaptureDevice::file(input)));
    }

    let locator = match &settings.device {
        Some(locator) => locator.clone(),
        None => {
            let devices = SystemDeviceCatalog::new().enumerate()?;
            let device = select_device(&devices, settings.position)?;
            log::info!(
                "Selected {} camera '{}' at {}",
                device.position,
                device.name,
                device.locator
            );
            device.locator
        }
    };

    Ok(Box::new(FfmpegCaptureDevice::camera(CameraConfig {
        locator,
        width: settings.width,
        height: settings.height,
        framerate: settings.framerate,
    })))
}

fn build_detector(features: Option<&Path>) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    match features {
        Some(path) => Ok(Box::new(CachedFaceDetector::from_json_file(path)?)),
        None => {
            log::warn!("No --features file given; frames will be shown unmasked");
            Ok(Box::new(NoFaceDetector))
        }
    }
}

fn build_presenter(cli: &Cli) -> Result<Box<dyn Presenter>, Box<dyn std::error::Error>> {
    let writer = Box::new(ImageFileWriter::new());
    if let Some(output) = &cli.output {
        return Ok(Box::new(LatestImagePresenter::new(writer, output)));
    }
    if let Some(dir) = &cli.save_frames {
        return Ok(Box::new(FrameSequencePresenter::new(writer, dir)));
    }
    Err("no presenter configured".into())
}

fn list_devices(catalog: &dyn DeviceCatalog) -> Result<(), Box<dyn std::error::Error>> {
    let devices = catalog.enumerate()?;
    if devices.is_empty() {
        println!("No cameras found");
    }
    for device in devices {
        println!("{}\t{}\t{}", device.locator, device.position, device.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["facemask"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_requires_a_presenter() {
        assert!(validate(&parse(&[])).is_err());
        assert!(validate(&parse(&["--output", "latest.png"])).is_ok());
        assert!(validate(&parse(&["--save-frames", "frames"])).is_ok());
    }

    #[test]
    fn test_presenters_are_exclusive() {
        let cli = parse(&["--output", "latest.png", "--save-frames", "frames"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_device_conflicts_with_input() {
        let argv = ["facemask", "--device", "/dev/video0", "--input", "clip.mp4"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(validate(&parse(&["--output", "o.png", "--width", "0"])).is_err());
        assert!(validate(&parse(&["--output", "o.png", "--framerate", "0"])).is_err());
        assert!(validate(&parse(&["--output", "o.png", "--duration", "-1"])).is_err());
    }

    #[test]
    fn test_rejects_missing_files() {
        let cli = parse(&["--output", "o.png", "--input", "/nonexistent/clip.mp4"]);
        assert!(validate(&cli).is_err());
        let cli = parse(&["--output", "o.png", "--features", "/nonexistent/features.json"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_rejects_unknown_position() {
        assert!(Cli::try_parse_from(["facemask", "--position", "sideways"]).is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let stored = Settings {
            device: Some("/dev/video4".into()),
            width: 640,
            ..Settings::default()
        };
        let cli = parse(&["--output", "o.png", "--width", "1920", "--show-face-bounds"]);

        let settings = effective_settings(&cli, stored);

        assert_eq!(settings.width, 1920);
        assert_eq!(settings.device.as_deref(), Some("/dev/video4"));
        assert!(settings.show_face_bounds);
    }

    #[test]
    fn test_asset_dir_only_from_flag_or_settings() {
        let cli = parse(&["--output", "o.png"]);
        assert!(effective_settings(&cli, Settings::default()).asset_dir.is_none());

        let cli = parse(&["--output", "o.png", "--asset-dir", "/opt/facemask/assets"]);
        assert_eq!(
            effective_settings(&cli, Settings::default()).asset_dir,
            Some(PathBuf::from("/opt/facemask/assets"))
        );
    }

    #[test]
    fn test_position_flag_clears_stored_device() {
        let stored = Settings {
            device: Some("/dev/video4".into()),
            ..Settings::default()
        };
        let cli = parse(&["--output", "o.png", "--position", "back"]);

        let settings = effective_settings(&cli, stored);

        assert_eq!(settings.position, CameraPosition::Back);
        assert!(settings.device.is_none());
    }
}
