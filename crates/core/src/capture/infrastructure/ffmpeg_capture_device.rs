use std::path::PathBuf;
use std::time::{Duration, Instant};

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::capture::domain::capture_device::{CaptureDevice, CapturedPixels};
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::capture_format::CaptureFormat;

/// libavdevice input used for live cameras on this platform.
#[cfg(target_os = "linux")]
pub const CAMERA_INPUT_FORMAT: &str = "v4l2";
#[cfg(target_os = "macos")]
pub const CAMERA_INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
pub const CAMERA_INPUT_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const CAMERA_INPUT_FORMAT: &str = "v4l2";

const EPERM: i32 = 1;
const ENOENT: i32 = 2;
const ENXIO: i32 = 6;
const EACCES: i32 = 13;
const EBUSY: i32 = 16;
const ENODEV: i32 = 19;
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
const EAGAIN: i32 = 35;
#[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
const EAGAIN: i32 = 11;

/// Back-off between reads while the device has nothing ready.
const RETRY_DELAY: Duration = Duration::from_millis(2);
/// Consecutive empty reads before the device is treated as gone.
const MAX_READ_RETRIES: u32 = 1000;

/// Requested camera mode. The driver may pick the nearest mode it supports.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub locator: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CaptureInput {
    Camera(CameraConfig),
    /// A recorded video played back at its own frame rate, standing in for
    /// a live camera.
    File(PathBuf),
}

impl CaptureInput {
    fn label(&self) -> String {
        match self {
            CaptureInput::Camera(cfg) => cfg.locator.clone(),
            CaptureInput::File(path) => path.display().to_string(),
        }
    }
}

/// Captures through libavformat/libavdevice and converts every decoded
/// frame to RGB24.
pub struct FfmpegCaptureDevice {
    input: CaptureInput,
    state: Option<DecodeState>,
}

// Safety: the device is opened on the caller's thread and then moved to the
// capture thread, which is its only user from then on. The raw pointers
// inside ffmpeg types are never shared between threads.
unsafe impl Send for FfmpegCaptureDevice {}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<((Pixel, u32, u32), scaling::Context)>,
    video_stream_index: usize,
    pacer: Option<Pacer>,
    flushing: bool,
    retries: u32,
}

impl FfmpegCaptureDevice {
    pub fn new(input: CaptureInput) -> Self {
        Self { input, state: None }
    }

    pub fn camera(config: CameraConfig) -> Self {
        Self::new(CaptureInput::Camera(config))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(CaptureInput::File(path.into()))
    }
}

impl CaptureDevice for FfmpegCaptureDevice {
    fn open(&mut self) -> Result<CaptureFormat, CaptureError> {
        self.close();
        ffmpeg_next::init()
            .map_err(|e| CaptureError::ConfigurationFailed(format!("ffmpeg init: {e}")))?;

        let label = self.input.label();
        let (ictx, paced) = match &self.input {
            CaptureInput::Camera(config) => (open_camera(config)?, false),
            CaptureInput::File(path) => (
                ffmpeg_next::format::input(path).map_err(|e| map_open_error(&label, e))?,
                true,
            ),
        };

        let (video_stream_index, decoder, fps) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| {
                    CaptureError::ConfigurationFailed(format!("{label}: no video stream"))
                })?;
            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                    .map_err(|e| CaptureError::ConfigurationFailed(format!("{label}: {e}")))?;
            let decoder = codec_ctx
                .decoder()
                .video()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("{label}: {e}")))?;
            let rate = stream.rate();
            let fps = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            };
            (stream.index(), decoder, fps)
        };

        let format = CaptureFormat {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            source: label,
        };

        self.state = Some(DecodeState {
            ictx,
            decoder,
            scaler: None,
            video_stream_index,
            pacer: if paced {
                format.frame_interval().map(Pacer::new)
            } else {
                None
            },
            flushing: false,
            retries: 0,
        });

        Ok(format)
    }

    fn read_frame(&mut self) -> Result<Option<CapturedPixels>, CaptureError> {
        let Some(state) = self.state.as_mut() else {
            return Err(CaptureError::ConfigurationFailed(
                "capture device not opened".into(),
            ));
        };
        let pixels = state.next_pixels()?;
        if pixels.is_some() {
            if let Some(pacer) = state.pacer.as_mut() {
                pacer.wait();
            }
        }
        Ok(pixels)
    }

    fn close(&mut self) {
        self.state = None;
    }
}

impl DecodeState {
    fn next_pixels(&mut self) -> Result<Option<CapturedPixels>, CaptureError> {
        loop {
            if let Some(pixels) = self.try_receive()? {
                return Ok(Some(pixels));
            }
            if self.flushing {
                return Ok(None);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match classify_read(packet.read(&mut self.ictx)) {
                ReadOutcome::Packet => self.retries = 0,
                ReadOutcome::EndOfStream => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                    continue;
                }
                ReadOutcome::Retry => {
                    self.retries += 1;
                    if self.retries > MAX_READ_RETRIES {
                        return Err(CaptureError::DeviceUnavailable(
                            "device stopped delivering frames".into(),
                        ));
                    }
                    std::thread::sleep(RETRY_DELAY);
                    continue;
                }
                ReadOutcome::Lost(e) => return Err(e),
            }
            if packet.stream() != self.video_stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<CapturedPixels>, CaptureError> {
        let mut decoded = Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let width = decoded.width();
        let height = decoded.height();
        let scaler = self.scaler_for(decoded.format(), width, height)?;
        let mut rgb_frame = Video::empty();
        scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("pixel conversion: {e}")))?;

        Ok(Some(CapturedPixels {
            data: extract_rgb_pixels(&rgb_frame, width, height),
            width,
            height,
        }))
    }

    /// Scaler for the decoded frame's layout. Cameras may renegotiate the
    /// mode after opening, so it is rebuilt whenever the input changes.
    fn scaler_for(
        &mut self,
        format: Pixel,
        width: u32,
        height: u32,
    ) -> Result<&mut scaling::Context, CaptureError> {
        let key = (format, width, height);
        let stale = self.scaler.as_ref().map_or(true, |(k, _)| *k != key);
        if stale {
            let ctx = scaling::Context::get(
                format,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                scaling::Flags::BILINEAR,
            )
            .map_err(|e| CaptureError::ConfigurationFailed(format!("pixel conversion: {e}")))?;
            self.scaler = Some((key, ctx));
        }
        match self.scaler.as_mut() {
            Some((_, ctx)) => Ok(ctx),
            None => Err(CaptureError::ConfigurationFailed(
                "pixel conversion unavailable".into(),
            )),
        }
    }
}

/// Sleeps so frames come out no faster than the stream's nominal rate.
struct Pacer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        match self.next_due {
            Some(due) if due > now => {
                std::thread::sleep(due - now);
                self.next_due = Some(due + self.interval);
            }
            _ => self.next_due = Some(now + self.interval),
        }
    }
}

fn open_camera(
    config: &CameraConfig,
) -> Result<ffmpeg_next::format::context::Input, CaptureError> {
    let input_format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == CAMERA_INPUT_FORMAT)
        .ok_or_else(|| {
            CaptureError::ConfigurationFailed(format!(
                "ffmpeg was built without the {CAMERA_INPUT_FORMAT} input device"
            ))
        })?;

    let mut options = ffmpeg_next::Dictionary::new();
    options.set("video_size", &format!("{}x{}", config.width, config.height));
    options.set("framerate", &config.framerate.to_string());

    let context = ffmpeg_next::format::open_with(
        &config.locator,
        &ffmpeg_next::format::format::Format::Input(input_format),
        options,
    )
    .map_err(|e| map_open_error(&config.locator, e))?;

    match context {
        ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
        _ => Err(CaptureError::ConfigurationFailed(format!(
            "{}: not an input device",
            config.locator
        ))),
    }
}

#[derive(Debug, PartialEq)]
enum ReadOutcome {
    Packet,
    EndOfStream,
    /// Nothing ready yet; read again.
    Retry,
    /// The device went away mid-stream.
    Lost(CaptureError),
}

fn classify_read(result: Result<(), ffmpeg_next::Error>) -> ReadOutcome {
    match result {
        Ok(()) => ReadOutcome::Packet,
        Err(ffmpeg_next::Error::Eof) => ReadOutcome::EndOfStream,
        Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => ReadOutcome::Retry,
        Err(e) => ReadOutcome::Lost(CaptureError::DeviceUnavailable(format!(
            "read failed: {e}"
        ))),
    }
}

/// Maps an open failure onto the startup error kinds.
pub fn map_open_error(locator: &str, error: ffmpeg_next::Error) -> CaptureError {
    match error {
        ffmpeg_next::Error::Other { errno } if errno == EACCES || errno == EPERM => {
            CaptureError::PermissionDenied(format!("{locator}: {error}"))
        }
        ffmpeg_next::Error::Other { errno }
            if matches!(errno, ENOENT | ENODEV | ENXIO | EBUSY) =>
        {
            CaptureError::DeviceUnavailable(format!("{locator}: {error}"))
        }
        _ => CaptureError::ConfigurationFailed(format!("{locator}: {error}")),
    }
}

fn extract_rgb_pixels(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
