use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::TrySendError;

use crate::capture::domain::capture_device::CaptureDevice;
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::{CaptureStats, FrameHandler, FrameSource};
use crate::shared::frame::{Frame, FRAME_CHANNELS};

/// Frame source with a dedicated capture thread and a single processing
/// worker.
///
/// Layout: `device → capture thread → [slot of 1] → worker → handler`
///
/// The capture thread never waits on the worker: when the slot is still
/// occupied the newly captured frame is dropped. The worker calls the
/// handler for one frame at a time, so calls never overlap and arrive in
/// sequence order.
pub struct ThreadedFrameSource {
    device: Option<Box<dyn CaptureDevice>>,
    handler: Option<FrameHandler>,
    running: Option<Running>,
    counters: Arc<Counters>,
}

struct Running {
    stop: Arc<AtomicBool>,
    capture: JoinHandle<Box<dyn CaptureDevice>>,
    worker: JoinHandle<FrameHandler>,
}

#[derive(Default)]
struct Counters {
    captured: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
}

impl ThreadedFrameSource {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device: Some(device),
            handler: None,
            running: None,
            counters: Arc::new(Counters::default()),
        }
    }

    fn spawn_threads(
        &self,
        device: Box<dyn CaptureDevice>,
        handler: FrameHandler,
    ) -> Result<Running, CaptureError> {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(1);
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let stop = stop.clone();
            let counters = self.counters.clone();
            std::thread::Builder::new()
                .name("frame-worker".into())
                .spawn(move || run_worker(handler, frame_rx, stop, counters))
                .map_err(|e| CaptureError::ConfigurationFailed(format!("worker thread: {e}")))?
        };

        let capture = {
            let stop = stop.clone();
            let counters = self.counters.clone();
            std::thread::Builder::new()
                .name("frame-capture".into())
                .spawn(move || run_capture(device, frame_tx, stop, counters))
                .map_err(|e| CaptureError::ConfigurationFailed(format!("capture thread: {e}")))?
        };

        Ok(Running {
            stop,
            capture,
            worker,
        })
    }
}

impl FrameSource for ThreadedFrameSource {
    fn on_frame(&mut self, handler: FrameHandler) {
        self.handler = Some(handler);
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_running() {
            return Ok(());
        }
        // Reap a run that ended on its own (end of stream, device lost).
        self.stop();

        let handler = self.handler.take().ok_or_else(|| {
            CaptureError::ConfigurationFailed("no frame handler subscribed".into())
        })?;
        let Some(mut device) = self.device.take() else {
            self.handler = Some(handler);
            return Err(CaptureError::ConfigurationFailed(
                "capture device was lost by a previous run".into(),
            ));
        };

        let format = match device.open() {
            Ok(format) => format,
            Err(e) => {
                self.device = Some(device);
                self.handler = Some(handler);
                return Err(e);
            }
        };
        log::info!(
            "Capturing from {} ({}x{} @ {:.1} fps)",
            format.source,
            format.width,
            format.height,
            format.fps
        );

        self.running = Some(self.spawn_threads(device, handler)?);
        Ok(())
    }

    fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.stop.store(true, Ordering::Release);

        match running.capture.join() {
            Ok(device) => self.device = Some(device),
            Err(_) => log::error!("Capture thread panicked"),
        }
        // The capture thread dropped its sender, so the worker finishes the
        // frame in flight and exits.
        match running.worker.join() {
            Ok(handler) => {
                if self.handler.is_none() {
                    self.handler = Some(handler);
                }
            }
            Err(_) => log::error!("Frame worker panicked"),
        }

        let stats = self.stats();
        log::info!(
            "Capture stopped: {} captured, {} dropped, {} delivered",
            stats.captured,
            stats.dropped,
            stats.delivered
        );
    }

    fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.capture.is_finished() || !r.worker.is_finished())
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            captured: self.counters.captured.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ThreadedFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_capture(
    mut device: Box<dyn CaptureDevice>,
    frame_tx: crossbeam_channel::Sender<Frame>,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
) -> Box<dyn CaptureDevice> {
    while !stop.load(Ordering::Acquire) {
        let pixels = match device.read_frame() {
            Ok(Some(pixels)) => pixels,
            Ok(None) => {
                log::info!("Capture stream ended");
                break;
            }
            Err(e) => {
                log::warn!("Capture interrupted: {e}");
                break;
            }
        };

        let expected = (pixels.width as usize) * (pixels.height as usize) * FRAME_CHANNELS;
        if pixels.data.len() != expected {
            log::warn!(
                "Discarding malformed capture buffer ({} bytes for {}x{})",
                pixels.data.len(),
                pixels.width,
                pixels.height
            );
            continue;
        }

        let sequence = counters.captured.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::new(pixels.data, pixels.width, pixels.height, sequence);
        match frame_tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
    device.close();
    device
}

fn run_worker(
    mut handler: FrameHandler,
    frame_rx: crossbeam_channel::Receiver<Frame>,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
) -> FrameHandler {
    for frame in frame_rx {
        // A frame still waiting in the slot when stop is requested is
        // discarded rather than started.
        if stop.load(Ordering::Acquire) {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        handler(frame);
        counters.delivered.fetch_add(1, Ordering::Relaxed);
    }
    handler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_device::CapturedPixels;
    use crate::capture::domain::capture_format::CaptureFormat;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    struct FakeDevice {
        remaining: Option<usize>,
        interval: Duration,
        open_error: Option<CaptureError>,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    impl FakeDevice {
        fn finite(frames: usize, interval: Duration) -> Self {
            Self {
                remaining: Some(frames),
                interval,
                open_error: None,
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn endless(interval: Duration) -> Self {
            Self {
                remaining: None,
                ..Self::finite(0, interval)
            }
        }
    }

    impl CaptureDevice for FakeDevice {
        fn open(&mut self) -> Result<CaptureFormat, CaptureError> {
            if let Some(e) = &self.open_error {
                return Err(e.clone());
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(CaptureFormat {
                width: 4,
                height: 2,
                fps: 0.0,
                source: "fake".into(),
            })
        }

        fn read_frame(&mut self) -> Result<Option<CapturedPixels>, CaptureError> {
            if let Some(remaining) = self.remaining.as_mut() {
                if *remaining == 0 {
                    return Ok(None);
                }
                *remaining -= 1;
            }
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
            Ok(Some(CapturedPixels {
                data: vec![0u8; 4 * 2 * 3],
                width: 4,
                height: 2,
            }))
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recording_handler() -> (FrameHandler, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: FrameHandler = Box::new(move |frame: Frame| {
            sink.lock().unwrap().push(frame.sequence());
        });
        (handler, seen)
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    fn assert_strictly_increasing(seq: &[u64]) {
        for pair in seq.windows(2) {
            assert!(pair[0] < pair[1], "sequence regressed: {pair:?}");
        }
    }

    #[test]
    fn test_delivers_frames_in_order() {
        let mut source = ThreadedFrameSource::new(Box::new(FakeDevice::finite(
            20,
            Duration::from_millis(2),
        )));
        let (handler, seen) = recording_handler();
        source.on_frame(handler);

        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || !source.is_running()));
        source.stop();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert_strictly_increasing(&seen);
        let stats = source.stats();
        assert_eq!(stats.captured, 20);
        assert_eq!(stats.delivered as usize, seen.len());
        assert_eq!(stats.delivered + stats.dropped, stats.captured);
    }

    #[test]
    fn test_overrun_drops_frames_without_overlap() {
        let mut source = ThreadedFrameSource::new(Box::new(FakeDevice::finite(50, Duration::ZERO)));
        let in_callback = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let in_callback = in_callback.clone();
            let overlapped = overlapped.clone();
            let seen = seen.clone();
            source.on_frame(Box::new(move |frame: Frame| {
                if in_callback.swap(true, Ordering::SeqCst) {
                    overlapped.store(true, Ordering::SeqCst);
                }
                std::thread::sleep(Duration::from_millis(5));
                seen.lock().unwrap().push(frame.sequence());
                in_callback.store(false, Ordering::SeqCst);
            }));
        }

        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || !source.is_running()));
        source.stop();

        assert!(!overlapped.load(Ordering::SeqCst));
        let stats = source.stats();
        assert_eq!(stats.captured, 50);
        assert!(stats.dropped > 0);
        assert!(stats.delivered < stats.captured);
        assert_eq!(stats.delivered + stats.dropped, stats.captured);
        assert_strictly_increasing(&seen.lock().unwrap());
    }

    #[test]
    fn test_start_without_handler_fails() {
        let mut source = ThreadedFrameSource::new(Box::new(FakeDevice::endless(Duration::ZERO)));
        let err = source.start().unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
        assert!(!source.is_running());
    }

    #[test]
    fn test_open_failure_surfaces_from_start_every_time() {
        let mut device = FakeDevice::endless(Duration::ZERO);
        device.open_error = Some(CaptureError::PermissionDenied("/dev/video0".into()));
        let mut source = ThreadedFrameSource::new(Box::new(device));
        let (handler, seen) = recording_handler();
        source.on_frame(handler);

        for _ in 0..2 {
            assert_eq!(
                source.start(),
                Err(CaptureError::PermissionDenied("/dev/video0".into()))
            );
            assert!(!source.is_running());
        }
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_start_twice_opens_once() {
        let device = FakeDevice::endless(Duration::from_millis(1));
        let opened = device.opened.clone();
        let mut source = ThreadedFrameSource::new(Box::new(device));
        let (handler, _seen) = recording_handler();
        source.on_frame(handler);

        source.start().unwrap();
        source.start().unwrap();
        assert!(source.is_running());
        source.stop();

        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut source = ThreadedFrameSource::new(Box::new(FakeDevice::endless(Duration::ZERO)));
        source.stop();
        source.stop();
        assert!(!source.is_running());
        assert_eq!(source.stats(), CaptureStats::default());
    }

    #[test]
    fn test_stop_closes_device_and_is_idempotent() {
        let device = FakeDevice::endless(Duration::from_millis(1));
        let closed = device.closed.clone();
        let mut source = ThreadedFrameSource::new(Box::new(device));
        let (handler, seen) = recording_handler();
        source.on_frame(handler);

        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || seen.lock().unwrap().len() >= 3));
        source.stop();
        source.stop();

        assert!(!source.is_running());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_lets_in_flight_frame_finish() {
        let mut source =
            ThreadedFrameSource::new(Box::new(FakeDevice::endless(Duration::from_millis(1))));
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        {
            let started = started.clone();
            let finished = finished.clone();
            source.on_frame(Box::new(move |_frame: Frame| {
                started.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
                finished.fetch_add(1, Ordering::SeqCst);
            }));
        }

        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || started.load(Ordering::SeqCst) >= 1));
        source.stop();

        let started = started.load(Ordering::SeqCst);
        assert!(started >= 1);
        assert_eq!(finished.load(Ordering::SeqCst), started);
        assert_eq!(source.stats().delivered as usize, started);
    }

    #[test]
    fn test_restart_keeps_sequence_increasing() {
        let mut source =
            ThreadedFrameSource::new(Box::new(FakeDevice::endless(Duration::from_millis(1))));
        let (handler, seen) = recording_handler();
        source.on_frame(handler);

        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || seen.lock().unwrap().len() >= 3));
        source.stop();
        let first_run = seen.lock().unwrap().len();

        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            seen.lock().unwrap().len() >= first_run + 3
        }));
        source.stop();

        assert_strictly_increasing(&seen.lock().unwrap());
    }

    #[test]
    fn test_restart_after_end_of_stream_replays() {
        let device = FakeDevice::finite(3, Duration::ZERO);
        let opened = device.opened.clone();
        let mut source = ThreadedFrameSource::new(Box::new(device));
        let (handler, _seen) = recording_handler();
        source.on_frame(handler);

        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || !source.is_running()));
        source.start().unwrap();
        source.stop();

        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }
}
