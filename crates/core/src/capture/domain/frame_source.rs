use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// Callback receiving each delivered frame, in sequence order.
pub type FrameHandler = Box<dyn FnMut(Frame) + Send>;

/// Delivers camera frames to one subscriber on a single sequential context.
///
/// Guarantees:
/// - handler invocations never overlap,
/// - sequence numbers of delivered frames strictly increase,
/// - frames arriving while the consumer is busy are dropped, not queued.
///
/// `start` and `stop` are idempotent.
pub trait FrameSource: Send {
    /// Replaces the subscriber. Takes effect on the next `start`.
    fn on_frame(&mut self, handler: FrameHandler);

    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stops capture and waits for the frame in flight to finish.
    fn stop(&mut self);

    /// True while started and the device is still producing.
    fn is_running(&self) -> bool;

    fn stats(&self) -> CaptureStats;
}

/// Counters since the source was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames read from the device.
    pub captured: u64,
    /// Frames discarded because the consumer was still busy.
    pub dropped: u64,
    /// Frames handed to the subscriber.
    pub delivered: u64,
}
