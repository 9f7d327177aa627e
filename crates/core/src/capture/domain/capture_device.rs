use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::capture_format::CaptureFormat;

/// One decoded image straight off the device, before it is sequenced.
#[derive(Debug)]
pub struct CapturedPixels {
    /// RGB24, row-major, top row first.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Low-level frame producer driven by a frame source's capture thread.
///
/// `open` runs on the caller's thread so configuration problems surface from
/// `start`; `read_frame` and `close` run on the capture thread.
pub trait CaptureDevice: Send {
    fn open(&mut self) -> Result<CaptureFormat, CaptureError>;

    /// Blocks until the next frame is available. `Ok(None)` means the
    /// stream ended (file replay); an error means the device went away.
    fn read_frame(&mut self) -> Result<Option<CapturedPixels>, CaptureError>;

    /// Releases the device. Safe to call more than once.
    fn close(&mut self);
}
