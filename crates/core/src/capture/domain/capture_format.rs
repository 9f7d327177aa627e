/// What an opened capture device delivers.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    /// Nominal frames per second; 0.0 when the device does not say.
    pub fps: f64,
    /// Human-readable device or file name, for logs.
    pub source: String,
}

impl CaptureFormat {
    /// Time between frames at the nominal rate, if there is one.
    pub fn frame_interval(&self) -> Option<std::time::Duration> {
        if self.fps > 0.0 && self.fps.is_finite() {
            Some(std::time::Duration::from_secs_f64(1.0 / self.fps))
        } else {
            None
        }
    }
}
