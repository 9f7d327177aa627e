/// Bytes per pixel of every captured frame (RGB24).
pub const FRAME_CHANNELS: usize = 3;

/// A single captured camera frame: contiguous RGB bytes in row-major order,
/// top row first.
///
/// Frames are immutable once captured. Ownership moves from the capture
/// thread to the processing worker and then into the compositor, which
/// reuses the buffer as its drawing surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * FRAME_CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Capture order, strictly increasing for the lifetime of a source.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Gives up the pixel buffer without copying it.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
