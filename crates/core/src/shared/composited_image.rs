use crate::shared::frame::FRAME_CHANNELS;

/// Final per-frame image: the captured frame with overlays painted in.
///
/// Produced by value for every frame and moved to presentation; nothing
/// holds on to it after `present` takes it.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl CompositedImage {
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

    /// RGB24 pixels, row-major, top row first.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sequence number of the frame this image was composited from.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * FRAME_CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn into_rgb_image(self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data)
    }
}
