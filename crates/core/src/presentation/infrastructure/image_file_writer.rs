use std::path::Path;

use crate::presentation::domain::image_writer::ImageWriter;
use crate::shared::composited_image::CompositedImage;

/// Writes composited images with the `image` crate; the format follows the
/// file extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, image: &CompositedImage) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let img = image::RgbImage::from_raw(image.width(), image.height(), image.data().to_vec())
            .ok_or("composited image buffer does not match its dimensions")?;
        img.save(path)?;
        Ok(())
    }
}
