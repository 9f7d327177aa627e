use std::path::Path;

use crate::shared::composited_image::CompositedImage;

/// Writes a single composited image to an image file.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, image: &CompositedImage) -> Result<(), Box<dyn std::error::Error>>;
}
