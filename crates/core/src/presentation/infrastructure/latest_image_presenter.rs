use std::path::{Path, PathBuf};

use crate::presentation::domain::image_writer::ImageWriter;
use crate::presentation::domain::presenter::Presenter;
use crate::shared::composited_image::CompositedImage;

/// Keeps one file on disk holding the most recently presented image.
///
/// Each image is written next to the target and renamed over it, so a
/// viewer polling the file never sees a half-written image.
pub struct LatestImagePresenter {
    writer: Box<dyn ImageWriter>,
    path: PathBuf,
    staging: PathBuf,
    written: u64,
}

impl LatestImagePresenter {
    pub fn new(writer: Box<dyn ImageWriter>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let staging = staging_path(&path);
        Self {
            writer,
            path,
            staging,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Images successfully written.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write(&self, image: &CompositedImage) -> Result<(), Box<dyn std::error::Error>> {
        self.writer.write(&self.staging, image)?;
        std::fs::rename(&self.staging, &self.path)?;
        Ok(())
    }
}

impl Presenter for LatestImagePresenter {
    fn present(&mut self, image: CompositedImage) {
        match self.write(&image) {
            Ok(()) => self.written += 1,
            Err(e) => log::warn!(
                "Failed to present frame {} to {}: {e}",
                image.sequence(),
                self.path.display()
            ),
        }
    }
}

/// `out/latest.png` stages as `out/latest.partial.png`, keeping the
/// extension so the writer picks the same format.
fn staging_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    path.with_file_name(name)
}
