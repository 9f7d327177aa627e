use std::path::{Path, PathBuf};

use crate::presentation::domain::image_writer::ImageWriter;
use crate::presentation::domain::presenter::Presenter;
use crate::shared::composited_image::CompositedImage;

/// Saves every presented image as `frame_<sequence>.png` in a directory.
pub struct FrameSequencePresenter {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
    written: u64,
}

impl FrameSequencePresenter {
    pub fn new(writer: Box<dyn ImageWriter>, dir: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            dir: dir.into(),
            written: 0,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path_for(&self, sequence: u64) -> PathBuf {
        frame_path(&self.dir, sequence)
    }
}

impl Presenter for FrameSequencePresenter {
    fn present(&mut self, image: CompositedImage) {
        let path = self.path_for(image.sequence());
        match self.writer.write(&path, &image) {
            Ok(()) => self.written += 1,
            Err(e) => log::warn!("Failed to save {}: {e}", path.display()),
        }
    }
}

fn frame_path(dir: &Path, sequence: u64) -> PathBuf {
    dir.join(format!("frame_{sequence:06}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::infrastructure::image_file_writer::ImageFileWriter;

    #[test]
    fn test_frame_path_is_zero_padded() {
        assert_eq!(
            frame_path(Path::new("out"), 42),
            PathBuf::from("out/frame_000042.png")
        );
    }

    #[test]
    fn test_saves_one_file_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter =
            FrameSequencePresenter::new(Box::new(ImageFileWriter::new()), dir.path().join("frames"));

        for sequence in [3, 7] {
            presenter.present(CompositedImage::new(vec![0; 2 * 2 * 3], 2, 2, sequence));
        }

        assert_eq!(presenter.written(), 2);
        assert!(presenter.path_for(3).exists());
        assert!(presenter.path_for(7).exists());
        assert!(!presenter.path_for(5).exists());
    }
}
