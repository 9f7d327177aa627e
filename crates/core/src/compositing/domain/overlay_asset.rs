use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayAssetError {
    #[error("failed to decode overlay asset {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("overlay asset {path} has zero size")]
    Empty { path: PathBuf },
}

/// The masking image painted over each detected mouth.
///
/// Loaded once at startup and shared read-only behind an `Arc` for the
/// rest of the process; never mutated after load.
#[derive(Debug)]
pub struct OverlayAsset {
    image: RgbaImage,
}

impl OverlayAsset {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Decodes the asset at `path` (any format the `image` crate reads).
    pub fn load(path: &Path) -> Result<Arc<Self>, OverlayAssetError> {
        let image = image::open(path)
            .map_err(|e| OverlayAssetError::Decode {
                path: path.to_path_buf(),
                source: e,
            })?
            .to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(OverlayAssetError::Empty {
                path: path.to_path_buf(),
            });
        }
        log::info!(
            "Loaded overlay asset {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Arc::new(Self::new(image)))
    }

    /// Native size in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Resampled copy at exactly `width x height`.
    pub fn scaled(&self, width: u32, height: u32) -> RgbaImage {
        if self.image.dimensions() == (width, height) {
            return self.image.clone();
        }
        image::imageops::resize(&self.image, width, height, FilterType::Triangle)
    }

    /// Nearest-neighbour pixel at `(x, y)` of the asset stretched to
    /// `width x height`, without materialising the stretched image.
    pub fn sample(&self, x: u32, y: u32, width: u32, height: u32) -> [u8; 4] {
        let (src_w, src_h) = self.image.dimensions();
        let sx = (x as u64 * src_w as u64 / width.max(1) as u64).min(src_w as u64 - 1);
        let sy = (y as u64 * src_h as u64 / height.max(1) as u64).min(src_h as u64 - 1);
        self.image.get_pixel(sx as u32, sy as u32).0
    }
}
