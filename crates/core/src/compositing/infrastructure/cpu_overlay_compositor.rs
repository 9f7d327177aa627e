use std::cell::RefCell;
use std::sync::Arc;

use image::RgbaImage;

use crate::compositing::domain::overlay_asset::OverlayAsset;
use crate::compositing::domain::overlay_compositor::OverlayCompositor;
use crate::compositing::domain::overlay_placement::{face_outline, OverlayGeometry};
use crate::detection::domain::face_feature::FaceFeature;
use crate::shared::composited_image::CompositedImage;
use crate::shared::frame::{Frame, FRAME_CHANNELS};
use crate::shared::geometry::Rect;

/// Overlays more than this many times the frame size are blended straight
/// from the asset over their visible part instead of being resampled whole.
const MAX_RESAMPLE_FACTOR: u32 = 2;

/// CPU compositor that alpha-blends the overlay asset into the frame buffer.
///
/// The frame's own buffer becomes the output, so the only per-frame
/// allocation is resampling the asset, and that is skipped while the
/// overlay size stays the same from one placement to the next.
pub struct CpuOverlayCompositor {
    asset: Arc<OverlayAsset>,
    geometry: OverlayGeometry,
    outline_color: Option<[u8; 3]>,
    scaled: RefCell<Option<RgbaImage>>,
}

impl CpuOverlayCompositor {
    pub fn new(asset: Arc<OverlayAsset>, geometry: OverlayGeometry) -> Self {
        Self {
            asset,
            geometry,
            outline_color: None,
            scaled: RefCell::new(None),
        }
    }

    /// Also stroke a 1-px outline around every face-typed feature.
    pub fn with_face_outline(mut self, color: [u8; 3]) -> Self {
        self.outline_color = Some(color);
        self
    }

    fn draw_overlay(&self, data: &mut [u8], width: u32, height: u32, target: Rect) {
        let (left, top, w, h) = target.to_pixels();
        if w == 0 || h == 0 {
            return;
        }

        if w > width.saturating_mul(MAX_RESAMPLE_FACTOR)
            || h > height.saturating_mul(MAX_RESAMPLE_FACTOR)
        {
            let asset = &self.asset;
            blend_with(data, width, height, left, top, (w, h), |x, y| {
                asset.sample(x, y, w, h)
            });
            return;
        }

        let mut cache = self.scaled.borrow_mut();
        let stale = cache.as_ref().map_or(true, |img| img.dimensions() != (w, h));
        if stale {
            *cache = Some(self.asset.scaled(w, h));
        }
        if let Some(overlay) = cache.as_ref() {
            blend_onto_rgb(data, width, height, overlay, left, top);
        }
    }
}

impl OverlayCompositor for CpuOverlayCompositor {
    fn composite(&self, frame: Frame, features: &[FaceFeature]) -> CompositedImage {
        let width = frame.width();
        let height = frame.height();
        let sequence = frame.sequence();
        let mut data = frame.into_data();

        for feature in features {
            if let Some(color) = self.outline_color {
                if let Some(outline) = face_outline(feature, height) {
                    stroke_rect(&mut data, width, height, outline, color);
                }
            }
            match self.geometry.place(feature, width, height) {
                Ok(target) => self.draw_overlay(&mut data, width, height, target),
                Err(reason) => log::debug!("Frame {sequence}: overlay skipped: {reason}"),
            }
        }

        CompositedImage::new(data, width, height, sequence)
    }
}

/// Source-over blend of `src` at `(left, top)`, clipped to the destination.
fn blend_onto_rgb(dst: &mut [u8], dst_w: u32, dst_h: u32, src: &RgbaImage, left: i64, top: i64) {
    blend_with(dst, dst_w, dst_h, left, top, src.dimensions(), |x, y| {
        src.get_pixel(x, y).0
    });
}

/// Source-over blend of a `size` overlay at `(left, top)`. Only the part
/// inside the destination is visited; `sample` gets overlay coordinates.
fn blend_with(
    dst: &mut [u8],
    dst_w: u32,
    dst_h: u32,
    left: i64,
    top: i64,
    size: (u32, u32),
    sample: impl Fn(u32, u32) -> [u8; 4],
) {
    let (src_w, src_h) = size;
    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = (left + src_w as i64).min(dst_w as i64);
    let y1 = (top + src_h as i64).min(dst_h as i64);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for y in y0..y1 {
        let sy = (y - top) as u32;
        let row = (y as usize) * (dst_w as usize);
        for x in x0..x1 {
            let [r, g, b, a] = sample((x - left) as u32, sy);
            let idx = (row + x as usize) * FRAME_CHANNELS;
            match a {
                0 => {}
                255 => dst[idx..idx + 3].copy_from_slice(&[r, g, b]),
                _ => {
                    let a = a as u32;
                    let inv = 255 - a;
                    for (c, s) in [r, g, b].into_iter().enumerate() {
                        let d = dst[idx + c] as u32;
                        dst[idx + c] = ((s as u32 * a + d * inv + 127) / 255) as u8;
                    }
                }
            }
        }
    }
}

fn stroke_rect(dst: &mut [u8], dst_w: u32, dst_h: u32, rect: Rect, color: [u8; 3]) {
    let (left, top, w, h) = rect.to_pixels();
    if w == 0 || h == 0 {
        return;
    }
    let right = left + w as i64 - 1;
    let bottom = top + h as i64 - 1;

    let mut put = |x: i64, y: i64| {
        if x >= 0 && y >= 0 && x < dst_w as i64 && y < dst_h as i64 {
            let idx = ((y as usize) * (dst_w as usize) + x as usize) * FRAME_CHANNELS;
            dst[idx..idx + 3].copy_from_slice(&color);
        }
    };

    for x in left.max(0)..=right.min(dst_w as i64 - 1) {
        put(x, top);
        put(x, bottom);
    }
    for y in top.max(0)..=bottom.min(dst_h as i64 - 1) {
        put(left, y);
        put(right, y);
    }
}
