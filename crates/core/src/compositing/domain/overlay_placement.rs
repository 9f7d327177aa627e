//! Where an overlay lands for one feature, in frame (top-left-origin) space.
//!
//! This is the only place detector coordinates are flipped.

use thiserror::Error;

use crate::detection::domain::face_feature::FaceFeature;
use crate::shared::constants::{OVERLAY_ASPECT_RATIO, OVERLAY_WIDTH_RATIO};
use crate::shared::geometry::{flip_point, flip_rect, Rect};

/// Why a feature got no overlay. Per-frame and recoverable: the feature is
/// skipped and the rest of the frame composites normally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementSkip {
    #[error("feature is not face-typed")]
    NotAFace,
    #[error("face has no mouth landmark")]
    NoMouth,
    #[error("bounding box width {0} is not usable")]
    DegenerateBounds(f64),
    #[error("mouth ({x}, {y}) lies outside the frame")]
    MouthOutsideFrame { x: f64, y: f64 },
}

/// Overlay size relative to the face it decorates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayGeometry {
    /// Overlay width as a fraction of the face bounding-box width.
    pub width_ratio: f64,
    /// Overlay height as a fraction of the overlay width.
    pub aspect_ratio: f64,
}

impl Default for OverlayGeometry {
    fn default() -> Self {
        Self {
            width_ratio: OVERLAY_WIDTH_RATIO,
            aspect_ratio: OVERLAY_ASPECT_RATIO,
        }
    }
}

impl OverlayGeometry {
    /// `(width, height)` of the overlay for a face `face_width` pixels wide.
    pub fn size_for(&self, face_width: f64) -> (f64, f64) {
        let width = face_width * self.width_ratio;
        (width, width * self.aspect_ratio)
    }

    /// Target rectangle in frame space, centred on the flipped mouth point.
    pub fn place(
        &self,
        feature: &FaceFeature,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Rect, PlacementSkip> {
        if !feature.is_face() {
            return Err(PlacementSkip::NotAFace);
        }
        let mouth = feature.mouth_position.ok_or(PlacementSkip::NoMouth)?;

        let face_width = feature.bounds.width;
        if !face_width.is_finite() || face_width <= 0.0 {
            return Err(PlacementSkip::DegenerateBounds(face_width));
        }
        let inside = mouth.is_finite()
            && (0.0..=frame_width as f64).contains(&mouth.x)
            && (0.0..=frame_height as f64).contains(&mouth.y);
        if !inside {
            return Err(PlacementSkip::MouthOutsideFrame {
                x: mouth.x,
                y: mouth.y,
            });
        }

        let center = flip_point(mouth, frame_height as f64);
        let (width, height) = self.size_for(face_width);
        Ok(Rect::centered_at(center, width, height))
    }
}

/// Face bounding box in frame space, for the optional outline.
/// `None` for generic or unusable features.
pub fn face_outline(feature: &FaceFeature, frame_height: u32) -> Option<Rect> {
    let b = feature.bounds;
    if !feature.is_face() || !b.is_finite() || b.width <= 0.0 || b.height <= 0.0 {
        return None;
    }
    Some(flip_rect(b, frame_height as f64))
}
