use serde::{Deserialize, Serialize};

use crate::shared::geometry::{Point, Rect};

/// What the detector recognised. Only face-typed features carry usable
/// landmarks; generic features are passed through but never decorated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    #[default]
    Face,
    Generic,
}

/// One detection result for one frame.
///
/// All coordinates are in the producing frame's pixel space with the origin
/// at the bottom-left corner, exactly as the detector reports them. They are
/// only meaningful against that frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceFeature {
    pub bounds: Rect,
    #[serde(default)]
    pub kind: FeatureKind,
    #[serde(default)]
    pub mouth_position: Option<Point>,
}

impl FaceFeature {
    pub fn face(bounds: Rect, mouth_position: Option<Point>) -> Self {
        Self {
            bounds,
            kind: FeatureKind::Face,
            mouth_position,
        }
    }

    pub fn generic(bounds: Rect) -> Self {
        Self {
            bounds,
            kind: FeatureKind::Generic,
            mouth_position: None,
        }
    }

    pub fn is_face(&self) -> bool {
        self.kind == FeatureKind::Face
    }
}
