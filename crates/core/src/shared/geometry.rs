//! Points and rectangles in frame pixel units, plus the mapping between the
//! detector's bottom-left-origin space and the top-left-origin space the
//! frame buffer and presentation use.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle given by its origin corner and size.
///
/// Which corner `(x, y)` names depends on the space the rectangle lives in:
/// the bottom-left corner in detector space, the top-left corner in
/// frame space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size whose centre is `center`.
    pub fn centered_at(center: Point, width: f64, height: f64) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Snaps to whole pixels: `(left, top, width, height)`.
    ///
    /// Edges are rounded independently so adjacent rectangles never leave
    /// a gap. Left/top may be negative or past the frame; callers clip.
    pub fn to_pixels(&self) -> (i64, i64, u32, u32) {
        let left = self.x.round() as i64;
        let top = self.y.round() as i64;
        let right = (self.x + self.width).round() as i64;
        let bottom = (self.y + self.height).round() as i64;
        (
            left,
            top,
            (right - left).max(0) as u32,
            (bottom - top).max(0) as u32,
        )
    }
}

/// Maps a detector-space y coordinate (origin at the bottom edge) into frame
/// space (origin at the top edge).
pub fn flip_y(y: f64, frame_height: f64) -> f64 {
    frame_height - y
}

pub fn flip_point(point: Point, frame_height: f64) -> Point {
    Point::new(point.x, flip_y(point.y, frame_height))
}

/// Maps a detector-space rectangle into frame space. The bottom-left origin
/// becomes the top-left origin, so the height is subtracted as well.
pub fn flip_rect(rect: Rect, frame_height: f64) -> Rect {
    Rect::new(
        rect.x,
        frame_height - rect.y - rect.height,
        rect.width,
        rect.height,
    )
}
