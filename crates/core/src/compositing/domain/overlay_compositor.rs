use crate::detection::domain::face_feature::FaceFeature;
use crate::shared::composited_image::CompositedImage;
use crate::shared::frame::Frame;

/// Domain interface for painting overlays onto a frame.
///
/// Takes the frame by value so implementations can draw straight into its
/// buffer. Infallible: a feature that cannot be placed is skipped, never
/// allowed to fail the whole frame.
pub trait OverlayCompositor: Send {
    fn composite(&self, frame: Frame, features: &[FaceFeature]) -> CompositedImage;
}
