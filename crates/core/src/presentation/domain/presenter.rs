use crate::shared::composited_image::CompositedImage;

/// Shows composited images to the user.
///
/// Called only from the presentation loop. Presenting is fire-and-forget:
/// failures are the presenter's to log, they never flow back into the
/// pipeline.
pub trait Presenter {
    fn present(&mut self, image: CompositedImage);
}
