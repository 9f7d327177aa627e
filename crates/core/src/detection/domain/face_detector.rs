use crate::detection::domain::face_feature::FaceFeature;
use crate::shared::frame::Frame;

/// Domain interface for the external face detector.
///
/// Called synchronously once per frame on the processing worker. Returns an
/// empty vector, not an error, when the frame has no faces. Coordinates are
/// reported with a bottom-left origin; callers do the flip.
///
/// Implementations may keep internal state, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceFeature>, Box<dyn std::error::Error>>;
}

/// Detector that never finds anything. The pipeline still runs and every
/// frame is presented unmodified.
pub struct NoFaceDetector;

impl FaceDetector for NoFaceDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceFeature>, Box<dyn std::error::Error>> {
        Ok(Vec::new())
    }
}
