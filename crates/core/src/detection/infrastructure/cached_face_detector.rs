use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_feature::FaceFeature;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FeatureCacheError {
    #[error("failed to read feature file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid feature file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Replays pre-computed detector output by frame sequence number.
///
/// Lets the pipeline run against features recorded from an external
/// detector. Frames without an entry get no features.
pub struct CachedFaceDetector {
    cache: Arc<HashMap<u64, Vec<FaceFeature>>>,
}

impl CachedFaceDetector {
    pub fn new(cache: Arc<HashMap<u64, Vec<FaceFeature>>>) -> Self {
        Self { cache }
    }

    /// Loads a JSON object mapping sequence numbers to feature lists:
    /// `{"0": [{"bounds": {...}, "mouth_position": {...}}], "1": []}`.
    pub fn from_json_file(path: &Path) -> Result<Self, FeatureCacheError> {
        let json = std::fs::read_to_string(path).map_err(|e| FeatureCacheError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let cache: HashMap<u64, Vec<FaceFeature>> =
            serde_json::from_str(&json).map_err(|e| FeatureCacheError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        log::info!(
            "Loaded recorded features for {} frames from {}",
            cache.len(),
            path.display()
        );
        Ok(Self::new(Arc::new(cache)))
    }
}

impl FaceDetector for CachedFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceFeature>, Box<dyn std::error::Error>> {
        Ok(self
            .cache
            .get(&frame.sequence())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::{Point, Rect};

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, sequence)
    }

    fn feature(x: f64) -> FaceFeature {
        FaceFeature::face(
            Rect::new(x, 20.0, 50.0, 50.0),
            Some(Point::new(x + 25.0, 30.0)),
        )
    }

    #[test]
    fn test_returns_cached_features_for_known_frame() {
        let features = vec![feature(10.0), feature(60.0)];
        let cache = Arc::new(HashMap::from([(0, features.clone())]));
        let mut detector = CachedFaceDetector::new(cache);

        assert_eq!(detector.detect(&frame(0)).unwrap(), features);
    }

    #[test]
    fn test_returns_empty_for_unknown_frame() {
        let cache = Arc::new(HashMap::from([(0, vec![feature(10.0)])]));
        let mut detector = CachedFaceDetector::new(cache);

        assert!(detector.detect(&frame(5)).unwrap().is_empty());
    }

    #[test]
    fn test_from_json_file_parses_sequence_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        std::fs::write(
            &path,
            r#"{
                "1": [{"bounds": {"x": 10, "y": 20, "width": 100, "height": 120},
                       "mouth_position": {"x": 60, "y": 40}}],
                "2": [{"bounds": {"x": 0, "y": 0, "width": 5, "height": 5}, "kind": "generic"}]
            }"#,
        )
        .unwrap();

        let mut detector = CachedFaceDetector::from_json_file(&path).unwrap();

        let first = detector.detect(&frame(1)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].mouth_position, Some(Point::new(60.0, 40.0)));
        assert!(first[0].is_face());

        let second = detector.detect(&frame(2)).unwrap();
        assert!(!second[0].is_face());

        assert!(detector.detect(&frame(3)).unwrap().is_empty());
    }

    #[test]
    fn test_from_json_file_missing_file() {
        let err = CachedFaceDetector::from_json_file(Path::new("/nonexistent/features.json"))
            .err()
            .unwrap();
        assert!(matches!(err, FeatureCacheError::Read { .. }));
    }

    #[test]
    fn test_from_json_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = CachedFaceDetector::from_json_file(&path).err().unwrap();
        assert!(matches!(err, FeatureCacheError::Parse { .. }));
    }
}
