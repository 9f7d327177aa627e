use thiserror::Error;

/// Startup failures of a capture source. Reported once from `start`,
/// never per frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("permission denied for capture device: {0}")]
    PermissionDenied(String),

    #[error("capture configuration failed: {0}")]
    ConfigurationFailed(String),
}
