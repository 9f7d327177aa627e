use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::capture::domain::capture_error::CaptureError;

/// Which way a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    Back,
    External,
    /// Matches any device when selecting.
    Any,
}

impl CameraPosition {
    /// Best guess from the name a driver reports.
    pub fn infer_from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        const FRONT: &[&str] = &["front", "user", "facetime", "integrated", "built-in", "internal"];
        const BACK: &[&str] = &["back", "rear", "environment", "world"];
        if FRONT.iter().any(|k| lower.contains(k)) {
            CameraPosition::Front
        } else if BACK.iter().any(|k| lower.contains(k)) {
            CameraPosition::Back
        } else {
            CameraPosition::External
        }
    }

    fn matches(self, other: CameraPosition) -> bool {
        self == CameraPosition::Any || self == other
    }
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::Back => write!(f, "back"),
            CameraPosition::External => write!(f, "external"),
            CameraPosition::Any => write!(f, "any"),
        }
    }
}

impl FromStr for CameraPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "front" => Ok(CameraPosition::Front),
            "back" => Ok(CameraPosition::Back),
            "external" => Ok(CameraPosition::External),
            "any" => Ok(CameraPosition::Any),
            other => Err(format!(
                "camera position must be one of: front, back, external, any, got '{other}'"
            )),
        }
    }
}

/// A camera the platform reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Locator handed to the capture backend (`/dev/video0`, `0`, `video=…`).
    pub locator: String,
    pub name: String,
    pub position: CameraPosition,
}

/// Lists the cameras currently attached.
pub trait DeviceCatalog: Send + Sync {
    fn enumerate(&self) -> Result<Vec<CameraDevice>, CaptureError>;
}

/// Picks the camera to capture from. Resolved once, before the source is
/// built.
///
/// When several devices face the requested way the last one listed wins.
pub fn select_device(
    devices: &[CameraDevice],
    position: CameraPosition,
) -> Result<CameraDevice, CaptureError> {
    devices
        .iter()
        .rev()
        .find(|d| position.matches(d.position))
        .cloned()
        .ok_or_else(|| {
            CaptureError::DeviceUnavailable(format!(
                "no {position} camera among {} device(s)",
                devices.len()
            ))
        })
}
