use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use facemask_core::capture::domain::camera_device::CameraPosition;
use facemask_core::shared::constants::{
    APP_DIR_NAME, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, DEFAULT_FRAME_RATE,
    OVERLAY_ASSET_NAME,
};

/// Persisted defaults. Command-line flags override every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Explicit device locator; when unset the camera is chosen by position.
    pub device: Option<String>,
    pub position: CameraPosition,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub asset: String,
    pub asset_dir: Option<PathBuf>,
    pub show_face_bounds: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: None,
            position: CameraPosition::Front,
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            framerate: DEFAULT_FRAME_RATE,
            asset: OVERLAY_ASSET_NAME.to_string(),
            asset_dir: None,
            show_face_bounds: false,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files give the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("no configuration directory on this system")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
