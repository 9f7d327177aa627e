use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::domain::camera_device::{CameraDevice, CameraPosition, DeviceCatalog};
use crate::capture::domain::capture_error::CaptureError;

const SYSFS_VIDEO4LINUX: &str = "/sys/class/video4linux";

/// Lists cameras known to the operating system.
///
/// On Linux the V4L2 class directory in sysfs is walked. Each capture node
/// becomes one device with its `/dev/videoN` locator. Metadata nodes (a
/// non-zero `index`) are skipped. macOS reports the default AVFoundation
/// camera. Other platforms need an explicit locator.
pub struct SystemDeviceCatalog {
    sysfs_root: PathBuf,
}

impl SystemDeviceCatalog {
    pub fn new() -> Self {
        Self::with_sysfs_root(SYSFS_VIDEO4LINUX)
    }

    pub fn with_sysfs_root(root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: root.into(),
        }
    }

    fn enumerate_v4l2(&self) -> Result<Vec<CameraDevice>, CaptureError> {
        let entries = match fs::read_dir(&self.sysfs_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(CaptureError::PermissionDenied(format!(
                    "{}: {e}",
                    self.sysfs_root.display()
                )))
            }
            Err(e) => {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "{}: {e}",
                    self.sysfs_root.display()
                )))
            }
        };

        let mut nodes: Vec<(u32, CameraDevice)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name();
                let node = file_name.to_str()?;
                let number: u32 = node.strip_prefix("video")?.parse().ok()?;
                let dir = entry.path();
                if !is_capture_node(&dir) {
                    log::debug!("Skipping {node}: not a capture node");
                    return None;
                }
                let name = read_attribute(&dir, "name").unwrap_or_else(|| node.to_string());
                Some((
                    number,
                    CameraDevice {
                        locator: format!("/dev/{node}"),
                        position: CameraPosition::infer_from_name(&name),
                        name,
                    },
                ))
            })
            .collect();

        nodes.sort_by_key(|(number, _)| *number);
        Ok(nodes.into_iter().map(|(_, device)| device).collect())
    }
}

impl Default for SystemDeviceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceCatalog for SystemDeviceCatalog {
    fn enumerate(&self) -> Result<Vec<CameraDevice>, CaptureError> {
        if cfg!(target_os = "macos") {
            return Ok(vec![CameraDevice {
                locator: "0".to_string(),
                name: "Default camera".to_string(),
                position: CameraPosition::Front,
            }]);
        }
        if cfg!(target_os = "windows") {
            return Err(CaptureError::DeviceUnavailable(
                "camera enumeration is not supported here; pass --device \"video=<name>\"".into(),
            ));
        }
        self.enumerate_v4l2()
    }
}

fn read_attribute(dir: &Path, attribute: &str) -> Option<String> {
    let value = fs::read_to_string(dir.join(attribute)).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn is_capture_node(dir: &Path) -> bool {
    read_attribute(dir, "index").map_or(true, |index| index == "0")
}
