/// Bundled masking image, resolved by name at startup.
pub const OVERLAY_ASSET_NAME: &str = "hige_100.png";

/// Directory name used under the platform config/data directories.
pub const APP_DIR_NAME: &str = "FaceMask";

/// Overlay width as a fraction of the face bounding-box width.
pub const OVERLAY_WIDTH_RATIO: f64 = 0.8;

/// Overlay height as a fraction of the placed overlay width. Fixed so the
/// overlay scales with the face rather than keeping the asset's own aspect.
pub const OVERLAY_ASPECT_RATIO: f64 = 0.3;

pub const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 720;
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Colour of the optional face-bounds outline.
pub const FACE_OUTLINE_COLOR: [u8; 3] = [255, 0, 0];
