use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum AssetResolveError {
    #[error("asset '{name}' not found (searched: {searched})")]
    NotFound { name: String, searched: String },
}

/// Resolve a bundled asset file by name.
///
/// Resolution order:
/// 1. User asset directory (platform-specific, lets users swap the overlay)
/// 2. Bundled path (explicit `--asset-dir` or a packaged install)
/// 3. `assets/` next to the running executable
pub fn resolve(name: &str, bundled_dir: Option<&Path>) -> Result<PathBuf, AssetResolveError> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(dir) = user_asset_dir() {
        candidates.push(dir);
    }
    if let Some(dir) = bundled_dir {
        candidates.push(dir.to_path_buf());
    }
    if let Some(dir) = executable_asset_dir() {
        candidates.push(dir);
    }
    resolve_in(name, &candidates)
}

/// First existing `dir/name` among `dirs`, in order.
pub fn resolve_in(name: &str, dirs: &[PathBuf]) -> Result<PathBuf, AssetResolveError> {
    for dir in dirs {
        let path = dir.join(name);
        if path.is_file() {
            log::debug!("Resolved asset {name} at {}", path.display());
            return Ok(path);
        }
    }
    Err(AssetResolveError::NotFound {
        name: name.to_string(),
        searched: dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Platform-specific user asset directory.
///
/// - macOS: `~/Library/Application Support/FaceMask/assets/`
/// - Linux: `$XDG_DATA_HOME/FaceMask/assets/` or `~/.local/share/FaceMask/assets/`
/// - Windows: `%APPDATA%/FaceMask/assets/`
pub fn user_asset_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR_NAME).join("assets"))
}

fn executable_asset_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("assets")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_in_returns_first_match() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("hige.png"), b"a").unwrap();
        fs::write(second.join("hige.png"), b"b").unwrap();

        let path = resolve_in("hige.png", &[first.clone(), second]).unwrap();
        assert_eq!(path, first.join("hige.png"));
    }

    #[test]
    fn test_resolve_in_skips_dirs_without_file() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&empty).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("hige.png"), b"b").unwrap();

        let path = resolve_in("hige.png", &[empty, bundled.clone()]).unwrap();
        assert_eq!(path, bundled.join("hige.png"));
    }

    #[test]
    fn test_resolve_in_missing_reports_searched_dirs() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_in("nope.png", &[tmp.path().to_path_buf()]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope.png"));
        assert!(msg.contains(&tmp.path().display().to_string()));
    }

    #[test]
    fn test_resolve_in_ignores_directory_with_asset_name() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("hige.png")).unwrap();
        assert!(resolve_in("hige.png", &[tmp.path().to_path_buf()]).is_err());
    }

    #[test]
    fn test_resolve_uses_bundled_dir() {
        let tmp = TempDir::new().unwrap();
        let name = "facemask-test-asset-8c1f.png";
        fs::write(tmp.path().join(name), b"x").unwrap();
        let path = resolve(name, Some(tmp.path())).unwrap();
        assert_eq!(path, tmp.path().join(name));
    }

    #[test]
    fn test_resolve_without_bundled_dir_searches_next_to_executable() {
        let name = "facemask-test-asset-missing-3b7e.png";
        let err = resolve(name, None).unwrap_err();
        let exe_assets = executable_asset_dir().unwrap();
        assert!(err.to_string().contains(&exe_assets.display().to_string()));
    }

    #[test]
    fn test_user_asset_dir_contains_app_name() {
        if let Some(dir) = user_asset_dir() {
            assert!(dir.to_string_lossy().contains(APP_DIR_NAME));
        }
    }
}
