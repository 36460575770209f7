use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::crop::{AspectRatio, DragAnchor};
use super::metadata::EXPORT_FILE_NAME;

/// Cropper settings. Every field is optional in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropperConfig {
    /// Preview refresh period
    pub preview_interval_ms: u64,
    /// Ratio used for the first Start
    pub default_aspect_ratio: AspectRatio,
    pub drag_anchor: DragAnchor,
    pub export_file_name: String,
    /// Export directory; `None` uses the user's download directory
    pub export_dir: Option<PathBuf>,
}

impl Default for CropperConfig {
    fn default() -> Self {
        Self {
            preview_interval_ms: 100,
            default_aspect_ratio: AspectRatio::NineSixteen,
            drag_anchor: DragAnchor::Rolling,
            export_file_name: EXPORT_FILE_NAME.into(),
            export_dir: None,
        }
    }
}

/// Config loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

impl CropperConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Interval as a `Duration`; zero is bumped to 1ms so the ticker can't spin
    pub fn preview_interval(&self) -> Duration {
        Duration::from_millis(self.preview_interval_ms.max(1))
    }

    pub fn resolved_export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(default_export_dir)
    }
}

/// Downloads folder, falling back to the home directory
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CropperConfig::default();
        assert_eq!(config.preview_interval(), Duration::from_millis(100));
        assert_eq!(config.default_aspect_ratio, AspectRatio::NineSixteen);
        assert_eq!(config.export_file_name, "video-cropper-metadata.json");
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cropper.json");
        std::fs::write(&path, r#"{ "defaultAspectRatio": "16:9", "dragAnchor": "fixed" }"#).unwrap();

        let config = CropperConfig::load(&path).unwrap();
        assert_eq!(config.default_aspect_ratio, AspectRatio::SixteenNine);
        assert_eq!(config.drag_anchor, DragAnchor::Fixed);
        assert_eq!(config.preview_interval_ms, 100);
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "defaultAspectRatio": "3:2" }"#).unwrap();
        assert!(matches!(CropperConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_explicit_export_dir() {
        let config = CropperConfig {
            export_dir: Some(PathBuf::from("/tmp/crops")),
            ..Default::default()
        };
        assert_eq!(config.resolved_export_dir(), PathBuf::from("/tmp/crops"));
        assert_eq!(CropperConfig::default().preview_interval_ms, 100);
    }
}
