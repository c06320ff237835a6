use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub dataset: DatasetSection,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSection {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_target_photo_count")]
    pub target_photo_count: u32,
    #[serde(default = "default_true")]
    pub require_front_face_first: bool,
    #[serde(default)]
    pub existing_subject_dir: ExistingDirPolicy,
}

/// What to do when `<root>/<subject>` already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingDirPolicy {
    /// Ask before capturing into the existing directory.
    #[default]
    Confirm,
    /// Reuse the directory silently.
    Proceed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_id: i32,
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default)]
    pub cascade_path: Option<PathBuf>,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default = "default_min_neighbors")]
    pub min_neighbors: i32,
    #[serde(default = "default_min_face_size")]
    pub min_face_size: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_capture_feedback_ms")]
    pub capture_feedback_ms: u64,
}

fn default_root() -> PathBuf { PathBuf::from("dataset") }
fn default_target_photo_count() -> u32 { 12 }
fn default_true() -> bool { true }
fn default_frame_width() -> u32 { 640 }
fn default_frame_height() -> u32 { 480 }
fn default_scale_factor() -> f64 { 1.1 }
fn default_min_neighbors() -> i32 { 5 }
fn default_min_face_size() -> i32 { 100 }
fn default_poll_interval_ms() -> u64 { 15 }
fn default_capture_feedback_ms() -> u64 { 500 }

/// Longest "CAPTURED!" feedback the previews will show.
pub const MAX_CAPTURE_FEEDBACK_MS: u64 = 5_000;

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            target_photo_count: default_target_photo_count(),
            require_front_face_first: default_true(),
            existing_subject_dir: ExistingDirPolicy::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cascade_path: None,
            scale_factor: default_scale_factor(),
            min_neighbors: default_min_neighbors(),
            min_face_size: default_min_face_size(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            capture_feedback_ms: default_capture_feedback_ms(),
        }
    }
}

impl DatasetConfig {
    /// Loads the config at `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        let mut config: DatasetConfig = serde_json::from_str(&content)
            .map_err(|source| DatasetError::Config { path: path.to_path_buf(), source })?;

        if config.dataset.target_photo_count == 0 {
            log::warn!("target_photo_count must be at least 1, using 1");
            config.dataset.target_photo_count = 1;
        }

        if config.preview.capture_feedback_ms > MAX_CAPTURE_FEEDBACK_MS {
            log::warn!(
                "capture_feedback_ms {} is too long, using {}",
                config.preview.capture_feedback_ms, MAX_CAPTURE_FEEDBACK_MS
            );
            config.preview.capture_feedback_ms = MAX_CAPTURE_FEEDBACK_MS;
        }

        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// `<config_dir>/face-dataset/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("face-dataset").join("config.json"))
    }

    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig::load(&dir.path().join("nope.json")).unwrap();

        assert_eq!(config.dataset.target_photo_count, 12);
        assert!(config.dataset.require_front_face_first);
        assert_eq!(config.dataset.existing_subject_dir, ExistingDirPolicy::Confirm);
        assert_eq!(config.camera.frame_width, 640);
        assert_eq!(config.camera.frame_height, 480);
        assert_eq!(config.detection.min_neighbors, 5);
        assert_eq!(config.detection.min_face_size, 100);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "dataset": { "root": "/tmp/faces", "existing_subject_dir": "proceed" },
                 "camera": { "device_id": 2 } }"#,
        )
        .unwrap();

        let config = DatasetConfig::load(&path).unwrap();
        assert_eq!(config.dataset.root, PathBuf::from("/tmp/faces"));
        assert_eq!(config.dataset.existing_subject_dir, ExistingDirPolicy::Proceed);
        assert_eq!(config.dataset.target_photo_count, 12);
        assert_eq!(config.camera.device_id, 2);
        assert_eq!(config.camera.frame_height, 480);
        assert_eq!(config.preview.poll_interval_ms, 15);
    }

    #[test]
    fn zero_target_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "dataset": { "target_photo_count": 0 } }"#).unwrap();

        let config = DatasetConfig::load(&path).unwrap();
        assert_eq!(config.dataset.target_photo_count, 1);
    }

    #[test]
    fn huge_feedback_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "preview": { "capture_feedback_ms": 18446744073709551615 } }"#).unwrap();

        let config = DatasetConfig::load(&path).unwrap();
        assert_eq!(config.preview.capture_feedback_ms, MAX_CAPTURE_FEEDBACK_MS);
        assert_eq!(config.preview.poll_interval_ms, 15);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(DatasetConfig::load(&path), Err(DatasetError::Config { .. })));
    }
}
