use chrono::{DateTime, Local};
use log::{info, warn};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ExistingDirPolicy;
use crate::error::{DatasetError, Result};
use crate::frame::Frame;

pub const INFO_FILE_NAME: &str = "dataset_info.txt";

/// Writes a captured frame to disk.
pub trait PhotoWriter {
    fn write(&mut self, path: &Path, frame: &Frame) -> Result<()>;
}

#[cfg(feature = "vision")]
pub use jpeg::JpegWriter;

#[cfg(feature = "vision")]
mod jpeg {
    use opencv::core::Vector;
    use opencv::imgcodecs;
    use std::path::Path;

    use super::PhotoWriter;
    use crate::error::{DatasetError, Result};
    use crate::frame::Frame;

    #[derive(Debug, Clone)]
    pub struct JpegWriter {
        quality: i32,
    }

    impl JpegWriter {
        pub fn new(quality: i32) -> Self {
            Self { quality: quality.clamp(0, 100) }
        }
    }

    impl Default for JpegWriter {
        fn default() -> Self {
            Self::new(95)
        }
    }

    impl PhotoWriter for JpegWriter {
        fn write(&mut self, path: &Path, frame: &Frame) -> Result<()> {
            let failed = |reason: String| DatasetError::ImageWrite {
                path: path.to_path_buf(),
                reason,
            };
            let path_str = path
                .to_str()
                .ok_or_else(|| failed("path is not valid UTF-8".to_string()))?;

            let mat = frame.to_mat()?;
            let params = Vector::<i32>::from_slice(&[imgcodecs::IMWRITE_JPEG_QUALITY, self.quality]);
            let written = imgcodecs::imwrite(path_str, &mat, &params)
                .map_err(|e| failed(e.to_string()))?;

            if !written {
                return Err(failed("encoder refused the frame".to_string()));
            }
            Ok(())
        }
    }
}

/// Creates `<root>/<subject>`.
///
/// When the directory already exists and `policy` is `Confirm`, `confirm` is
/// asked whether to continue; `Ok(None)` means the user declined.
pub fn prepare_subject_dir<F>(
    root: &Path,
    subject: &str,
    policy: ExistingDirPolicy,
    mut confirm: F,
) -> Result<Option<PathBuf>>
where
    F: FnMut(&Path) -> Result<bool>,
{
    if !root.exists() {
        fs::create_dir_all(root).map_err(|e| DatasetError::io(root, e))?;
        info!("Created dataset directory {:?}", root);
    }

    let subject_dir = root.join(subject);
    if subject_dir.is_dir() {
        match policy {
            ExistingDirPolicy::Proceed => {
                info!("Reusing existing directory {:?}", subject_dir);
            }
            ExistingDirPolicy::Confirm => {
                warn!("Directory for {} already exists: {:?}", subject, subject_dir);
                if !confirm(&subject_dir)? {
                    return Ok(None);
                }
            }
        }
    } else {
        fs::create_dir_all(&subject_dir).map_err(|e| DatasetError::io(&subject_dir, e))?;
        info!("Created directory for {}: {:?}", subject, subject_dir);
    }

    Ok(Some(subject_dir))
}

#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub subject: String,
    pub total_photos: u32,
    pub frontal_photos: u32,
    pub created_at: DateTime<Local>,
    pub directory: PathBuf,
}

impl DatasetInfo {
    pub fn pose_photos(&self) -> u32 {
        self.total_photos.saturating_sub(self.frontal_photos)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Face Dataset Information");
        let _ = writeln!(out, "{}", "=".repeat(50));
        let _ = writeln!(out, "Person Name: {}", self.subject);
        let _ = writeln!(out, "Total Photos: {}", self.total_photos);
        let _ = writeln!(out, "Creation Date: {}", self.created_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Directory: {}", self.directory.display());
        let _ = writeln!(out);
        let _ = writeln!(out, "Photo Breakdown:");
        let _ = writeln!(out, "  - {} frontal photo (direct face)", self.frontal_photos);
        let _ = writeln!(out, "  - {} pose photos (various angles)", self.pose_photos());
        out
    }
}

/// Writes `dataset_info.txt` into `info.directory` and returns its path.
/// A record left by an earlier session in the same directory is replaced.
pub fn write_dataset_info(info: &DatasetInfo) -> Result<PathBuf> {
    let path = info.directory.join(INFO_FILE_NAME);
    if path.exists() {
        warn!("Replacing previous {:?}", path);
    }
    fs::write(&path, info.render()).map_err(|e| DatasetError::io(&path, e))?;
    info!("Dataset info saved: {:?}", path);
    Ok(path)
}
