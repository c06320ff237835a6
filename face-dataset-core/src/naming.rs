//! File names for captured photos.
//!
//! `<subject>_<role>_<NN>_<YYYYmmdd_HHMMSS_ffffff>.jpg`, with a `-N` suffix
//! appended when the candidate already exists on disk.

use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoRole {
    Frontal,
    Pose,
}

impl PhotoRole {
    pub fn label(&self) -> &'static str {
        match self {
            PhotoRole::Frontal => "frontal",
            PhotoRole::Pose => "pose",
        }
    }
}

impl fmt::Display for PhotoRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const PHOTO_EXTENSION: &str = "jpg";

pub fn photo_stem(subject: &str, role: PhotoRole, ordinal: u32, at: &DateTime<Local>) -> String {
    format!(
        "{}_{}_{:02}_{}",
        subject,
        role.label(),
        ordinal,
        at.format("%Y%m%d_%H%M%S_%6f")
    )
}

/// Picks a path in `dir` for the next photo that does not exist yet.
pub fn unique_photo_path(
    dir: &Path,
    subject: &str,
    role: PhotoRole,
    ordinal: u32,
    at: &DateTime<Local>,
) -> PathBuf {
    let stem = photo_stem(subject, role, ordinal, at);
    let mut path = dir.join(format!("{}.{}", stem, PHOTO_EXTENSION));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}-{}.{}", stem, n, PHOTO_EXTENSION));
        n += 1;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::microseconds(42)
    }

    #[rstest]
    #[case::frontal(PhotoRole::Frontal, 1, "Ana_frontal_01_20240309_140507_000042")]
    #[case::pose(PhotoRole::Pose, 7, "Ana_pose_07_20240309_140507_000042")]
    #[case::wide_ordinal(PhotoRole::Pose, 120, "Ana_pose_120_20240309_140507_000042")]
    fn stem_embeds_subject_role_ordinal_and_time(
        #[case] role: PhotoRole,
        #[case] ordinal: u32,
        #[case] expected: &str,
    ) {
        assert_eq!(photo_stem("Ana", role, ordinal, &fixed_time()), expected);
    }

    #[test]
    fn existing_file_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let at = fixed_time();

        let first = unique_photo_path(dir.path(), "Ana", PhotoRole::Pose, 2, &at);
        std::fs::write(&first, b"x").unwrap();
        let second = unique_photo_path(dir.path(), "Ana", PhotoRole::Pose, 2, &at);
        std::fs::write(&second, b"x").unwrap();
        let third = unique_photo_path(dir.path(), "Ana", PhotoRole::Pose, 2, &at);

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(second.to_string_lossy().ends_with("-1.jpg"));
        assert!(third.to_string_lossy().ends_with("-2.jpg"));
    }
}
