//! Locating and downloading the frontal-face Haar cascade.
//!
//! The cascade ships with OpenCV's data files; when those are not installed
//! it can be fetched from the OpenCV repository into the user data directory.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const CASCADE_FILE: &str = "haarcascade_frontalface_default.xml";

pub const CASCADE_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_default.xml";

const SYSTEM_DIRS: &[&str] = &[
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
];

/// Writable location for a downloaded cascade.
pub fn user_models_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("face-dataset").join("models");
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("share").join("face-dataset").join("models");
    }

    PathBuf::from("./models")
}

/// Path of the cascade inside OpenCV's own data directory, if OpenCV knows it.
fn bundled_path() -> Option<PathBuf> {
    let relative = format!("haarcascades/{}", CASCADE_FILE);
    match opencv::core::find_file(&relative, false, true) {
        Ok(found) if !found.is_empty() => Some(PathBuf::from(found)),
        _ => None,
    }
}

/// Search order after OpenCV's bundled data: system data dirs, then the user dir.
pub fn search_paths(user_dir: &Path) -> Vec<PathBuf> {
    SYSTEM_DIRS
        .iter()
        .map(|d| Path::new(d).join(CASCADE_FILE))
        .chain(std::iter::once(user_dir.join(CASCADE_FILE)))
        .collect()
}

pub fn first_existing(paths: &[PathBuf]) -> Option<PathBuf> {
    paths.iter().find(|p| p.is_file()).cloned()
}

/// An explicit path from the config wins even if it does not exist, so the
/// loader can report it.
pub fn resolve(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = bundled_path() {
        debug!("Using OpenCV bundled cascade {:?}", path);
        return Some(path);
    }

    first_existing(&search_paths(&user_models_dir()))
}

/// Downloads the cascade into `dest_dir` and returns its path.
pub fn download(dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create models directory {:?}", dest_dir))?;

    info!("Downloading {} from {}", CASCADE_FILE, CASCADE_URL);

    let response = ureq::get(CASCADE_URL)
        .call()
        .with_context(|| format!("Failed to download {}", CASCADE_FILE))?;

    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .context("Download interrupted")?;

    if !looks_like_cascade(&body) {
        anyhow::bail!("Downloaded {} is not an OpenCV cascade", CASCADE_FILE);
    }

    let final_path = dest_dir.join(CASCADE_FILE);
    let partial_path = dest_dir.join(format!("{}.part", CASCADE_FILE));

    let mut file = File::create(&partial_path)
        .with_context(|| format!("Failed to create {:?}", partial_path))?;
    file.write_all(&body)
        .with_context(|| format!("Failed to write {:?}", partial_path))?;
    fs::rename(&partial_path, &final_path)
        .with_context(|| format!("Failed to move cascade into {:?}", final_path))?;

    info!("Saved {} bytes to {:?}", body.len(), final_path);
    Ok(final_path)
}

fn looks_like_cascade(body: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&body[..body.len().min(512)]);
    head.contains("<opencv_storage>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_dir_is_searched_last() {
        let user = PathBuf::from("/tmp/fd-models");
        let paths = search_paths(&user);

        assert_eq!(paths.len(), SYSTEM_DIRS.len() + 1);
        assert_eq!(paths.last(), Some(&user.join(CASCADE_FILE)));
        assert!(paths.iter().all(|p| p.ends_with(CASCADE_FILE)));
    }

    #[test]
    fn first_existing_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join(CASCADE_FILE);
        fs::write(&present, "<opencv_storage></opencv_storage>").unwrap();

        let paths = vec![dir.path().join("missing").join(CASCADE_FILE), present.clone()];
        assert_eq!(first_existing(&paths), Some(present));
        assert_eq!(first_existing(&paths[..1]), None);
    }

    #[test]
    fn override_is_returned_as_is() {
        let path = Path::new("/nonexistent/cascade.xml");
        assert_eq!(resolve(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn cascade_sniffing() {
        assert!(looks_like_cascade(b"<?xml version=\"1.0\"?>\n<opencv_storage>\n<cascade>"));
        assert!(!looks_like_cascade(b"404: Not Found"));
    }
}
