use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not open camera {device_id}: {reason}")]
    CameraUnavailable { device_id: i32, reason: String },

    #[error("could not read frame from camera: {0}")]
    FrameRead(String),

    #[error("camera is not open")]
    CameraReleased,

    #[error("face classifier unavailable at {path:?}: {reason}")]
    ClassifierUnavailable { path: PathBuf, reason: String },

    #[error("no display surface available: {0}")]
    DisplayUnavailable(String),

    #[error("input closed before a value was entered")]
    InputClosed,

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("failed to write image {path:?}: {reason}")]
    ImageWrite { path: PathBuf, reason: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("console I/O error: {0}")]
    Console(#[source] std::io::Error),

    #[error("failed to parse config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(feature = "vision")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl DatasetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Remediation text shown next to fatal startup errors.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CameraUnavailable { .. } => Some(
                "Check that a camera is connected, that no other application is using it, \
                 and that camera permissions have been granted.",
            ),
            Self::ClassifierUnavailable { .. } => Some(
                "Install the OpenCV data files (haarcascades) or set detection.cascade_path \
                 in the config file.",
            ),
            Self::DisplayUnavailable(_) => Some(
                "Run the tool from a graphical session (X11 or Wayland).",
            ),
            _ => None,
        }
    }
}
