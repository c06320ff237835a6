//! Capture workflow for building a labeled face photo dataset.
//!
//! The OpenCV-backed camera, detector, JPEG writer and overlay drawing are
//! compiled with the `vision` feature; everything else is plain Rust.

pub mod camera;
pub mod config;
pub mod dataset;
pub mod detector;
pub mod error;
pub mod frame;
pub mod naming;
pub mod overlay;
pub mod preview;
pub mod prompt;
pub mod session;

#[cfg(test)]
mod testing;

pub use camera::{CameraOpener, FrameSource};
pub use config::{DatasetConfig, ExistingDirPolicy};
pub use dataset::{prepare_subject_dir, write_dataset_info, DatasetInfo, PhotoWriter};
pub use detector::FaceDetector;
pub use error::{DatasetError, Result};
pub use frame::{Detection, Frame, Region};
pub use naming::PhotoRole;
pub use preview::{
    drive, handle_input, poll_step, PreviewInput, PreviewRenderer, ReadFailure, RenderExit,
    StepOutcome,
};
pub use session::{
    CaptureOutcome, CaptureSession, Rejection, SessionSettings, SessionState, SessionSummary,
};
