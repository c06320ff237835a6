//! Capture session: counts accepted photos toward the quota, gates the first
//! one on a detected front face, names and saves each photo, and writes the
//! dataset info record once the quota is reached.

use chrono::Local;
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::camera::FrameSource;
use crate::dataset::{write_dataset_info, DatasetInfo, PhotoWriter};
use crate::detector::FaceDetector;
use crate::error::{DatasetError, Result};
use crate::frame::{Detection, Frame};
use crate::naming::{unique_photo_path, PhotoRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingFrontFace,
    AcceptingAnyPose,
    Complete,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Cancelled)
    }
}

/// Why a capture request was turned down. The session is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoFrame,
    FrontFaceRequired,
    SessionClosed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Rejection::NoFrame => "No camera frame available yet.",
            Rejection::FrontFaceRequired => "A clear front-facing photo must be captured first.",
            Rejection::SessionClosed => "The capture session is already finished.",
        };
        f.write_str(msg)
    }
}

/// Photo counting and front-face gating, without any I/O.
#[derive(Debug, Clone)]
pub struct Progress {
    target: u32,
    photos_taken: u32,
    front_face_captured: bool,
    require_front_face_first: bool,
    cancelled: bool,
}

impl Progress {
    pub fn new(target: u32, require_front_face_first: bool) -> Self {
        Self {
            target: target.max(1),
            photos_taken: 0,
            front_face_captured: false,
            require_front_face_first,
            cancelled: false,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.cancelled {
            SessionState::Cancelled
        } else if self.photos_taken >= self.target {
            SessionState::Complete
        } else if self.front_face_captured {
            SessionState::AcceptingAnyPose
        } else {
            SessionState::AwaitingFrontFace
        }
    }

    /// Role the next photo would get, or why it cannot be taken.
    pub fn next_role(&self, has_face: bool) -> std::result::Result<PhotoRole, Rejection> {
        match self.state() {
            SessionState::Complete | SessionState::Cancelled => Err(Rejection::SessionClosed),
            SessionState::AwaitingFrontFace if self.require_front_face_first && !has_face => {
                Err(Rejection::FrontFaceRequired)
            }
            SessionState::AwaitingFrontFace => Ok(PhotoRole::Frontal),
            SessionState::AcceptingAnyPose => Ok(PhotoRole::Pose),
        }
    }

    /// Counts a photo that was written with `role`.
    pub fn record(&mut self, role: PhotoRole) {
        debug_assert!(!self.state().is_terminal());
        self.photos_taken += 1;
        if role == PhotoRole::Frontal {
            self.front_face_captured = true;
        }
    }

    pub fn cancel(&mut self) {
        if self.state() != SessionState::Complete {
            self.cancelled = true;
        }
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn photos_taken(&self) -> u32 {
        self.photos_taken
    }

    pub fn front_face_captured(&self) -> bool {
        self.front_face_captured
    }

    pub fn require_front_face_first(&self) -> bool {
        self.require_front_face_first
    }

    pub fn fraction(&self) -> f64 {
        self.photos_taken as f64 / self.target as f64
    }
}

/// The most recent polled frame and what the detector found in it.
#[derive(Debug, Clone)]
pub struct Observation {
    pub frame: Frame,
    pub detection: Detection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPhoto {
    pub path: PathBuf,
    pub role: PhotoRole,
    pub ordinal: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Saved(SavedPhoto),
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSummary {
    Completed {
        photos: u32,
        directory: PathBuf,
        info_path: PathBuf,
    },
    Cancelled {
        photos_taken: u32,
    },
    /// The preview ended without reaching the quota or an explicit cancel.
    Incomplete {
        photos_taken: u32,
    },
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub subject: String,
    pub output_dir: PathBuf,
    pub target_photo_count: u32,
    pub require_front_face_first: bool,
}

pub struct CaptureSession {
    subject: String,
    output_dir: PathBuf,
    progress: Progress,
    camera: Option<Box<dyn FrameSource>>,
    detector: Box<dyn FaceDetector>,
    writer: Box<dyn PhotoWriter>,
    latest: Option<Observation>,
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("subject", &self.subject)
            .field("output_dir", &self.output_dir)
            .field("progress", &self.progress)
            .field("has_camera", &self.camera.is_some())
            .field("has_observation", &self.latest.is_some())
            .finish()
    }
}

impl CaptureSession {
    pub fn new(
        settings: SessionSettings,
        camera: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        writer: Box<dyn PhotoWriter>,
    ) -> Self {
        Self {
            subject: settings.subject,
            output_dir: settings.output_dir,
            progress: Progress::new(settings.target_photo_count, settings.require_front_face_first),
            camera: Some(camera),
            detector,
            writer,
            latest: None,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn state(&self) -> SessionState {
        self.progress.state()
    }

    pub fn photos_taken(&self) -> u32 {
        self.progress.photos_taken()
    }

    pub fn target(&self) -> u32 {
        self.progress.target()
    }

    pub fn front_face_captured(&self) -> bool {
        self.progress.front_face_captured()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.latest.as_ref()
    }

    /// Reads the next frame, runs detection and stores the result as the
    /// latest observation.
    pub fn poll(&mut self) -> Result<&Observation> {
        let camera = self.camera.as_mut().ok_or(DatasetError::CameraReleased)?;
        let frame = camera.read_frame()?;
        let detection = self.detector.detect(&frame)?;
        Ok(self.latest.insert(Observation { frame, detection }))
    }

    /// Handles one capture request against the latest observation, which is
    /// consumed whether or not the photo is accepted.
    pub fn capture(&mut self) -> Result<CaptureOutcome> {
        if self.is_finished() {
            return Ok(CaptureOutcome::Rejected(Rejection::SessionClosed));
        }

        let observation = match self.latest.take() {
            Some(o) => o,
            None => return Ok(CaptureOutcome::Rejected(Rejection::NoFrame)),
        };

        let role = match self.progress.next_role(observation.detection.has_face()) {
            Ok(role) => role,
            Err(rejection) => {
                warn!("Capture rejected: {}", rejection);
                return Ok(CaptureOutcome::Rejected(rejection));
            }
        };

        let ordinal = self.progress.photos_taken() + 1;
        let path = unique_photo_path(&self.output_dir, &self.subject, role, ordinal, &Local::now());
        self.writer.write(&path, &observation.frame)?;
        self.progress.record(role);

        info!(
            "Photo {}/{} ({}) saved: {:?}",
            self.progress.photos_taken(),
            self.progress.target(),
            role,
            path
        );

        if self.state() == SessionState::Complete {
            self.release_camera();
        }

        Ok(CaptureOutcome::Saved(SavedPhoto { path, role, ordinal }))
    }

    pub fn cancel(&mut self) {
        if self.is_finished() {
            return;
        }
        info!("Capture cancelled after {} photo(s)", self.progress.photos_taken());
        self.progress.cancel();
        self.latest = None;
        self.release_camera();
    }

    pub fn release_camera(&mut self) {
        if self.camera.take().is_some() {
            debug!("Camera handle dropped");
        }
    }

    pub fn attach_camera(&mut self, camera: Box<dyn FrameSource>) {
        self.release_camera();
        self.latest = None;
        self.camera = Some(camera);
    }

    /// Ends the session. Only a complete session writes the info record.
    pub fn finish(mut self) -> Result<SessionSummary> {
        self.release_camera();

        match self.state() {
            SessionState::Complete => {
                let info = DatasetInfo {
                    subject: self.subject.clone(),
                    total_photos: self.progress.photos_taken(),
                    frontal_photos: u32::from(self.progress.front_face_captured()),
                    created_at: Local::now(),
                    directory: self.output_dir.clone(),
                };
                let info_path = write_dataset_info(&info)?;
                Ok(SessionSummary::Completed {
                    photos: info.total_photos,
                    directory: info.directory,
                    info_path,
                })
            }
            SessionState::Cancelled => Ok(SessionSummary::Cancelled {
                photos_taken: self.progress.photos_taken(),
            }),
            SessionState::AwaitingFrontFace | SessionState::AcceptingAnyPose => {
                Ok(SessionSummary::Incomplete {
                    photos_taken: self.progress.photos_taken(),
                })
            }
        }
    }
}
