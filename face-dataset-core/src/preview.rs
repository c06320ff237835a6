//! Live preview renderers and the handoff between them.
//!
//! Renderers are tried in priority order. A renderer whose display surface
//! turns out to be unusable gives the session back with
//! [`RenderExit::DisplayLost`]; the camera is then released, reopened and
//! the session passed to the next renderer. There is no way back.

use log::{info, warn};

use crate::camera::CameraOpener;
use crate::error::{DatasetError, Result};
use crate::session::{CaptureOutcome, CaptureSession};

pub const KEY_SPACE: i32 = 32;
pub const KEY_ESC: i32 = 27;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderExit {
    /// The session reached a terminal state or the window was closed.
    Finished,
    DisplayLost(String),
}

/// A user request coming from a preview window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewInput {
    Capture,
    Cancel,
    /// The window was closed; treated like cancel.
    Close,
}

impl PreviewInput {
    /// Maps a key code as returned by `waitKey` (low byte) to a request.
    pub fn from_key_code(code: i32) -> Option<Self> {
        match code & 0xFF {
            KEY_SPACE => Some(Self::Capture),
            KEY_ESC => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// What a renderer does when a frame cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    /// End the preview with the error.
    Fatal,
    /// Report it and try again on the next step.
    Retry,
}

#[derive(Debug)]
pub enum StepOutcome {
    /// A fresh observation is available, or the input changed nothing.
    Continue,
    /// The frame read failed and will be retried.
    Skipped(DatasetError),
    Captured(CaptureOutcome),
    /// The session is complete or cancelled.
    Finished,
}

/// Reads and analyses the next frame unless the session already ended.
pub fn poll_step(session: &mut CaptureSession, on_failure: ReadFailure) -> Result<StepOutcome> {
    if session.is_finished() {
        return Ok(StepOutcome::Finished);
    }

    match session.poll() {
        Ok(_) => Ok(StepOutcome::Continue),
        Err(DatasetError::CameraReleased) => Err(DatasetError::CameraReleased),
        Err(e) if on_failure == ReadFailure::Retry => {
            warn!("Frame skipped: {}", e);
            Ok(StepOutcome::Skipped(e))
        }
        Err(e) => Err(e),
    }
}

/// Applies one user request to the session.
pub fn handle_input(session: &mut CaptureSession, input: PreviewInput) -> Result<StepOutcome> {
    match input {
        PreviewInput::Capture => Ok(StepOutcome::Captured(session.capture()?)),
        PreviewInput::Cancel | PreviewInput::Close => {
            if input == PreviewInput::Close {
                info!("Preview window closed");
            }
            session.cancel();
            Ok(StepOutcome::Finished)
        }
    }
}

/// A view over a capture session that turns user input into session requests.
pub trait PreviewRenderer {
    fn name(&self) -> &'static str;

    fn run(&mut self, session: CaptureSession) -> Result<(CaptureSession, RenderExit)>;
}

/// Runs `session` through `renderers` and returns it once one finishes.
pub fn drive(
    mut session: CaptureSession,
    renderers: Vec<Box<dyn PreviewRenderer>>,
    opener: &dyn CameraOpener,
) -> Result<CaptureSession> {
    let mut last_reason = String::from("no preview renderer configured");
    let count = renderers.len();

    for (i, mut renderer) in renderers.into_iter().enumerate() {
        if i > 0 {
            session.release_camera();
            session.attach_camera(opener.open()?);
        }

        info!("Starting {} preview", renderer.name());
        let (returned, exit) = renderer.run(session)?;
        session = returned;

        match exit {
            RenderExit::Finished => return Ok(session),
            RenderExit::DisplayLost(reason) => {
                if i + 1 < count {
                    warn!("{} preview unavailable ({}), switching renderer", renderer.name(), reason);
                }
                last_reason = reason;
            }
        }
    }

    session.release_camera();
    Err(DatasetError::DisplayUnavailable(last_reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Rejection, SessionSettings, SessionState};
    use crate::testing::{FakeCamera, FakeDetector, FakeOpener, RecordingWriter};
    use rstest::rstest;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Takes `captures` photos with a face in view, then exits with `exit`.
    struct ScriptedRenderer {
        name: &'static str,
        captures: u32,
        exit: RenderExit,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl PreviewRenderer for ScriptedRenderer {
        fn name(&self) -> &'static str {
            self.name
        }

        fn run(&mut self, mut session: CaptureSession) -> Result<(CaptureSession, RenderExit)> {
            self.log.borrow_mut().push(format!("{}:camera={}", self.name, session.has_camera()));
            for _ in 0..self.captures {
                session.poll()?;
                assert!(matches!(session.capture()?, CaptureOutcome::Saved(_)));
            }
            Ok((session, self.exit.clone()))
        }
    }

    fn session(tmp: &tempfile::TempDir, camera: &FakeCamera) -> CaptureSession {
        let detector = FakeDetector::new();
        detector.set_face(true);
        CaptureSession::new(
            SessionSettings {
                subject: "Ana".to_string(),
                output_dir: tmp.path().to_path_buf(),
                target_photo_count: 4,
                require_front_face_first: true,
            },
            Box::new(camera.clone()),
            Box::new(detector),
            Box::new(RecordingWriter::new()),
        )
    }

    fn renderer(name: &'static str, captures: u32, exit: RenderExit, log: &Rc<RefCell<Vec<String>>>) -> Box<dyn PreviewRenderer> {
        Box::new(ScriptedRenderer { name, captures, exit, log: log.clone() })
    }

    #[test]
    fn primary_that_finishes_keeps_the_session() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        let opener = FakeOpener::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        let session = drive(
            session(&tmp, &camera),
            vec![
                renderer("primary", 4, RenderExit::Finished, &log),
                renderer("fallback", 0, RenderExit::Finished, &log),
            ],
            &opener,
        )
        .unwrap();

        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(*log.borrow(), vec!["primary:camera=true".to_string()]);
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn lost_display_hands_off_with_fresh_camera() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        let opener = FakeOpener::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        let session = drive(
            session(&tmp, &camera),
            vec![
                renderer("primary", 1, RenderExit::DisplayLost("no GUI backend".into()), &log),
                renderer("fallback", 3, RenderExit::Finished, &log),
            ],
            &opener,
        )
        .unwrap();

        assert!(camera.released());
        assert_eq!(opener.opened.borrow().len(), 1);
        assert_eq!(opener.opened.borrow()[0].reads(), 3);
        assert_eq!(session.photos_taken(), 4);
        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn no_renderer_left_is_display_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        let opener = FakeOpener::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        let err = drive(
            session(&tmp, &camera),
            vec![
                renderer("primary", 0, RenderExit::DisplayLost("a".into()), &log),
                renderer("fallback", 0, RenderExit::DisplayLost("b".into()), &log),
            ],
            &opener,
        )
        .unwrap_err();

        assert!(matches!(err, DatasetError::DisplayUnavailable(ref r) if r == "b"));
        assert!(camera.released());
        assert!(opener.opened.borrow().iter().all(|c| c.released()));
    }

    #[test]
    fn renderer_error_propagates_and_releases_camera() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        camera.fail_reads(true);
        let log = Rc::new(RefCell::new(Vec::new()));

        let result = drive(
            session(&tmp, &camera),
            vec![renderer("primary", 1, RenderExit::Finished, &log)],
            &FakeOpener::default(),
        );

        assert!(matches!(result, Err(DatasetError::FrameRead(_))));
        assert!(camera.released());
    }

    #[rstest]
    #[case::space(32, Some(PreviewInput::Capture))]
    #[case::space_with_modifier_bits(0x10_0020, Some(PreviewInput::Capture))]
    #[case::esc(27, Some(PreviewInput::Cancel))]
    #[case::letter(b'q' as i32, None)]
    #[case::no_key(-1, None)]
    fn key_codes_map_to_requests(#[case] code: i32, #[case] expected: Option<PreviewInput>) {
        assert_eq!(PreviewInput::from_key_code(code), expected);
    }

    #[test]
    fn fatal_read_failure_ends_the_step() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        let mut session = session(&tmp, &camera);
        camera.fail_reads(true);

        let err = poll_step(&mut session, ReadFailure::Fatal).unwrap_err();

        assert!(matches!(err, DatasetError::FrameRead(_)));
        assert_eq!(session.state(), SessionState::AwaitingFrontFace);
    }

    #[test]
    fn retried_read_failure_keeps_the_session() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        let mut session = session(&tmp, &camera);
        camera.fail_reads(true);

        let step = poll_step(&mut session, ReadFailure::Retry).unwrap();
        assert!(matches!(step, StepOutcome::Skipped(DatasetError::FrameRead(_))));
        assert!(session.has_camera());
        assert!(session.latest().is_none());

        camera.fail_reads(false);
        assert!(matches!(poll_step(&mut session, ReadFailure::Retry).unwrap(), StepOutcome::Continue));
        let step = handle_input(&mut session, PreviewInput::Capture).unwrap();
        assert!(matches!(step, StepOutcome::Captured(CaptureOutcome::Saved(_))));
        assert_eq!(session.photos_taken(), 1);
    }

    #[test]
    fn capture_without_poll_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        let mut session = session(&tmp, &camera);

        let step = handle_input(&mut session, PreviewInput::Capture).unwrap();
        assert!(matches!(step, StepOutcome::Captured(CaptureOutcome::Rejected(Rejection::NoFrame))));
    }

    #[rstest]
    #[case::esc(PreviewInput::Cancel)]
    #[case::window_closed(PreviewInput::Close)]
    fn cancel_and_close_end_the_session(#[case] input: PreviewInput) {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        let mut session = session(&tmp, &camera);
        poll_step(&mut session, ReadFailure::Fatal).unwrap();

        assert!(matches!(handle_input(&mut session, input).unwrap(), StepOutcome::Finished));
        assert_eq!(session.state(), SessionState::Cancelled);
        assert!(camera.released());
        assert!(matches!(poll_step(&mut session, ReadFailure::Retry).unwrap(), StepOutcome::Finished));
    }

    #[test]
    fn steps_run_a_session_to_completion() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FakeCamera::new();
        let mut session = session(&tmp, &camera);

        for _ in 0..4 {
            assert!(matches!(poll_step(&mut session, ReadFailure::Fatal).unwrap(), StepOutcome::Continue));
            handle_input(&mut session, PreviewInput::Capture).unwrap();
        }

        assert_eq!(session.state(), SessionState::Complete);
        assert!(matches!(poll_step(&mut session, ReadFailure::Fatal).unwrap(), StepOutcome::Finished));
    }
}
