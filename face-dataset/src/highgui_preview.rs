use log::debug;
use opencv::core::Mat;
use opencv::highgui;

use face_dataset_core::config::PreviewConfig;
use face_dataset_core::overlay::{annotate, overlay_text, CAPTURED_BANNER};
use face_dataset_core::session::{Observation, Progress};
use face_dataset_core::{
    handle_input, poll_step, CaptureOutcome, CaptureSession, DatasetError, PreviewInput,
    PreviewRenderer, ReadFailure, RenderExit, Result, StepOutcome,
};

use crate::console;

pub const WINDOW_NAME: &str = "Face Dataset - Capture";

/// Creates the highgui window. Fails on OpenCV builds without GUI support
/// or when no display is reachable.
pub fn probe_display() -> std::result::Result<(), String> {
    highgui::named_window(WINDOW_NAME, highgui::WINDOW_AUTOSIZE).map_err(|e| e.to_string())
}

fn render(progress: &Progress, observation: &Observation, banner: Option<&str>) -> Result<Mat> {
    let text = overlay_text(progress, observation.detection.has_face());
    annotate(
        &observation.frame,
        &observation.detection,
        &text,
        progress.fraction(),
        banner,
    )
}

#[derive(Debug)]
pub struct HighguiPreview {
    feedback_ms: i32,
}

impl HighguiPreview {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            feedback_ms: config.capture_feedback_ms.min(i32::MAX as u64) as i32,
        }
    }

    /// Shows the captured frame with the banner for the feedback period.
    fn show_feedback(&self, progress: &Progress, captured: &Observation) -> Result<()> {
        let shown = render(progress, captured, Some(CAPTURED_BANNER))?;
        highgui::imshow(WINDOW_NAME, &shown)?;
        highgui::wait_key(self.feedback_ms.max(1))?;
        Ok(())
    }

    fn window_closed() -> bool {
        highgui::get_window_property(WINDOW_NAME, highgui::WND_PROP_VISIBLE)
            .map(|v| v < 1.0)
            .unwrap_or(false)
    }

    fn run_loop(&mut self, session: &mut CaptureSession) -> Result<RenderExit> {
        loop {
            if let StepOutcome::Finished = poll_step(session, ReadFailure::Fatal)? {
                break;
            }

            let observation = session
                .latest()
                .cloned()
                .ok_or_else(|| DatasetError::FrameRead("no frame polled".to_string()))?;
            let shown = render(session.progress(), &observation, None)?;

            if let Err(e) = highgui::imshow(WINDOW_NAME, &shown) {
                return Ok(RenderExit::DisplayLost(e.to_string()));
            }
            let key = match highgui::wait_key(1) {
                Ok(k) => k,
                Err(e) => return Ok(RenderExit::DisplayLost(e.to_string())),
            };

            let input = if Self::window_closed() {
                Some(PreviewInput::Close)
            } else {
                PreviewInput::from_key_code(key)
            };
            let Some(input) = input else {
                continue;
            };

            match handle_input(session, input)? {
                StepOutcome::Captured(outcome) => {
                    console::report_capture(&outcome, session.target());
                    if matches!(outcome, CaptureOutcome::Saved(_)) && self.feedback_ms > 0 {
                        if let Err(e) = self.show_feedback(session.progress(), &observation) {
                            debug!("Feedback frame not shown: {}", e);
                        }
                    }
                }
                StepOutcome::Finished => break,
                StepOutcome::Continue | StepOutcome::Skipped(_) => {}
            }
        }

        Ok(RenderExit::Finished)
    }
}

impl PreviewRenderer for HighguiPreview {
    fn name(&self) -> &'static str {
        "OpenCV window"
    }

    fn run(&mut self, mut session: CaptureSession) -> Result<(CaptureSession, RenderExit)> {
        let exit = self.run_loop(&mut session);
        let _ = highgui::destroy_all_windows();
        // Let the GUI backend process the destroy event.
        let _ = highgui::wait_key(1);
        exit.map(|exit| (session, exit))
    }
}
