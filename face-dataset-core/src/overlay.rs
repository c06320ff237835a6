use crate::session::{Progress, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Neutral,
}

impl Tone {
    /// CSS class used by the GTK preview.
    pub fn css_class(&self) -> &'static str {
        match self {
            Tone::Success => "guidance-success",
            Tone::Warning => "guidance-warning",
            Tone::Neutral => "guidance-neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayText {
    pub counter: String,
    pub instruction: String,
    pub tone: Tone,
}

pub const CONTROLS_HINT: &str = "SPACE: Capture | ESC: Cancel";
pub const CAPTURED_BANNER: &str = "CAPTURED!";

pub fn overlay_text(progress: &Progress, face_visible: bool) -> OverlayText {
    let counter = format!("Photos: {}/{}", progress.photos_taken(), progress.target());

    let (instruction, tone) = match progress.state() {
        SessionState::AwaitingFrontFace if !progress.require_front_face_first() => {
            ("Front photo: look directly at the camera", Tone::Neutral)
        }
        SessionState::AwaitingFrontFace if face_visible => {
            ("FRONT FACE DETECTED - press SPACE", Tone::Success)
        }
        SessionState::AwaitingFrontFace => ("Find a frontal position", Tone::Warning),
        SessionState::AcceptingAnyPose => ("Take photos from any angle", Tone::Neutral),
        SessionState::Complete => ("All photos captured", Tone::Success),
        SessionState::Cancelled => ("Capture cancelled", Tone::Warning),
    };

    OverlayText { counter, instruction: instruction.to_string(), tone }
}

#[cfg(feature = "vision")]
pub use draw::annotate;

#[cfg(feature = "vision")]
mod draw {
    use opencv::core::{Mat, Point, Rect, Scalar};
    use opencv::imgproc;
    use opencv::prelude::*;

    use super::{OverlayText, Tone, CONTROLS_HINT};
    use crate::error::Result;
    use crate::frame::{Detection, Frame};

    fn bgr(b: f64, g: f64, r: f64) -> Scalar {
        Scalar::new(b, g, r, 0.0)
    }

    fn tone_color(tone: Tone) -> Scalar {
        match tone {
            Tone::Success => bgr(0.0, 255.0, 0.0),
            Tone::Warning => bgr(0.0, 0.0, 255.0),
            Tone::Neutral => bgr(255.0, 255.0, 0.0),
        }
    }

    fn text(mat: &mut Mat, s: &str, x: i32, y: i32, scale: f64, color: Scalar, thickness: i32) -> Result<()> {
        imgproc::put_text(
            mat,
            s,
            Point::new(x, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            scale,
            color,
            thickness,
            imgproc::LINE_8,
            false,
        )?;
        Ok(())
    }

    /// Draws face boxes, counter, instruction, controls and a progress bar
    /// on a copy of `frame`. `banner` is drawn large in the middle.
    pub fn annotate(
        frame: &Frame,
        detection: &Detection,
        overlay: &OverlayText,
        fraction: f64,
        banner: Option<&str>,
    ) -> Result<Mat> {
        let mut mat = frame.to_mat()?;
        let width = mat.cols();
        let height = mat.rows();

        for region in &detection.regions {
            imgproc::rectangle(
                &mut mat,
                Rect::new(region.x, region.y, region.width, region.height),
                bgr(0.0, 255.0, 0.0),
                2,
                imgproc::LINE_8,
                0,
            )?;
        }

        text(&mut mat, &overlay.counter, 10, 30, 1.0, bgr(0.0, 255.0, 0.0), 2)?;
        text(&mut mat, &overlay.instruction, 10, 70, 0.7, tone_color(overlay.tone), 2)?;
        text(&mut mat, CONTROLS_HINT, 10, 100, 0.5, bgr(255.0, 255.0, 0.0), 1)?;

        let bar_width = (width - 20).max(0);
        let bar_top = (height - 30).max(0);
        imgproc::rectangle(
            &mut mat,
            Rect::new(10, bar_top, bar_width, 20),
            bgr(50.0, 50.0, 50.0),
            -1,
            imgproc::LINE_8,
            0,
        )?;
        let filled = (bar_width as f64 * fraction.clamp(0.0, 1.0)) as i32;
        if filled > 0 {
            imgproc::rectangle(
                &mut mat,
                Rect::new(10, bar_top, filled, 20),
                bgr(0.0, 255.0, 0.0),
                -1,
                imgproc::LINE_8,
                0,
            )?;
        }

        if let Some(banner) = banner {
            text(&mut mat, banner, width / 2 - 100, height / 2, 1.5, bgr(0.0, 255.0, 0.0), 3)?;
        }

        Ok(mat)
    }
}
