use gtk4 as gtk;
use libadwaita as adw;

use adw::prelude::*;
use adw::subclass::prelude::*;
use gtk::gdk;
use gtk::glib;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use face_dataset_core::overlay::{annotate, overlay_text, Tone, CAPTURED_BANNER, CONTROLS_HINT};
use face_dataset_core::{
    handle_input, poll_step, CaptureOutcome, CaptureSession, DatasetError, Frame, PreviewInput,
    ReadFailure, StepOutcome,
};

use crate::app::FaceDatasetApplication;
use crate::console;

/// How the fallback window handed the session back.
pub enum PreviewResult {
    Done(CaptureSession),
    Failed(DatasetError),
}

pub type ResultSlot = Rc<RefCell<Option<PreviewResult>>>;

enum Tick {
    Show(Frame),
    Skip(DatasetError),
    Finished,
    Failed(DatasetError),
}

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct CaptureWindow {
        // State
        pub session: RefCell<Option<CaptureSession>>,
        pub result: RefCell<ResultSlot>,
        pub poll_source: RefCell<Option<glib::SourceId>>,
        pub feedback: Cell<Duration>,
        pub captured_until: Cell<Option<Instant>>,
        pub last_tone: Cell<Option<Tone>>,

        // UI widgets
        pub toast_overlay: RefCell<Option<adw::ToastOverlay>>,
        pub picture: RefCell<Option<gtk::Picture>>,
        pub lbl_counter: RefCell<Option<gtk::Label>>,
        pub lbl_instruction: RefCell<Option<gtk::Label>>,
        pub lbl_status: RefCell<Option<gtk::Label>>,
        pub progress: RefCell<Option<gtk::ProgressBar>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for CaptureWindow {
        const NAME: &'static str = "FaceDatasetCaptureWindow";
        type Type = super::CaptureWindow;
        type ParentType = adw::ApplicationWindow;
    }

    impl ObjectImpl for CaptureWindow {
        fn constructed(&self) {
            self.parent_constructed();
            let obj = self.obj();
            obj.build_ui();
            obj.setup_keys();

            obj.connect_close_request(|window| {
                window.finish_preview();
                glib::Propagation::Proceed
            });
        }
    }

    impl WidgetImpl for CaptureWindow {}
    impl WindowImpl for CaptureWindow {}
    impl ApplicationWindowImpl for CaptureWindow {}
    impl AdwApplicationWindowImpl for CaptureWindow {}
}

glib::wrapper! {
    pub struct CaptureWindow(ObjectSubclass<imp::CaptureWindow>)
        @extends gtk::Widget, gtk::Window, gtk::ApplicationWindow, adw::ApplicationWindow,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget,
                    gtk::Native, gtk::Root, gtk::ShortcutManager;
}

impl CaptureWindow {
    pub fn new(
        app: &FaceDatasetApplication,
        session: CaptureSession,
        result: ResultSlot,
        poll_interval: Duration,
        feedback: Duration,
    ) -> Self {
        let window: Self = glib::Object::builder()
            .property("application", app)
            .build();

        let imp = window.imp();
        window.set_title(Some(&format!("Face Dataset - {}", session.subject())));
        *imp.session.borrow_mut() = Some(session);
        *imp.result.borrow_mut() = result;
        imp.feedback.set(feedback);

        window.start_polling(poll_interval);
        window
    }

    fn build_ui(&self) {
        let imp = self.imp();

        self.set_default_size(720, 640);

        let toast_overlay = adw::ToastOverlay::new();
        let toolbar = adw::ToolbarView::new();
        toolbar.add_top_bar(&adw::HeaderBar::new());

        let content = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(12)
            .margin_top(12)
            .margin_bottom(12)
            .margin_start(12)
            .margin_end(12)
            .build();

        let picture = gtk::Picture::builder()
            .content_fit(gtk::ContentFit::Contain)
            .vexpand(true)
            .css_classes(["camera-preview"])
            .build();

        let lbl_counter = gtk::Label::builder()
            .label("Photos: 0/0")
            .css_classes(["title-2"])
            .build();

        let lbl_instruction = gtk::Label::builder()
            .label("Starting camera...")
            .css_classes(["guidance-neutral"])
            .wrap(true)
            .justify(gtk::Justification::Center)
            .build();

        let lbl_status = gtk::Label::builder()
            .label(CONTROLS_HINT)
            .css_classes(["dim-label"])
            .build();

        let progress = gtk::ProgressBar::builder()
            .show_text(false)
            .build();
        progress.add_css_class("capture-progress");

        let btn_box = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(12)
            .halign(gtk::Align::Center)
            .build();

        // Buttons must not take focus or Space would activate them instead
        // of reaching the key controller.
        let btn_capture = gtk::Button::builder()
            .label("Capture (Space)")
            .css_classes(["suggested-action", "pill"])
            .focus_on_click(false)
            .build();
        btn_capture.connect_clicked(glib::clone!(
            #[weak(rename_to = window)] self,
            move |_| { window.request_capture(); }
        ));

        let btn_cancel = gtk::Button::builder()
            .label("Cancel (Esc)")
            .css_classes(["destructive-action", "pill"])
            .focus_on_click(false)
            .build();
        btn_cancel.connect_clicked(glib::clone!(
            #[weak(rename_to = window)] self,
            move |_| { window.request_cancel(); }
        ));

        btn_box.append(&btn_capture);
        btn_box.append(&btn_cancel);

        content.append(&lbl_counter);
        content.append(&picture);
        content.append(&lbl_instruction);
        content.append(&progress);
        content.append(&lbl_status);
        content.append(&btn_box);

        toolbar.set_content(Some(&content));
        toast_overlay.set_child(Some(&toolbar));
        self.set_content(Some(&toast_overlay));

        *imp.toast_overlay.borrow_mut() = Some(toast_overlay);
        *imp.picture.borrow_mut() = Some(picture);
        *imp.lbl_counter.borrow_mut() = Some(lbl_counter);
        *imp.lbl_instruction.borrow_mut() = Some(lbl_instruction);
        *imp.lbl_status.borrow_mut() = Some(lbl_status);
        *imp.progress.borrow_mut() = Some(progress);
    }

    fn setup_keys(&self) {
        let keys = gtk::EventControllerKey::new();
        keys.set_propagation_phase(gtk::PropagationPhase::Capture);
        keys.connect_key_pressed(glib::clone!(
            #[weak(rename_to = window)] self,
            #[upgrade_or] glib::Propagation::Proceed,
            move |_, key, _, _| {
                match key {
                    gdk::Key::space => {
                        window.request_capture();
                        glib::Propagation::Stop
                    }
                    gdk::Key::Escape => {
                        window.request_cancel();
                        glib::Propagation::Stop
                    }
                    _ => glib::Propagation::Proceed,
                }
            }
        ));
        self.add_controller(keys);
    }

    fn start_polling(&self, interval: Duration) {
        let source = glib::timeout_add_local(interval, glib::clone!(
            #[weak(rename_to = window)] self,
            #[upgrade_or] glib::ControlFlow::Break,
            move || window.tick()
        ));
        *self.imp().poll_source.borrow_mut() = Some(source);
    }

    /// One preview step: read, detect, draw.
    fn tick(&self) -> glib::ControlFlow {
        let imp = self.imp();

        let tick = {
            let mut guard = imp.session.borrow_mut();
            let Some(session) = guard.as_mut() else {
                return glib::ControlFlow::Break;
            };
            match poll_step(session, ReadFailure::Retry) {
                Ok(StepOutcome::Continue) => match self.render(session) {
                    Ok(frame) => Tick::Show(frame),
                    Err(e) => {
                        warn!("Preview frame not drawn: {}", e);
                        Tick::Skip(e)
                    }
                },
                Ok(StepOutcome::Skipped(e)) => Tick::Skip(e),
                Ok(StepOutcome::Finished | StepOutcome::Captured(_)) => Tick::Finished,
                Err(e) => Tick::Failed(e),
            }
        };

        match tick {
            Tick::Show(frame) => self.show_frame(&frame),
            Tick::Skip(e) => self.set_status(&format!("Camera error: {}", e)),
            Tick::Finished => {
                // Returning Break removes the source; the id must not be removed again.
                let _ = imp.poll_source.borrow_mut().take();
                self.close();
                return glib::ControlFlow::Break;
            }
            Tick::Failed(e) => {
                let _ = imp.poll_source.borrow_mut().take();
                self.fail(e);
                return glib::ControlFlow::Break;
            }
        }

        glib::ControlFlow::Continue
    }

    fn render(&self, session: &CaptureSession) -> face_dataset_core::Result<Frame> {
        let imp = self.imp();

        let banner = match imp.captured_until.get() {
            Some(until) if Instant::now() < until => Some(CAPTURED_BANNER),
            Some(_) => {
                imp.captured_until.set(None);
                None
            }
            None => None,
        };

        let observation = session
            .latest()
            .ok_or_else(|| DatasetError::FrameRead("no frame polled".to_string()))?;
        let fraction = session.progress().fraction();
        let text = overlay_text(session.progress(), observation.detection.has_face());
        let mat = annotate(&observation.frame, &observation.detection, &text, fraction, banner)?;

        self.update_labels(&text.counter, &text.instruction, text.tone, fraction);
        Frame::from_mat(&mat)
    }

    fn show_frame(&self, frame: &Frame) {
        let imp = self.imp();
        let bytes = glib::Bytes::from_owned(frame.to_rgb());
        let texture = gdk::MemoryTexture::new(
            frame.width as i32,
            frame.height as i32,
            gdk::MemoryFormat::R8g8b8,
            &bytes,
            frame.stride(),
        );
        if let Some(picture) = imp.picture.borrow().as_ref() {
            picture.set_paintable(Some(&texture));
        }
    }

    fn update_labels(&self, counter: &str, instruction: &str, tone: Tone, fraction: f64) {
        let imp = self.imp();

        if let Some(label) = imp.lbl_counter.borrow().as_ref() {
            label.set_label(counter);
        }

        if let Some(label) = imp.lbl_instruction.borrow().as_ref() {
            label.set_label(instruction);
            if imp.last_tone.get() != Some(tone) {
                if let Some(previous) = imp.last_tone.get() {
                    label.remove_css_class(previous.css_class());
                }
                label.remove_css_class("guidance-neutral");
                label.add_css_class(tone.css_class());
                imp.last_tone.set(Some(tone));
            }
        }

        if let Some(bar) = imp.progress.borrow().as_ref() {
            bar.set_fraction(fraction.min(1.0));
        }
    }

    fn set_status(&self, message: &str) {
        if let Some(label) = self.imp().lbl_status.borrow().as_ref() {
            label.set_label(message);
        }
    }

    fn show_toast(&self, message: &str) {
        if let Some(overlay) = self.imp().toast_overlay.borrow().as_ref() {
            overlay.add_toast(adw::Toast::new(message));
        }
    }

    fn request_capture(&self) {
        let imp = self.imp();

        let result = {
            let mut guard = imp.session.borrow_mut();
            let Some(session) = guard.as_mut() else {
                return;
            };
            handle_input(session, PreviewInput::Capture)
                .map(|step| (step, session.target(), session.is_finished()))
        };

        match result {
            Ok((StepOutcome::Captured(outcome), total, finished)) => {
                console::report_capture(&outcome, total);
                match &outcome {
                    CaptureOutcome::Saved(_) => {
                        imp.captured_until.set(Instant::now().checked_add(imp.feedback.get()));
                        self.set_status(CONTROLS_HINT);
                    }
                    CaptureOutcome::Rejected(reason) => self.show_toast(&reason.to_string()),
                }
                if finished {
                    info!("All photos captured, closing preview");
                    self.close();
                }
            }
            Ok(_) => {}
            Err(e) => self.fail(e),
        }
    }

    fn request_cancel(&self) {
        if let Some(session) = self.imp().session.borrow_mut().as_mut() {
            let _ = handle_input(session, PreviewInput::Cancel);
        }
        self.close();
    }

    /// Aborts the preview with a fatal error. The session is dropped, which
    /// releases the camera.
    fn fail(&self, e: DatasetError) {
        error!("Capture failed: {}", e);
        let imp = self.imp();
        let _ = imp.session.borrow_mut().take();
        *imp.result.borrow().borrow_mut() = Some(PreviewResult::Failed(e));
        self.close();
    }

    /// Stops polling and hands the session back through the result slot.
    fn finish_preview(&self) {
        let imp = self.imp();

        if let Some(source) = imp.poll_source.borrow_mut().take() {
            source.remove();
        }

        let Some(mut session) = imp.session.borrow_mut().take() else {
            return;
        };

        if !session.is_finished() {
            let _ = handle_input(&mut session, PreviewInput::Close);
        }

        let slot = imp.result.borrow();
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            *slot = Some(PreviewResult::Done(session));
        }
    }
}
