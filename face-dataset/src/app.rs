use gtk4 as gtk;
use libadwaita as adw;

use adw::prelude::*;
use adw::subclass::prelude::*;
use gtk::gio;
use gtk::glib;

use std::cell::{Cell, RefCell};
use std::time::Duration;

use face_dataset_core::config::PreviewConfig;
use face_dataset_core::{CaptureSession, PreviewRenderer, RenderExit, Result};

use crate::window::{CaptureWindow, PreviewResult, ResultSlot};

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct FaceDatasetApplication {
        pub pending: RefCell<Option<CaptureSession>>,
        pub result: RefCell<ResultSlot>,
        pub poll_interval: Cell<Duration>,
        pub feedback: Cell<Duration>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for FaceDatasetApplication {
        const NAME: &'static str = "FaceDatasetApplication";
        type Type = super::FaceDatasetApplication;
        type ParentType = adw::Application;
    }

    impl ObjectImpl for FaceDatasetApplication {
        fn constructed(&self) {
            self.parent_constructed();
            self.obj().load_css();
        }
    }

    impl ApplicationImpl for FaceDatasetApplication {
        fn activate(&self) {
            let obj = self.obj();

            if let Some(window) = obj.active_window() {
                window.present();
                return;
            }

            let Some(session) = self.pending.borrow_mut().take() else {
                return;
            };

            let window = CaptureWindow::new(
                &obj,
                session,
                self.result.borrow().clone(),
                self.poll_interval.get(),
                self.feedback.get(),
            );
            window.present();
        }
    }

    impl GtkApplicationImpl for FaceDatasetApplication {}
    impl AdwApplicationImpl for FaceDatasetApplication {}
}

glib::wrapper! {
    pub struct FaceDatasetApplication(ObjectSubclass<imp::FaceDatasetApplication>)
        @extends gio::Application, gtk::Application, adw::Application,
        @implements gio::ActionGroup, gio::ActionMap;
}

impl FaceDatasetApplication {
    pub fn new(session: CaptureSession, result: ResultSlot, config: &PreviewConfig) -> Self {
        // NON_UNIQUE: the session lives in this process, so a second instance
        // must not be forwarded to a running one.
        let app: Self = glib::Object::builder()
            .property("application-id", "io.github.facedataset.FaceDataset")
            .property("flags", gio::ApplicationFlags::NON_UNIQUE)
            .build();

        let imp = app.imp();
        *imp.pending.borrow_mut() = Some(session);
        *imp.result.borrow_mut() = result;
        imp.poll_interval.set(Duration::from_millis(config.poll_interval_ms.max(1)));
        imp.feedback.set(Duration::from_millis(config.capture_feedback_ms));
        app
    }

    /// The session, if no window ever took it.
    fn take_pending(&self) -> Option<CaptureSession> {
        self.imp().pending.borrow_mut().take()
    }

    fn load_css(&self) {
        let css = r#"
            .camera-preview {
                background-color: @card_bg_color;
                border-radius: 12px;
                min-height: 300px;
            }
            .guidance-success { color: @success_color; font-weight: bold; }
            .guidance-warning { color: @warning_color; }
            .guidance-neutral { color: @theme_fg_color; }
            .capture-progress { border-radius: 6px; }
            .capture-progress progress { background-color: @accent_color; border-radius: 6px; }
        "#;

        let provider = gtk::CssProvider::new();
        provider.load_from_string(css);

        if let Some(display) = gtk::gdk::Display::default() {
            gtk::style_context_add_provider_for_display(
                &display, &provider, gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
            );
        }
    }
}

/// Fallback preview in a libadwaita window.
#[derive(Debug, Clone)]
pub struct GtkPreview {
    config: PreviewConfig,
}

impl GtkPreview {
    pub fn new(config: &PreviewConfig) -> Self {
        Self { config: config.clone() }
    }
}

impl PreviewRenderer for GtkPreview {
    fn name(&self) -> &'static str {
        "GTK window"
    }

    fn run(&mut self, session: CaptureSession) -> Result<(CaptureSession, RenderExit)> {
        if let Err(e) = adw::init() {
            return Ok((session, RenderExit::DisplayLost(e.to_string())));
        }

        let result = ResultSlot::default();
        let app = FaceDatasetApplication::new(session, result.clone(), &self.config);
        let status = app.run_with_args::<&str>(&[]);
        log::debug!("GTK application exited with {:?}", status);

        let outcome = result.borrow_mut().take();
        match outcome {
            Some(PreviewResult::Done(session)) => Ok((session, RenderExit::Finished)),
            Some(PreviewResult::Failed(e)) => Err(e),
            None => match app.take_pending() {
                Some(session) => Ok((
                    session,
                    RenderExit::DisplayLost("GTK application did not open a window".to_string()),
                )),
                None => Err(face_dataset_core::DatasetError::DisplayUnavailable(
                    "preview window closed without returning the session".to_string(),
                )),
            },
        }
    }
}
