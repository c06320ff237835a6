mod app;
mod cascade;
mod console;
mod highgui_preview;
mod window;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{info, warn};

use face_dataset_core::camera::DeviceOpener;
use face_dataset_core::config::DatasetConfig;
use face_dataset_core::dataset::JpegWriter;
use face_dataset_core::detector::HaarFaceDetector;
use face_dataset_core::prompt::{confirm, prompt_subject_name, wait_for_enter};
use face_dataset_core::{
    drive, prepare_subject_dir, CameraOpener, CaptureSession, DatasetError, PreviewRenderer,
    SessionSettings,
};

use app::GtkPreview;
use highgui_preview::HighguiPreview;

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\nError: {:#}", e);
            if let Some(hint) = e.downcast_ref::<DatasetError>().and_then(DatasetError::hint) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config = DatasetConfig::load_default().context("Failed to load configuration")?;
    console::print_banner(&config);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let detector = load_detector(&config, &mut input, &mut output)?;

    let subject = prompt_subject_name(&mut input, &mut output)?;
    let root = &config.dataset.root;
    let subject_dir = prepare_subject_dir(
        root,
        &subject,
        config.dataset.existing_subject_dir,
        |dir| {
            let question = format!("Directory {} already exists. Continue?", dir.display());
            confirm(&mut input, &mut output, &question)
        },
    )?;
    let Some(subject_dir) = subject_dir else {
        println!("Exiting...");
        return Ok(());
    };

    console::print_instructions(&config);
    wait_for_enter(&mut input, &mut output, "Press ENTER to start the camera...")?;

    // The probe decides whether the OpenCV window is tried at all.
    let highgui_ok = match highgui_preview::probe_display() {
        Ok(()) => true,
        Err(reason) => {
            warn!("OpenCV window unavailable ({}), using GTK preview", reason);
            false
        }
    };

    let opener = DeviceOpener::new(config.camera.clone());
    let camera = opener.open()?;

    let session = CaptureSession::new(
        SessionSettings {
            subject: subject.clone(),
            output_dir: subject_dir,
            target_photo_count: config.dataset.target_photo_count,
            require_front_face_first: config.dataset.require_front_face_first,
        },
        camera,
        Box::new(detector),
        Box::new(JpegWriter::default()),
    );

    let mut renderers: Vec<Box<dyn PreviewRenderer>> = Vec::new();
    if highgui_ok {
        renderers.push(Box::new(HighguiPreview::new(&config.preview)));
    }
    renderers.push(Box::new(GtkPreview::new(&config.preview)));

    let session = drive(session, renderers, &opener)?;
    let summary = session.finish()?;
    console::print_summary(&summary, &subject);
    Ok(())
}

/// Resolves the frontal-face cascade, offering to download it when it is
/// not installed.
fn load_detector<R: BufRead, W: Write>(
    config: &DatasetConfig,
    input: &mut R,
    output: &mut W,
) -> Result<HaarFaceDetector> {
    let path = match cascade::resolve(config.detection.cascade_path.as_deref()) {
        Some(path) => path,
        None => {
            let models_dir = cascade::user_models_dir();
            let question = format!(
                "Face classifier {} not found. Download it to {}?",
                cascade::CASCADE_FILE,
                models_dir.display()
            );
            if !confirm(input, output, &question)? {
                return Err(DatasetError::ClassifierUnavailable {
                    path: models_dir.join(cascade::CASCADE_FILE),
                    reason: "not installed".to_string(),
                }
                .into());
            }
            cascade::download(&models_dir)?
        }
    };

    info!("Using face classifier {:?}", path);
    Ok(HaarFaceDetector::load(&path, &config.detection)?)
}
