use face_dataset_core::config::DatasetConfig;
use face_dataset_core::{CaptureOutcome, PhotoRole, SessionSummary};

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn print_banner(config: &DatasetConfig) {
    println!("\n{}", rule());
    println!("FACE DATASET CREATOR");
    println!("{}", rule());
    println!("This tool creates a face dataset by capturing");
    println!("{} labeled photos of one person.", config.dataset.target_photo_count);
    println!("{}", rule());
}

pub fn print_instructions(config: &DatasetConfig) {
    let total = config.dataset.target_photo_count;
    println!("\n{}", rule());
    println!("PHOTO CAPTURE INSTRUCTIONS");
    println!("{}", rule());
    println!("You will take {} photos:", total);
    if config.dataset.require_front_face_first {
        println!("  - Photo 1: front photo, taken only once a face is detected");
    } else {
        println!("  - Photo 1: front photo (look directly at the camera)");
    }
    if total > 1 {
        println!("  - Photos 2-{}: different angles and expressions", total);
    }
    println!("\nControls:");
    println!("  - SPACE (or the Capture button) takes a photo");
    println!("  - ESC (or the Cancel button) cancels");
    println!("{}", rule());
}

pub fn report_capture(outcome: &CaptureOutcome, total: u32) {
    match outcome {
        CaptureOutcome::Saved(photo) => {
            let name = photo
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match photo.role {
                PhotoRole::Frontal => println!("✓ Front photo captured: {}", name),
                PhotoRole::Pose => println!("✓ Photo {}/{} captured: {}", photo.ordinal, total, name),
            }
        }
        CaptureOutcome::Rejected(reason) => println!("⚠ {}", reason),
    }
}

pub fn print_summary(summary: &SessionSummary, subject: &str) {
    match summary {
        SessionSummary::Completed { photos, directory, info_path } => {
            println!("\n{}", rule());
            println!("DATASET CREATION COMPLETE!");
            println!("{}", rule());
            println!("Person: {}", subject);
            println!("Photos saved: {}", photos);
            println!("Location: {}", directory.display());
            println!("Info file: {}", info_path.display());
            println!("{}", rule());
        }
        SessionSummary::Cancelled { photos_taken } => {
            println!("\n⚠ Capture cancelled by user ({} photo(s) kept, no dataset info written).", photos_taken);
        }
        SessionSummary::Incomplete { photos_taken } => {
            println!("\n⚠ Capture ended early ({} photo(s) kept, no dataset info written).", photos_taken);
        }
    }
}
