use crate::error::Result;
use crate::frame::{Detection, Frame};

/// Finds frontal faces in a frame. Implementations keep no per-frame state.
pub trait FaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Detection>;
}

#[cfg(feature = "vision")]
pub use haar::HaarFaceDetector;

#[cfg(feature = "vision")]
mod haar {
    use log::{debug, info};
    use opencv::core::{Rect, Size, Vector};
    use opencv::objdetect::CascadeClassifier;
    use opencv::prelude::*;
    use opencv::imgproc;
    use std::path::Path;

    use super::FaceDetector;
    use crate::config::DetectionConfig;
    use crate::error::{DatasetError, Result};
    use crate::frame::{Detection, Frame, Region};

    pub struct HaarFaceDetector {
        classifier: CascadeClassifier,
        scale_factor: f64,
        min_neighbors: i32,
        min_size: Size,
    }

    impl std::fmt::Debug for HaarFaceDetector {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("HaarFaceDetector")
                .field("scale_factor", &self.scale_factor)
                .field("min_neighbors", &self.min_neighbors)
                .field("min_size", &(self.min_size.width, self.min_size.height))
                .finish()
        }
    }

    impl HaarFaceDetector {
        pub fn load(path: &Path, config: &DetectionConfig) -> Result<Self> {
            let unavailable = |reason: String| DatasetError::ClassifierUnavailable {
                path: path.to_path_buf(),
                reason,
            };

            if !path.exists() {
                return Err(unavailable("file not found".to_string()));
            }
            let path_str = path
                .to_str()
                .ok_or_else(|| unavailable("path is not valid UTF-8".to_string()))?;

            let classifier = CascadeClassifier::new(path_str)
                .map_err(|e| unavailable(e.to_string()))?;
            if classifier.empty().map_err(|e| unavailable(e.to_string()))? {
                return Err(unavailable("cascade is empty".to_string()));
            }

            info!("Loaded face classifier from {:?}", path);

            Ok(Self {
                classifier,
                scale_factor: config.scale_factor,
                min_neighbors: config.min_neighbors,
                min_size: Size::new(config.min_face_size, config.min_face_size),
            })
        }
    }

    impl FaceDetector for HaarFaceDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Detection> {
            let mat = frame.to_mat()?;
            let mut gray = opencv::core::Mat::default();
            imgproc::cvt_color(&mat, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

            let mut faces = Vector::<Rect>::new();
            self.classifier.detect_multi_scale(
                &gray,
                &mut faces,
                self.scale_factor,
                self.min_neighbors,
                0,
                self.min_size,
                Size::default(),
            )?;

            let regions: Vec<Region> = faces
                .iter()
                .map(|r| Region::new(r.x, r.y, r.width, r.height))
                .collect();

            if !regions.is_empty() {
                debug!("Detected {} face(s)", regions.len());
            }

            Ok(Detection::with_regions(regions))
        }
    }
}
