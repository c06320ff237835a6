use crate::error::Result;
use crate::frame::Frame;

/// A synchronous source of camera frames. Dropping it releases the device.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame>;
}

/// Opens the capture device. Used once at startup and again when the
/// preview hands the session over to another renderer.
pub trait CameraOpener {
    fn open(&self) -> Result<Box<dyn FrameSource>>;
}

#[cfg(feature = "vision")]
pub use device::{Camera, DeviceOpener};

#[cfg(feature = "vision")]
mod device {
    use log::{info, warn};
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::videoio::{self, VideoCapture};

    use super::{CameraOpener, FrameSource};
    use crate::config::CameraConfig;
    use crate::error::{DatasetError, Result};
    use crate::frame::Frame;

    #[cfg(target_os = "linux")]
    const CAPTURE_API: i32 = videoio::CAP_V4L2;
    #[cfg(not(target_os = "linux"))]
    const CAPTURE_API: i32 = videoio::CAP_ANY;

    pub struct Camera {
        capture: VideoCapture,
        device_id: i32,
    }

    impl Camera {
        pub fn open(config: &CameraConfig) -> Result<Self> {
            let device_id = config.device_id;
            let unavailable = |reason: String| DatasetError::CameraUnavailable { device_id, reason };

            let mut capture = VideoCapture::new(device_id, CAPTURE_API)
                .map_err(|e| unavailable(e.to_string()))?;

            if !capture.is_opened().unwrap_or(false) {
                return Err(unavailable("device did not open".to_string()));
            }

            if capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.frame_width as f64).is_err()
                || capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.frame_height as f64).is_err()
            {
                warn!("Camera {} rejected the requested resolution", device_id);
            }

            let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
            let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
            info!("Opened camera {} at {}x{}", device_id, width, height);

            Ok(Self { capture, device_id })
        }
    }

    impl FrameSource for Camera {
        fn read_frame(&mut self) -> Result<Frame> {
            let mut mat = Mat::default();
            let ok = self
                .capture
                .read(&mut mat)
                .map_err(|e| DatasetError::FrameRead(e.to_string()))?;

            if !ok || mat.empty() {
                return Err(DatasetError::FrameRead("empty frame".to_string()));
            }

            Frame::from_mat(&mat)
        }
    }

    impl Drop for Camera {
        fn drop(&mut self) {
            let _ = self.capture.release();
            info!("Released camera {}", self.device_id);
        }
    }

    /// Opens the configured V4L2 (or platform default) device.
    #[derive(Debug, Clone)]
    pub struct DeviceOpener {
        config: CameraConfig,
    }

    impl DeviceOpener {
        pub fn new(config: CameraConfig) -> Self {
            Self { config }
        }
    }

    impl CameraOpener for DeviceOpener {
        fn open(&self) -> Result<Box<dyn FrameSource>> {
            Ok(Box::new(Camera::open(&self.config)?))
        }
    }
}
