use crate::error::{DatasetError, Result};

/// A single camera frame, BGR, 8 bits per channel, rows packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub bgr_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(bgr_data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if bgr_data.len() != expected {
            return Err(DatasetError::InvalidFrame(format!(
                "{} bytes for {}x{} (expected {})",
                bgr_data.len(), width, height, expected
            )));
        }
        Ok(Self { bgr_data, width, height })
    }

    /// A frame filled with a single color.
    pub fn solid(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let bgr_data = bgr.repeat(width as usize * height as usize);
        Self { bgr_data, width, height }
    }

    /// Copy of the pixel data in RGB order, for toolkits that want it.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.bgr_data.len());
        for px in self.bgr_data.chunks_exact(3) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        rgb
    }

    pub fn stride(&self) -> usize {
        self.width as usize * 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// Face regions found in one frame, in detector order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub regions: Vec<Region>,
}

impl Detection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_regions(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn has_face(&self) -> bool {
        !self.regions.is_empty()
    }
}

#[cfg(feature = "vision")]
mod mat {
    use opencv::core::{Mat, Scalar, CV_8UC3};
    use opencv::prelude::*;

    use super::Frame;
    use crate::error::{DatasetError, Result};

    impl Frame {
        pub fn from_mat(mat: &Mat) -> Result<Self> {
            if mat.empty() {
                return Err(DatasetError::FrameRead("empty frame".to_string()));
            }
            if mat.typ() != CV_8UC3 {
                return Err(DatasetError::InvalidFrame(format!(
                    "unsupported Mat type {}", mat.typ()
                )));
            }

            let owned;
            let mat = if mat.is_continuous() {
                mat
            } else {
                owned = mat.try_clone()?;
                &owned
            };

            let data = mat.data_bytes()?.to_vec();
            Frame::new(data, mat.cols() as u32, mat.rows() as u32)
        }

        pub fn to_mat(&self) -> Result<Mat> {
            let mut mat = Mat::new_rows_cols_with_default(
                self.height as i32,
                self.width as i32,
                CV_8UC3,
                Scalar::all(0.0),
            )?;
            mat.data_bytes_mut()?.copy_from_slice(&self.bgr_data);
            Ok(mat)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        assert!(Frame::new(vec![0; 10], 2, 2).is_err());
        assert!(Frame::new(vec![0; 12], 2, 2).is_ok());
    }

    #[test]
    fn to_rgb_swaps_channels() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1).unwrap();
        assert_eq!(frame.to_rgb(), vec![3, 2, 1, 6, 5, 4]);
        assert_eq!(frame.stride(), 6);
    }

    #[test]
    fn detection_reports_faces() {
        assert!(!Detection::none().has_face());

        let d = Detection::with_regions(vec![
            Region::new(0, 0, 10, 10),
            Region::new(5, 5, 120, 110),
        ]);
        assert!(d.has_face());
        assert_eq!(d.regions.len(), 2);
    }
}
