//! In-memory camera, detector and photo writer for unit tests.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::camera::{CameraOpener, FrameSource};
use crate::dataset::PhotoWriter;
use crate::detector::FaceDetector;
use crate::error::{DatasetError, Result};
use crate::frame::{Detection, Frame, Region};

/// Cloning shares the counters, so a test can keep a handle after boxing one.
#[derive(Clone, Default)]
pub struct FakeCamera {
    reads: Rc<Cell<u32>>,
    fail_reads: Rc<Cell<bool>>,
    handle: Rc<()>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }

    /// True once every boxed clone of this camera has been dropped.
    pub fn released(&self) -> bool {
        Rc::strong_count(&self.handle) == 1
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }
}

impl FrameSource for FakeCamera {
    fn read_frame(&mut self) -> Result<Frame> {
        if self.fail_reads.get() {
            return Err(DatasetError::FrameRead("fake read failure".to_string()));
        }
        self.reads.set(self.reads.get() + 1);
        Ok(Frame::solid(8, 6, [10, 20, 30]))
    }
}

/// Hands out fresh `FakeCamera`s and remembers them.
#[derive(Clone, Default)]
pub struct FakeOpener {
    pub opened: Rc<RefCell<Vec<FakeCamera>>>,
}

impl CameraOpener for FakeOpener {
    fn open(&self) -> Result<Box<dyn FrameSource>> {
        let camera = FakeCamera::new();
        self.opened.borrow_mut().push(camera.clone());
        Ok(Box::new(camera))
    }
}

#[derive(Clone, Default)]
pub struct FakeDetector {
    face: Rc<Cell<bool>>,
}

impl FakeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_face(&self, face: bool) {
        self.face.set(face);
    }
}

impl FaceDetector for FakeDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Detection> {
        if self.face.get() {
            Ok(Detection::with_regions(vec![Region::new(1, 1, 4, 4)]))
        } else {
            Ok(Detection::none())
        }
    }
}

/// Creates an empty file for every photo so naming sees it on disk.
#[derive(Clone, Default)]
pub struct RecordingWriter {
    paths: Rc<RefCell<Vec<PathBuf>>>,
    fail_next: Rc<Cell<bool>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.borrow().clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.set(true);
    }
}

impl PhotoWriter for RecordingWriter {
    fn write(&mut self, path: &Path, _frame: &Frame) -> Result<()> {
        if self.fail_next.replace(false) {
            return Err(DatasetError::ImageWrite {
                path: path.to_path_buf(),
                reason: "fake write failure".to_string(),
            });
        }
        std::fs::write(path, b"").map_err(|e| DatasetError::io(path, e))?;
        self.paths.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}
