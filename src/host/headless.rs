//! A host that renders nothing.
//!
//! Records every submitted frame so tests can assert on the produced draw
//! lists without a GPU or a windowing system.

use std::cell::RefCell;
use std::rc::Rc;

use super::{CameraState, DrawList, Host};

/// Shared recording of everything a [`HeadlessHost`] received.
#[derive(Debug, Default)]
pub struct FrameRecord {
    pub frames: Vec<DrawList>,
    pub removed: Vec<String>,
}

impl FrameRecord {
    /// The most recent submitted frame.
    pub fn last_frame(&self) -> Option<&DrawList> {
        self.frames.last()
    }
}

/// Headless host backend. The engine is single-threaded cooperative, so a
/// plain `Rc<RefCell<_>>` hands the recording to the test.
pub struct HeadlessHost {
    camera: Rc<RefCell<CameraState>>,
    record: Rc<RefCell<FrameRecord>>,
}

impl HeadlessHost {
    /// Creates the host plus the handle tests use to inspect submissions.
    pub fn new() -> (Self, Rc<RefCell<FrameRecord>>) {
        let record = Rc::new(RefCell::new(FrameRecord::default()));
        let host = HeadlessHost {
            camera: Rc::new(RefCell::new(CameraState::default())),
            record: record.clone(),
        };
        (host, record)
    }

    /// A settable camera handle, for culling tests.
    pub fn camera_handle(&self) -> Rc<RefCell<CameraState>> {
        self.camera.clone()
    }
}

impl Host for HeadlessHost {
    fn camera(&self) -> CameraState {
        *self.camera.borrow()
    }

    fn submit(&mut self, frame: &DrawList) -> Result<(), failure::Error> {
        self.record.borrow_mut().frames.push(frame.clone());
        Ok(())
    }

    fn remove(&mut self, feature_id: &str) {
        self.record.borrow_mut().removed.push(feature_id.to_string());
    }
}
