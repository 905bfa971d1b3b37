// resources.rs — Rotating frame buffers for the CPU compute path.
//
// All four buffers are allocated once when the session starts and are
// overwritten in place every cycle.

use crate::error::{Error, Result};
use crate::image::{Frame, FrameSize};
use crate::motion::{MotionField, MotionParams};

/// The per-session buffers: two captures, the motion field and the output.
pub struct FrameResources {
    size: FrameSize,
    previous: Frame,
    current: Frame,
    motion: MotionField,
    output: Frame,
    ingested: u64,
}

impl FrameResources {
    pub fn new(size: FrameSize, params: &MotionParams) -> Result<Self> {
        if size.is_empty() {
            return Err(Error::ResourceCreation {
                resource: "frame buffers",
                reason: format!("frame size {size} is empty"),
            });
        }
        let (w, h) = (size.width as usize, size.height as usize);
        Ok(FrameResources {
            size,
            previous: Frame::new(w, h),
            current: Frame::new(w, h),
            motion: MotionField::new(size, params),
            output: Frame::new(w, h),
            ingested: 0,
        })
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// Age `current` into `previous`, then copy the new capture into
    /// `current`. The order matters: swapping it would overwrite the frame
    /// that is about to become `previous`.
    pub fn age_and_ingest(&mut self, capture: &[u8]) -> Result<()> {
        if capture.len() != self.size.rgba_len() {
            return Err(Error::Capture(format!(
                "capture holds {} bytes, expected {} for {}",
                capture.len(),
                self.size.rgba_len(),
                self.size
            )));
        }
        self.previous.copy_from(&self.current);
        self.current.copy_from_rgba_bytes(capture);
        self.ingested += 1;
        Ok(())
    }

    /// Number of captures ingested so far.
    pub fn ingested(&self) -> u64 {
        self.ingested
    }

    pub fn previous(&self) -> &Frame {
        &self.previous
    }

    pub fn current(&self) -> &Frame {
        &self.current
    }

    pub fn motion(&self) -> &MotionField {
        &self.motion
    }

    pub fn output(&self) -> &Frame {
        &self.output
    }

    /// Split borrow for the estimation stage.
    pub fn estimation_views(&mut self) -> (&Frame, &Frame, &mut MotionField) {
        (&self.previous, &self.current, &mut self.motion)
    }

    /// Split borrow for the synthesis stage.
    pub fn synthesis_views(&mut self) -> (&Frame, &MotionField, &mut Frame) {
        (&self.previous, &self.motion, &mut self.output)
    }
}
