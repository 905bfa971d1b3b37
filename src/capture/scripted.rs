// capture/scripted.rs — Deterministic capture backend that replays a fixed script.
//
// Useful for replaying recorded sequences and for driving the session
// through timeout, failure and loss paths without a display.

use std::collections::VecDeque;

use super::{AcquireStatus, CaptureBackend};
use crate::image::FrameSize;

/// One scripted acquisition result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Deliver these RGBA8 bytes.
    Frame(Vec<u8>),
    /// Report a successful acquisition that carries no image.
    Empty,
    Timeout,
    Lost { frame_held: bool },
    Failed { frame_held: bool, reason: String },
}

/// Replays [`ScriptStep`]s in order. Once the script runs out every
/// acquisition times out.
#[derive(Debug)]
pub struct ScriptedCapture {
    size: FrameSize,
    script: VecDeque<ScriptStep>,
    held: Option<Option<Vec<u8>>>,
    acquisitions: u64,
    releases: u64,
    /// Releases requested while nothing was held.
    spurious_releases: u64,
    /// Acquisitions attempted while a frame was still held.
    overlapping_acquires: u64,
}

impl ScriptedCapture {
    pub fn new(size: FrameSize, script: impl IntoIterator<Item = ScriptStep>) -> Self {
        ScriptedCapture {
            size,
            script: script.into_iter().collect(),
            held: None,
            acquisitions: 0,
            releases: 0,
            spurious_releases: 0,
            overlapping_acquires: 0,
        }
    }

    pub fn push(&mut self, step: ScriptStep) {
        self.script.push_back(step);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }

    pub fn releases(&self) -> u64 {
        self.releases
    }

    pub fn spurious_releases(&self) -> u64 {
        self.spurious_releases
    }

    pub fn overlapping_acquires(&self) -> u64 {
        self.overlapping_acquires
    }

    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }
}

impl CaptureBackend for ScriptedCapture {
    fn size(&self) -> FrameSize {
        self.size
    }

    fn acquire_next_frame(&mut self, _timeout_ms: u32) -> AcquireStatus {
        self.acquisitions += 1;
        if self.held.is_some() {
            self.overlapping_acquires += 1;
        }
        match self.script.pop_front() {
            Some(ScriptStep::Frame(bytes)) => {
                self.held = Some(Some(bytes));
                AcquireStatus::Acquired
            }
            Some(ScriptStep::Empty) => {
                self.held = Some(None);
                AcquireStatus::Acquired
            }
            Some(ScriptStep::Timeout) | None => AcquireStatus::Timeout,
            Some(ScriptStep::Lost { frame_held }) => {
                if frame_held {
                    self.held = Some(None);
                }
                AcquireStatus::Lost { frame_held }
            }
            Some(ScriptStep::Failed { frame_held, reason }) => {
                if frame_held {
                    self.held = Some(None);
                }
                AcquireStatus::Failed { frame_held, reason }
            }
        }
    }

    fn frame_data(&self) -> Option<&[u8]> {
        self.held.as_ref().and_then(|h| h.as_deref())
    }

    fn release_frame(&mut self) {
        if self.held.take().is_some() {
            self.releases += 1;
        } else {
            self.spurious_releases += 1;
        }
    }
}
