// capture/mod.rs — Frame acquisition with a bounded wait.
//
// A `CaptureBackend` is the platform seam (desktop duplication, a synthetic
// scene, a scripted replay). `FrameSource` wraps it and turns its status
// codes into three outcomes the session can act on:
//
//   Frame(guard) : a new frame is held; the guard releases it on drop
//   Timeout      : nothing new within the wait; skip the cycle
//   Lost         : the backend is invalidated; end the session
//
// Any other failure comes back as `Error::Capture` and also skips the cycle.
//
// RELEASE DISCIPLINE
// ──────────────────
// Backends hand out at most one frame at a time and need it back before the
// next acquisition. Every path that leaves a frame held, including the
// failure paths, goes through a `FrameGuard`, whose `Drop` is the only
// place `release_frame` is called. A timeout never holds a frame and is
// never released.

pub mod scripted;
pub mod synthetic;

use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::image::FrameSize;

pub use scripted::{ScriptStep, ScriptedCapture};
pub use synthetic::SyntheticCapture;

/// Raw result of one backend acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireStatus {
    /// A new frame is held and readable through `frame_data`.
    Acquired,
    /// No new frame within the timeout. Nothing is held.
    Timeout,
    /// The backend lost access to the surface.
    Lost { frame_held: bool },
    /// Any other failure.
    Failed { frame_held: bool, reason: String },
}

/// A source of display frames.
pub trait CaptureBackend {
    /// Size of every frame this backend produces.
    fn size(&self) -> FrameSize;

    /// Wait up to `timeout_ms` for the next frame.
    fn acquire_next_frame(&mut self, timeout_ms: u32) -> AcquireStatus;

    /// Tightly packed RGBA8 bytes of the held frame. `None` if no frame is
    /// held or the acquisition produced no image.
    fn frame_data(&self) -> Option<&[u8]>;

    /// Return the held frame to the backend.
    fn release_frame(&mut self);
}

impl<B: CaptureBackend + ?Sized> CaptureBackend for Box<B> {
    fn size(&self) -> FrameSize {
        (**self).size()
    }

    fn acquire_next_frame(&mut self, timeout_ms: u32) -> AcquireStatus {
        (**self).acquire_next_frame(timeout_ms)
    }

    fn frame_data(&self) -> Option<&[u8]> {
        (**self).frame_data()
    }

    fn release_frame(&mut self) {
        (**self).release_frame()
    }
}

/// Acquisition counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub acquired: u64,
    pub timeouts: u64,
    pub lost: u64,
    pub failures: u64,
    pub releases: u64,
}

/// A held frame. Dropping it releases the frame back to the backend.
pub struct FrameGuard<'a, B: CaptureBackend> {
    backend: &'a mut B,
    releases: &'a mut u64,
}

impl<B: CaptureBackend> FrameGuard<'_, B> {
    /// The held frame's RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        self.backend.frame_data().unwrap_or(&[])
    }
}

impl<B: CaptureBackend> Drop for FrameGuard<'_, B> {
    fn drop(&mut self) {
        self.backend.release_frame();
        *self.releases += 1;
    }
}

/// Outcome of [`FrameSource::acquire`].
pub enum Acquisition<'a, B: CaptureBackend> {
    Frame(FrameGuard<'a, B>),
    Timeout,
    Lost,
}

impl<'a, B: CaptureBackend> Acquisition<'a, B> {
    /// The held frame, with the other outcomes as their error kinds:
    /// `Timeout` becomes `Error::AcquireTimeout` (transient) and `Lost`
    /// becomes `Error::AccessLost` (fatal).
    pub fn into_frame(self) -> Result<FrameGuard<'a, B>> {
        match self {
            Acquisition::Frame(guard) => Ok(guard),
            Acquisition::Timeout => Err(Error::AcquireTimeout),
            Acquisition::Lost => Err(Error::AccessLost),
        }
    }
}

impl<B: CaptureBackend> std::fmt::Debug for Acquisition<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Acquisition::Frame(g) => write!(f, "Frame({} bytes)", g.data().len()),
            Acquisition::Timeout => f.write_str("Timeout"),
            Acquisition::Lost => f.write_str("Lost"),
        }
    }
}

/// Bounded-wait frame acquisition over a [`CaptureBackend`].
pub struct FrameSource<B: CaptureBackend> {
    backend: B,
    timeout_ms: u32,
    stats: SourceStats,
}

impl<B: CaptureBackend> FrameSource<B> {
    pub fn new(backend: B, timeout_ms: u32) -> Self {
        FrameSource {
            backend,
            timeout_ms,
            stats: SourceStats::default(),
        }
    }

    pub fn size(&self) -> FrameSize {
        self.backend.size()
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn stats(&self) -> SourceStats {
        self.stats
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Wait for the next frame.
    ///
    /// Returns `Err(Error::Capture)` for failures that should skip the
    /// cycle; any frame the backend held has been released by then.
    pub fn acquire(&mut self) -> Result<Acquisition<'_, B>> {
        match self.backend.acquire_next_frame(self.timeout_ms) {
            AcquireStatus::Acquired => {
                if self.backend.frame_data().is_none() {
                    self.stats.failures += 1;
                    warn!("capture backend acquired a frame without an image");
                    drop(self.guard());
                    return Err(Error::Capture("acquired frame carried no image".into()));
                }
                self.stats.acquired += 1;
                trace!(n = self.stats.acquired, "frame acquired");
                Ok(Acquisition::Frame(self.guard()))
            }
            AcquireStatus::Timeout => {
                self.stats.timeouts += 1;
                trace!("acquire timed out");
                Ok(Acquisition::Timeout)
            }
            AcquireStatus::Lost { frame_held } => {
                self.stats.lost += 1;
                if frame_held {
                    drop(self.guard());
                }
                Ok(Acquisition::Lost)
            }
            AcquireStatus::Failed { frame_held, reason } => {
                self.stats.failures += 1;
                if frame_held {
                    drop(self.guard());
                }
                Err(Error::Capture(reason))
            }
        }
    }

    fn guard(&mut self) -> FrameGuard<'_, B> {
        FrameGuard {
            backend: &mut self.backend,
            releases: &mut self.stats.releases,
        }
    }
}
