// present.rs — Presentation surfaces.
//
// A presenter copies the synthesized frame into its back buffer and shows
// it once every `sync_interval` display refreshes. It also reports whether
// the user asked to close, which the session checks before each cycle.
//
//   WindowPresenter  minifb window (feature `window`)
//   NullPresenter    headless: keeps the last frame, optional auto-close

use std::thread;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::image::{Frame, FrameSize};

#[cfg(feature = "window")]
pub use window::WindowPresenter;

/// Control events observed between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    None,
    CloseRequested,
}

/// A display surface the session presents to.
pub trait Presenter {
    fn size(&self) -> FrameSize;

    /// Drain pending window events.
    fn poll_events(&mut self) -> ControlEvent;

    /// Copy `frame` to the back buffer and present it, waiting for
    /// `sync_interval` refreshes (0 = do not wait).
    fn present(&mut self, frame: &Frame, sync_interval: u32) -> Result<()>;
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn size(&self) -> FrameSize {
        (**self).size()
    }

    fn poll_events(&mut self) -> ControlEvent {
        (**self).poll_events()
    }

    fn present(&mut self, frame: &Frame, sync_interval: u32) -> Result<()> {
        (**self).present(frame, sync_interval)
    }
}

// ---------------------------------------------------------------------------
// Refresh pacing
// ---------------------------------------------------------------------------

/// Emulates a vertical-sync wait for surfaces that do not block on present.
#[derive(Debug, Clone)]
pub struct VsyncPacer {
    refresh: Duration,
    last: Option<Instant>,
}

impl VsyncPacer {
    pub fn new(refresh_hz: u32) -> Self {
        VsyncPacer {
            refresh: Duration::from_secs_f64(1.0 / refresh_hz.max(1) as f64),
            last: None,
        }
    }

    pub fn refresh_period(&self) -> Duration {
        self.refresh
    }

    /// Block until `sync_interval` refresh periods have passed since the
    /// previous present.
    pub fn wait(&mut self, sync_interval: u32) {
        let now = Instant::now();
        if sync_interval == 0 {
            self.last = Some(now);
            return;
        }
        let Some(last) = self.last else {
            self.last = Some(now);
            return;
        };
        let target = last + self.refresh * sync_interval;
        if target > now {
            thread::sleep(target - now);
            self.last = Some(target);
        } else {
            self.last = Some(now);
        }
    }
}

// ---------------------------------------------------------------------------
// NullPresenter
// ---------------------------------------------------------------------------

/// Headless presenter. Keeps a copy of the last presented frame.
pub struct NullPresenter {
    back_buffer: Frame,
    presented: u64,
    close_after: Option<u64>,
    pacer: Option<VsyncPacer>,
}

impl NullPresenter {
    /// Unpaced: `present` returns immediately.
    pub fn new(size: FrameSize) -> Self {
        NullPresenter {
            back_buffer: Frame::new(size.width as usize, size.height as usize),
            presented: 0,
            close_after: None,
            pacer: None,
        }
    }

    /// Paced at `refresh_hz` like a vsynced swap chain.
    pub fn paced(size: FrameSize, refresh_hz: u32) -> Self {
        NullPresenter {
            pacer: Some(VsyncPacer::new(refresh_hz)),
            ..NullPresenter::new(size)
        }
    }

    /// Request close once `frames` frames have been presented.
    pub fn with_close_after(mut self, frames: u64) -> Self {
        self.close_after = Some(frames);
        self
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// The most recently presented frame.
    pub fn back_buffer(&self) -> &Frame {
        &self.back_buffer
    }
}

impl Presenter for NullPresenter {
    fn size(&self) -> FrameSize {
        self.back_buffer.size()
    }

    fn poll_events(&mut self) -> ControlEvent {
        match self.close_after {
            Some(n) if self.presented >= n => ControlEvent::CloseRequested,
            _ => ControlEvent::None,
        }
    }

    fn present(&mut self, frame: &Frame, sync_interval: u32) -> Result<()> {
        self.back_buffer.copy_from(frame);
        if let Some(pacer) = &mut self.pacer {
            pacer.wait(sync_interval);
        }
        self.presented += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WindowPresenter
// ---------------------------------------------------------------------------

#[cfg(feature = "window")]
mod window {
    use minifb::{Key, Window, WindowOptions};
    use tracing::info;

    use super::{ControlEvent, Presenter, VsyncPacer};
    use crate::error::{Error, Result};
    use crate::image::{Frame, FrameSize};

    /// A minifb window showing the synthesized frames.
    pub struct WindowPresenter {
        window: Window,
        size: FrameSize,
        back_buffer: Vec<u32>,
        pacer: VsyncPacer,
    }

    impl WindowPresenter {
        pub fn new(title: &str, size: FrameSize, refresh_hz: u32) -> Result<Self> {
            let mut window = Window::new(
                title,
                size.width as usize,
                size.height as usize,
                WindowOptions {
                    resize: false,
                    ..WindowOptions::default()
                },
            )
            .map_err(|e| Error::Initialization(format!("window creation failed: {e}")))?;
            // Pacing is done by `VsyncPacer` so the sync interval applies.
            window.set_target_fps(0);
            info!(%size, refresh_hz, "presentation window open");

            Ok(WindowPresenter {
                window,
                size,
                back_buffer: vec![0; size.pixel_count()],
                pacer: VsyncPacer::new(refresh_hz),
            })
        }
    }

    impl Presenter for WindowPresenter {
        fn size(&self) -> FrameSize {
            self.size
        }

        fn poll_events(&mut self) -> ControlEvent {
            if !self.window.is_open() || self.window.is_key_down(Key::Escape) {
                ControlEvent::CloseRequested
            } else {
                ControlEvent::None
            }
        }

        fn present(&mut self, frame: &Frame, sync_interval: u32) -> Result<()> {
            if frame.size() != self.size {
                return Err(Error::Present(format!(
                    "frame {} does not fit a {} window",
                    frame.size(),
                    self.size
                )));
            }
            // minifb wants 0RGB packed in a u32.
            for (dst, &[r, g, b, _]) in self.back_buffer.iter_mut().zip(frame.as_slice()) {
                *dst = (r as u32) << 16 | (g as u32) << 8 | b as u32;
            }
            self.pacer.wait(sync_interval);
            self.window
                .update_with_buffer(&self.back_buffer, self.size.width as usize, self.size.height as usize)
                .map_err(|e| Error::Present(e.to_string()))
        }
    }
}
