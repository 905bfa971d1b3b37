// session.rs — The frame-generation engine and its lifecycle.
//
//   Uninitialized ──new()──► Ready ──run()/run_cycle()──► Running ◄─┐
//                                                          │  │    │ cycle
//                                                          │  └────┘
//                              capture lost ◄──────────────┤
//                                   │          user close ◄┘
//                                   ▼              │
//                          TerminatingOnLoss  TerminatingOnUserClose
//                                   └──────┬───────┘
//                                          ▼
//                                      TornDown
//
// One cycle: acquire → age buffers → estimate → synthesize → present.
// A timeout skips the cycle without touching any buffer. Access loss ends
// the session before any stage runs. The loop checks for a close request
// before every cycle, so close is only observed between cycles.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use crate::capture::{Acquisition, CaptureBackend, FrameSource, SourceStats};
use crate::config::FrameGenConfig;
use crate::error::{Error, Result};
use crate::generator::FrameGenerator;
use crate::image::FrameSize;
use crate::present::{ControlEvent, Presenter};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Running,
    TerminatingOnLoss,
    TerminatingOnUserClose,
    TornDown,
}

impl SessionState {
    /// Whether `self → to` is a legal transition.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Uninitialized, Ready)
                | (Ready, Running)
                | (Ready, TornDown)
                | (Running, Running)
                | (Running, TerminatingOnLoss)
                | (Running, TerminatingOnUserClose)
                // Fatal steady-state error.
                | (Running, TornDown)
                | (TerminatingOnLoss, TornDown)
                | (TerminatingOnUserClose, TornDown)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why a cycle did not present a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Timeout,
    CaptureFailed,
}

/// Result of one [`Session::run_cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Presented,
    Skipped(SkipReason),
    /// Capture access was lost; the session is terminating.
    Lost,
}

/// Why [`Session::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    UserClosed,
    AccessLost,
}

/// Counters reported at teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    /// Cycles that presented a synthesized frame.
    pub cycles: u64,
    pub timeouts: u64,
    pub capture_failures: u64,
    /// Time spent in presented cycles, acquisition included.
    pub busy_time: Duration,
    pub source: SourceStats,
}

impl SessionStats {
    pub fn mean_cycle_time(&self) -> Option<Duration> {
        (self.cycles > 0).then(|| self.busy_time.div_f64(self.cycles as f64))
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles, {} timeouts, {} capture failures",
            self.cycles, self.timeouts, self.capture_failures
        )?;
        if let Some(mean) = self.mean_cycle_time() {
            write!(f, ", mean cycle {:.2} ms", mean.as_secs_f64() * 1e3)?;
        }
        Ok(())
    }
}

/// Owns the capture source, the compute backend and the presenter, and
/// drives them through the cycle.
pub struct Session<B: CaptureBackend, G: FrameGenerator, P: Presenter> {
    state: SessionState,
    source: FrameSource<B>,
    generator: G,
    presenter: P,
    sync_interval: u32,
    stats_interval: u64,
    stats: SessionStats,
}

impl<B: CaptureBackend, G: FrameGenerator, P: Presenter> Session<B, G, P> {
    /// Bring the session to `Ready`.
    ///
    /// # Errors
    /// `Error::SizeMismatch` if the backend, generator and presenter do
    /// not agree on the frame size.
    pub fn new(backend: B, generator: G, presenter: P, config: &FrameGenConfig) -> Result<Self> {
        let size = backend.size();
        check_size(size, generator.size())?;
        check_size(size, presenter.size())?;

        let mut session = Session {
            state: SessionState::Uninitialized,
            source: FrameSource::new(backend, config.acquire_timeout_ms),
            generator,
            presenter,
            sync_interval: config.sync_interval,
            stats_interval: config.stats_interval,
            stats: SessionStats::default(),
        };
        session.transition(SessionState::Ready)?;
        info!(
            %size,
            backend = session.generator.name(),
            timeout_ms = config.acquire_timeout_ms,
            sync_interval = config.sync_interval,
            "session ready"
        );
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn source(&self) -> &FrameSource<B> {
        &self.source
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            source: self.source.stats(),
            ..self.stats
        }
    }

    /// Loop until the user closes the window or capture access is lost.
    ///
    /// Fatal errors are returned with the session left in `Running`;
    /// call [`teardown`](Self::teardown) afterwards in every case.
    pub fn run(&mut self) -> Result<ExitReason> {
        self.ensure_running()?;
        loop {
            if self.presenter.poll_events() == ControlEvent::CloseRequested {
                self.transition(SessionState::TerminatingOnUserClose)?;
                return Ok(ExitReason::UserClosed);
            }
            match self.run_cycle() {
                Ok(CycleOutcome::Lost) => return Ok(ExitReason::AccessLost),
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "fatal error during cycle");
                    return Err(e);
                }
            }
        }
    }

    /// Run one acquire → age → estimate → synthesize → present cycle.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.ensure_running()?;
        let started = Instant::now();

        // `None` means a frame was ingested and the cycle continues. The
        // guard (and with it the borrow of the source) ends inside the match.
        let early = match self.source.acquire().and_then(Acquisition::into_frame) {
            // Released when `guard` drops at the end of this arm, whether or
            // not the copy succeeded.
            Ok(guard) => self.generator.advance(guard.data()).map(|()| None),
            Err(e) => Err(e),
        };

        let early = match early {
            Ok(early) => early,
            Err(Error::AcquireTimeout) => {
                self.stats.timeouts += 1;
                trace!("no new frame, cycle skipped");
                Some(CycleOutcome::Skipped(SkipReason::Timeout))
            }
            Err(Error::AccessLost) => Some(CycleOutcome::Lost),
            Err(e) if e.is_transient() => {
                self.stats.capture_failures += 1;
                warn!(error = %e, "capture failed, cycle skipped");
                Some(CycleOutcome::Skipped(SkipReason::CaptureFailed))
            }
            Err(e) => return Err(e),
        };

        match early {
            Some(CycleOutcome::Lost) => {
                warn!("capture access lost, terminating");
                self.transition(SessionState::TerminatingOnLoss)?;
                return Ok(CycleOutcome::Lost);
            }
            Some(outcome) => return Ok(outcome),
            None => {}
        }

        self.generator.generate()?;
        let output = self.generator.output()?;
        self.presenter.present(output, self.sync_interval)?;

        self.transition(SessionState::Running)?;
        self.stats.cycles += 1;
        self.stats.busy_time += started.elapsed();
        trace!(cycle = self.stats.cycles, "frame presented");

        if self.stats_interval > 0 && self.stats.cycles % self.stats_interval == 0 {
            debug!(stats = %self.stats(), "cycle statistics");
        }
        Ok(CycleOutcome::Presented)
    }

    /// Move to `TornDown` and report the final statistics.
    pub fn teardown(&mut self) -> Result<SessionStats> {
        self.transition(SessionState::TornDown)?;
        let stats = self.stats();
        info!(%stats, "session torn down");
        Ok(stats)
    }

    fn ensure_running(&mut self) -> Result<()> {
        match self.state {
            SessionState::Running => Ok(()),
            SessionState::Ready => {
                self.transition(SessionState::Running)?;
                info!("session running");
                Ok(())
            }
            from => Err(Error::InvalidTransition {
                from,
                to: SessionState::Running,
            }),
        }
    }

    fn transition(&mut self, to: SessionState) -> Result<()> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition { from, to });
        }
        if from != to {
            debug!(%from, %to, "session state change");
        }
        self.state = to;
        Ok(())
    }
}

fn check_size(expected: FrameSize, actual: FrameSize) -> Result<()> {
    if expected != actual {
        return Err(Error::SizeMismatch { expected, actual });
    }
    Ok(())
}
