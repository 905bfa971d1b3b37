// tests/test_session.rs — End-to-end cycles with scripted capture and a
// headless presenter.

use interframe::capture::{ScriptStep, ScriptedCapture, SyntheticCapture};
use interframe::image::{Frame, FrameSize};
use interframe::motion::{MotionField, MotionVector};
use interframe::session::SkipReason;
use interframe::{
    CpuFrameGenerator, CycleOutcome, Error, ExitReason, FrameGenConfig, FrameGenerator, NullPresenter,
    Session, SessionState,
};

const SIZE: FrameSize = FrameSize::new(64, 48);

/// Wraps a generator and counts stage invocations.
struct Counting<G> {
    inner: G,
    advances: u64,
    generates: u64,
}

impl<G: FrameGenerator> Counting<G> {
    fn new(inner: G) -> Self {
        Counting { inner, advances: 0, generates: 0 }
    }
}

impl<G: FrameGenerator> FrameGenerator for Counting<G> {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn size(&self) -> FrameSize {
        self.inner.size()
    }

    fn advance(&mut self, capture: &[u8]) -> interframe::Result<()> {
        self.advances += 1;
        self.inner.advance(capture)
    }

    fn generate(&mut self) -> interframe::Result<()> {
        self.generates += 1;
        self.inner.generate()
    }

    fn output(&mut self) -> interframe::Result<&Frame> {
        self.inner.output()
    }

    fn motion_field(&mut self) -> interframe::Result<&MotionField> {
        self.inner.motion_field()
    }
}

type TestSession = Session<ScriptedCapture, Counting<CpuFrameGenerator>, NullPresenter>;

fn config() -> FrameGenConfig {
    FrameGenConfig {
        capture_size: SIZE,
        stats_interval: 1,
        ..FrameGenConfig::default()
    }
}

fn scene_frame(n: u64) -> ScriptStep {
    ScriptStep::Frame(SyntheticCapture::unpaced(SIZE).render_frame(n))
}

fn session(script: Vec<ScriptStep>, presenter: NullPresenter) -> TestSession {
    let generator = CpuFrameGenerator::new(SIZE, config().motion).unwrap();
    Session::new(
        ScriptedCapture::new(SIZE, script),
        Counting::new(generator),
        presenter,
        &config(),
    )
    .unwrap()
}

#[test]
fn new_session_is_ready() {
    let s = session(vec![], NullPresenter::new(SIZE));
    assert_eq!(s.state(), SessionState::Ready);
}

#[test]
fn size_mismatch_is_rejected_at_startup() {
    let generator = CpuFrameGenerator::new(SIZE, config().motion).unwrap();
    let err = Session::new(
        ScriptedCapture::new(SIZE, vec![]),
        generator,
        NullPresenter::new(FrameSize::new(32, 32)),
        &config(),
    )
    .err()
    .expect("mismatched presenter must be rejected");
    assert!(matches!(err, Error::SizeMismatch { .. }));
}

#[test]
fn timeout_skips_without_touching_buffers() {
    let mut s = session(
        vec![scene_frame(0), scene_frame(1), ScriptStep::Timeout],
        NullPresenter::new(SIZE),
    );
    assert_eq!(s.run_cycle().unwrap(), CycleOutcome::Presented);
    assert_eq!(s.run_cycle().unwrap(), CycleOutcome::Presented);

    let res = s.generator().inner.resources();
    let (prev, curr, out) = (res.previous().clone(), res.current().clone(), res.output().clone());
    let field = res.motion().clone();

    assert_eq!(s.run_cycle().unwrap(), CycleOutcome::Skipped(SkipReason::Timeout));
    let res = s.generator().inner.resources();
    assert_eq!(res.previous(), &prev);
    assert_eq!(res.current(), &curr);
    assert_eq!(res.output(), &out);
    assert_eq!(res.motion(), &field);
    assert_eq!(s.generator().generates, 2);
    assert_eq!(s.presenter().presented(), 2);
    assert_eq!(s.state(), SessionState::Running);
    assert_eq!(s.stats().timeouts, 1);
}

#[test]
fn access_loss_runs_no_stage_and_terminates() {
    let mut s = session(vec![ScriptStep::Lost { frame_held: true }], NullPresenter::new(SIZE));
    assert_eq!(s.run().unwrap(), ExitReason::AccessLost);
    assert_eq!(s.state(), SessionState::TerminatingOnLoss);
    assert_eq!(s.generator().advances, 0);
    assert_eq!(s.generator().generates, 0);
    assert_eq!(s.presenter().presented(), 0);
    assert_eq!(s.source().backend().releases(), 1);

    let stats = s.teardown().unwrap();
    assert_eq!(s.state(), SessionState::TornDown);
    assert_eq!(stats.cycles, 0);
    assert_eq!(stats.source.lost, 1);
}

#[test]
fn loss_after_frames_stops_the_loop() {
    let mut s = session(
        vec![scene_frame(0), ScriptStep::Timeout, scene_frame(1), ScriptStep::Lost { frame_held: false }],
        NullPresenter::new(SIZE),
    );
    assert_eq!(s.run().unwrap(), ExitReason::AccessLost);
    assert_eq!(s.generator().generates, 2);
    assert_eq!(s.stats().cycles, 2);
    assert_eq!(s.source().backend().remaining(), 0);
}

#[test]
fn user_close_is_observed_between_cycles() {
    let script = (0..6).map(scene_frame).collect();
    let mut s = session(script, NullPresenter::new(SIZE).with_close_after(3));
    assert_eq!(s.run().unwrap(), ExitReason::UserClosed);
    assert_eq!(s.state(), SessionState::TerminatingOnUserClose);
    assert_eq!(s.presenter().presented(), 3);
    assert_eq!(s.source().backend().remaining(), 3);
    assert!(!s.source().backend().is_holding());

    let stats = s.teardown().unwrap();
    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.source.releases, 3);
}

#[test]
fn capture_failure_skips_one_cycle() {
    let mut s = session(
        vec![
            ScriptStep::Failed { frame_held: true, reason: "busy".into() },
            ScriptStep::Empty,
            scene_frame(0),
        ],
        NullPresenter::new(SIZE),
    );
    assert_eq!(s.run_cycle().unwrap(), CycleOutcome::Skipped(SkipReason::CaptureFailed));
    assert_eq!(s.run_cycle().unwrap(), CycleOutcome::Skipped(SkipReason::CaptureFailed));
    assert_eq!(s.run_cycle().unwrap(), CycleOutcome::Presented);
    assert_eq!(s.stats().capture_failures, 2);
    assert_eq!(s.source().backend().releases(), 3);
    assert_eq!(s.source().backend().spurious_releases(), 0);
}

#[test]
fn cycles_after_teardown_are_rejected() {
    let mut s = session(vec![scene_frame(0)], NullPresenter::new(SIZE));
    s.teardown().unwrap();
    let err = s.run_cycle().unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition { from: SessionState::TornDown, to: SessionState::Running }
    ));
    assert!(s.teardown().is_err());
}

#[test]
fn synthesized_frame_sits_halfway_along_the_motion() {
    // Scene drifts (2, 0) px per frame: interior output pixels come from
    // one pixel to the left in the older capture.
    let scene = SyntheticCapture::unpaced(SIZE).with_velocity(2, 0);
    let frame0 = Frame::from_rgba_bytes(64, 48, &scene.render_frame(0));
    let generator = CpuFrameGenerator::new(SIZE, config().motion).unwrap();
    let mut s = Session::new(scene, generator, NullPresenter::new(SIZE), &config()).unwrap();

    assert_eq!(s.run_cycle().unwrap(), CycleOutcome::Presented);
    assert_eq!(s.run_cycle().unwrap(), CycleOutcome::Presented);

    let field = s.generator_mut().motion_field().unwrap().clone();
    assert_eq!(field.offset(1, 1), MotionVector::new(2, 0));

    let presented = s.presenter().back_buffer();
    for y in 16..32 {
        for x in 16..32 {
            assert_eq!(presented.get(x, y), frame0.get(x - 1, y), "pixel ({x},{y})");
        }
    }
    assert_eq!(s.source().stats().releases, 2);
}
