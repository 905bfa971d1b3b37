// generator.rs — The compute side of a cycle, behind one trait.
//
// A `FrameGenerator` owns the rotating buffers and runs the three compute
// stages. Two implementations exist:
//
//   CpuFrameGenerator  (this file)       authoritative reference
//   GpuFrameGenerator  (gpu/generator.rs) wgpu kernels, same results
//
// STAGE ORDER
// ───────────
// Each stage only reads slots written by an earlier stage of the same
// cycle, except `ingest`, which reads the `current` frame left over from
// the previous cycle before overwriting it. `STAGES` records this and
// `check_stage_order` verifies that no stage reads a slot that a later
// stage writes.

use tracing::trace;

use crate::error::{Error, Result};
use crate::image::{Frame, FrameSize};
use crate::motion::{MotionEstimator, MotionField, MotionParams};
use crate::resources::FrameResources;
use crate::synth::FrameSynthesizer;

/// Compute backend contract used by the session.
pub trait FrameGenerator {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn size(&self) -> FrameSize;

    /// Age `current` into `previous`, then take `capture` as the new
    /// `current`. `capture` is tightly packed RGBA8.
    fn advance(&mut self, capture: &[u8]) -> Result<()>;

    /// Estimate motion between `previous` and `current`, then synthesize
    /// the intermediate frame into `output`.
    fn generate(&mut self) -> Result<()>;

    /// The most recently synthesized frame.
    fn output(&mut self) -> Result<&Frame>;

    /// The most recently estimated motion field.
    fn motion_field(&mut self) -> Result<&MotionField>;
}

impl<G: FrameGenerator + ?Sized> FrameGenerator for Box<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn size(&self) -> FrameSize {
        (**self).size()
    }

    fn advance(&mut self, capture: &[u8]) -> Result<()> {
        (**self).advance(capture)
    }

    fn generate(&mut self) -> Result<()> {
        (**self).generate()
    }

    fn output(&mut self) -> Result<&Frame> {
        (**self).output()
    }

    fn motion_field(&mut self) -> Result<&MotionField> {
        (**self).motion_field()
    }
}

// ---------------------------------------------------------------------------
// Stage table
// ---------------------------------------------------------------------------

/// A buffer touched by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The backend's held frame.
    Capture,
    Previous,
    Current,
    Motion,
    Output,
}

/// Buffers one stage reads and writes.
#[derive(Debug, Clone, Copy)]
pub struct StageIo {
    pub name: &'static str,
    pub reads: &'static [Slot],
    pub writes: &'static [Slot],
}

/// The per-cycle stages in execution order.
pub const STAGES: [StageIo; 4] = [
    StageIo {
        name: "ingest",
        reads: &[Slot::Current, Slot::Capture],
        writes: &[Slot::Previous, Slot::Current],
    },
    StageIo {
        name: "estimate",
        reads: &[Slot::Previous, Slot::Current],
        writes: &[Slot::Motion],
    },
    StageIo {
        name: "synthesize",
        reads: &[Slot::Previous, Slot::Motion],
        writes: &[Slot::Output],
    },
    StageIo {
        name: "present",
        reads: &[Slot::Output],
        writes: &[],
    },
];

/// Verify a stage table has no feedback edge.
///
/// Every slot read by a stage after the first must be written by an
/// earlier stage, and no stage may write a slot read by an earlier one.
pub fn check_stage_order(stages: &[StageIo]) -> std::result::Result<(), String> {
    for (i, stage) in stages.iter().enumerate().skip(1) {
        for slot in stage.reads {
            if !stages[..i].iter().any(|s| s.writes.contains(slot)) {
                return Err(format!(
                    "stage `{}` reads {slot:?}, which no earlier stage writes",
                    stage.name
                ));
            }
        }
    }
    for (i, stage) in stages.iter().enumerate() {
        for later in &stages[i + 1..] {
            if let Some(slot) = later.writes.iter().find(|w| stage.reads.contains(w)) {
                return Err(format!(
                    "stage `{}` writes {slot:?} after `{}` read it",
                    later.name, stage.name
                ));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CPU implementation
// ---------------------------------------------------------------------------

/// Reference generator running the estimator and synthesizer on the CPU.
pub struct CpuFrameGenerator {
    resources: FrameResources,
    estimator: MotionEstimator,
    synthesizer: FrameSynthesizer,
    generated: u64,
}

impl CpuFrameGenerator {
    pub fn new(size: FrameSize, params: MotionParams) -> Result<Self> {
        params.validate()?;
        Ok(CpuFrameGenerator {
            resources: FrameResources::new(size, &params)?,
            estimator: MotionEstimator::new(params),
            synthesizer: FrameSynthesizer::new(),
            generated: 0,
        })
    }

    pub fn resources(&self) -> &FrameResources {
        &self.resources
    }

    /// Number of frames synthesized so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }
}

impl FrameGenerator for CpuFrameGenerator {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn size(&self) -> FrameSize {
        self.resources.size()
    }

    fn advance(&mut self, capture: &[u8]) -> Result<()> {
        self.resources.age_and_ingest(capture)
    }

    fn generate(&mut self) -> Result<()> {
        if self.resources.ingested() == 0 {
            return Err(Error::Capture("no frame has been ingested yet".into()));
        }
        let (previous, current, motion) = self.resources.estimation_views();
        self.estimator.estimate(previous, current, motion);

        let (previous, motion, output) = self.resources.synthesis_views();
        self.synthesizer.synthesize(previous, motion, output);

        self.generated += 1;
        trace!(n = self.generated, "cpu frame generated");
        Ok(())
    }

    fn output(&mut self) -> Result<&Frame> {
        Ok(self.resources.output())
    }

    fn motion_field(&mut self) -> Result<&MotionField> {
        Ok(self.resources.motion())
    }
}
