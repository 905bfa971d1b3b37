// interframe: motion-compensated intermediate frame generation
//
// Captures a live display surface and synthesizes an in-between frame from
// each pair of captures by block-matching motion estimation followed by a
// half-vector resample of the older frame.
//
// The CPU modules (motion, synth, resources) are the reference
// implementation; gpu/ runs the same algorithm as wgpu compute kernels.

pub mod capture;
pub mod config;
pub mod error;
pub mod generator;
pub mod gpu;
pub mod image;
pub mod logging;
pub mod motion;
pub mod present;
pub mod resources;
pub mod session;
pub mod synth;

pub use capture::{AcquireStatus, Acquisition, CaptureBackend, FrameGuard, FrameSource};
pub use config::{ComputeBackend, FrameGenConfig};
pub use error::{Error, ErrorClass, Result};
pub use generator::{CpuFrameGenerator, FrameGenerator};
pub use image::{Frame, FrameSize, Image, Rgba};
pub use motion::{MotionEstimator, MotionField, MotionParams, MotionVector};
pub use present::{ControlEvent, NullPresenter, Presenter};
pub use session::{CycleOutcome, ExitReason, Session, SessionState, SessionStats};
pub use synth::FrameSynthesizer;
