// gpu/mod.rs — wgpu compute path.
//
// Mirrors the CPU estimator and synthesizer with two WGSL kernels on one
// queue. The CPU implementations remain the reference; the tests in
// generator.rs compare the two on the same captures.
//
//   device.rs     adapter selection, workgroup shapes
//   frame.rs      RGBA8 textures, upload, padded readback
//   kernel.rs     pipeline compilation with captured diagnostics
//   motion.rs     estimate_motion kernel (one invocation per block)
//   synth.rs      synthesize kernel (one invocation per pixel)
//   generator.rs  persistent resources and the per-cycle command stream

pub mod device;
pub mod frame;
pub mod generator;
pub(crate) mod kernel;
pub mod motion;
pub mod synth;

pub use device::{GpuDevice, GpuError};
pub use generator::GpuFrameGenerator;
