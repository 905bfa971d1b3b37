// error.rs — Error taxonomy for the frame-generation pipeline.

use thiserror::Error;

use crate::gpu::device::GpuError;
use crate::image::FrameSize;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Device or backend setup failed before the session could start.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// GPU adapter/device selection failed.
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// A compute kernel was rejected by the shader compiler. `diagnostics`
    /// carries the compiler output verbatim for the operator.
    #[error("kernel `{kernel}` failed to compile:\n{diagnostics}")]
    KernelCompile {
        kernel: &'static str,
        diagnostics: String,
    },

    /// A surface, view or buffer could not be allocated.
    #[error("failed to create {resource}: {reason}")]
    ResourceCreation {
        resource: &'static str,
        reason: String,
    },

    /// Collaborators disagree on the frame size.
    #[error("frame size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        expected: FrameSize,
        actual: FrameSize,
    },

    /// No frame arrived within the acquisition timeout. Produced by
    /// `Acquisition::into_frame`.
    #[error("timed out waiting for the next frame")]
    AcquireTimeout,

    /// The capture backend was invalidated (e.g. a display mode change).
    /// Produced by `Acquisition::into_frame`.
    #[error("capture access lost")]
    AccessLost,

    /// Any other capture backend failure.
    #[error("capture backend error: {0}")]
    Capture(String),

    /// The presentation surface rejected a frame.
    #[error("presentation failed: {0}")]
    Present(String),

    /// Reading the synthesized frame back from the GPU failed.
    #[error("GPU readback failed: {0}")]
    Readback(String),

    /// A configuration value is out of range or unparsable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A session lifecycle call was made in the wrong state.
    #[error("invalid session transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::session::SessionState,
        to: crate::session::SessionState,
    },
}

/// How the session loop should react to an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Startup failure. No partial session runs.
    Initialization,
    /// Expected at steady state; skip the cycle.
    Transient,
    /// Steady-state failure that ends the session.
    Fatal,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Initialization(_)
            | Self::Gpu(_)
            | Self::KernelCompile { .. }
            | Self::ResourceCreation { .. }
            | Self::SizeMismatch { .. }
            | Self::Config(_) => ErrorClass::Initialization,
            Self::AcquireTimeout | Self::Capture(_) => ErrorClass::Transient,
            Self::AccessLost
            | Self::Present(_)
            | Self::Readback(_)
            | Self::InvalidTransition { .. } => ErrorClass::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }

    /// Whether startup may retry on the CPU path after this GPU error.
    ///
    /// Only a missing adapter or a refused device qualifies. A kernel that
    /// fails to compile, or any resource failure, still aborts startup.
    pub fn permits_cpu_fallback(&self) -> bool {
        matches!(self, Self::Gpu(_))
    }
}

/// Result type alias using the crate's `Error`.
pub type Result<T> = std::result::Result<T, Error>;
