// config.rs — Session configuration.
//
// Every tuning knob has a default matching the reference cadence
// (16 px blocks, ±3 px search, early-out at SAD 100, 16 ms acquire timeout)
// and can be overridden from the environment:
//
//   INTERFRAME_BLOCK_SIZE     motion block edge B (pixels)
//   INTERFRAME_SEARCH_RADIUS  search radius R (pixels)
//   INTERFRAME_EARLY_OUT      early-out SAD threshold
//   INTERFRAME_TIMEOUT_MS     capture acquire timeout
//   INTERFRAME_SYNC_INTERVAL  refreshes per present (0 = unthrottled)
//   INTERFRAME_REFRESH_HZ     display refresh used to pace presentation
//   INTERFRAME_COMPUTE        auto | cpu | gpu
//   INTERFRAME_WIDTH / INTERFRAME_HEIGHT / INTERFRAME_CAPTURE_FPS
//                             synthetic capture surface
//   INTERFRAME_STATS_INTERVAL cycles between statistics log lines
//
// The block/radius/threshold tuning is empirical; nothing derives it.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::image::FrameSize;
use crate::motion::MotionParams;

/// Which compute path runs estimation and synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeBackend {
    /// Try the GPU first, fall back to the CPU reference path.
    #[default]
    Auto,
    /// CPU reference implementation.
    Cpu,
    /// wgpu compute kernels. Failing to create a device is fatal.
    Gpu,
}

impl ComputeBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }
}

impl fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComputeBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            other => Err(Error::Config(format!(
                "unknown compute backend `{other}` (expected auto, cpu or gpu)"
            ))),
        }
    }
}

/// Configuration for a frame-generation session.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGenConfig {
    /// Block size, search radius and early-out threshold.
    pub motion: MotionParams,
    /// Bounded wait for the next captured frame, in milliseconds.
    pub acquire_timeout_ms: u32,
    /// Display refreshes per present. 1 locks presentation to vsync.
    pub sync_interval: u32,
    /// Refresh rate used to pace presentation when the surface cannot
    /// report its own.
    pub refresh_hz: u32,
    /// Compute path selection.
    pub compute: ComputeBackend,
    /// Synthetic capture surface size.
    pub capture_size: FrameSize,
    /// Synthetic capture frame rate.
    pub capture_fps: u32,
    /// Emit a statistics line every this many completed cycles.
    pub stats_interval: u64,
}

impl Default for FrameGenConfig {
    fn default() -> Self {
        FrameGenConfig {
            motion: MotionParams::default(),
            acquire_timeout_ms: 16,
            sync_interval: 1,
            refresh_hz: 60,
            compute: ComputeBackend::Auto,
            capture_size: FrameSize::new(1280, 720),
            capture_fps: 60,
            stats_interval: 300,
        }
    }
}

impl FrameGenConfig {
    /// Defaults overridden by `INTERFRAME_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    /// name. Validates the result.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = FrameGenConfig::default();

        if let Some(v) = parse_var(&lookup, "INTERFRAME_BLOCK_SIZE")? {
            cfg.motion.block_size = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_SEARCH_RADIUS")? {
            cfg.motion.search_radius = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_EARLY_OUT")? {
            cfg.motion.early_out_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_TIMEOUT_MS")? {
            cfg.acquire_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_SYNC_INTERVAL")? {
            cfg.sync_interval = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_REFRESH_HZ")? {
            cfg.refresh_hz = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_COMPUTE")? {
            cfg.compute = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_WIDTH")? {
            cfg.capture_size.width = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_HEIGHT")? {
            cfg.capture_size.height = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_CAPTURE_FPS")? {
            cfg.capture_fps = v;
        }
        if let Some(v) = parse_var(&lookup, "INTERFRAME_STATS_INTERVAL")? {
            cfg.stats_interval = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.motion.validate()?;
        if self.acquire_timeout_ms == 0 {
            return Err(Error::Config("acquire timeout must be at least 1 ms".into()));
        }
        if self.refresh_hz == 0 {
            return Err(Error::Config("refresh rate must be non-zero".into()));
        }
        if self.capture_size.is_empty() {
            return Err(Error::Config(format!(
                "capture size {} must be non-empty",
                self.capture_size
            )));
        }
        if self.capture_fps == 0 {
            return Err(Error::Config("capture frame rate must be non-zero".into()));
        }
        Ok(())
    }
}

/// Parse one variable if it is set and non-blank.
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{name}={trimmed:?} is not a valid value")))
}
