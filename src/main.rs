// main.rs — The interframe binary: live frame generation from a captured
// display surface.
//
// No command-line flags; configuration comes from `INTERFRAME_*`
// environment variables and logging from `RUST_LOG`.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use interframe::capture::SyntheticCapture;
use interframe::gpu::{GpuDevice, GpuFrameGenerator};
use interframe::{
    ComputeBackend, CpuFrameGenerator, ExitReason, FrameGenConfig, FrameGenerator, Presenter, Session,
};

fn main() -> ExitCode {
    interframe::logging::init_logging();

    match run() {
        Ok(reason) => {
            info!(?reason, "exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitReason> {
    let config = FrameGenConfig::from_env().context("reading INTERFRAME_* configuration")?;
    info!(?config, "starting interframe");

    let backend = SyntheticCapture::new(config.capture_size, config.capture_fps);
    let generator = build_generator(&config)?;
    let presenter = build_presenter(&config)?;

    let mut session =
        Session::new(backend, generator, presenter, &config).context("initializing session")?;

    let result = session.run();
    let stats = session.teardown()?;
    info!(%stats, "final statistics");
    result.context("frame generation stopped")
}

fn build_generator(config: &FrameGenConfig) -> Result<Box<dyn FrameGenerator>> {
    let cpu = || -> Result<Box<dyn FrameGenerator>> {
        Ok(Box::new(CpuFrameGenerator::new(config.capture_size, config.motion)?))
    };
    let gpu = || -> interframe::Result<Box<dyn FrameGenerator>> {
        let device = GpuDevice::new()?;
        Ok(Box::new(GpuFrameGenerator::new(device, config.capture_size, config.motion)?))
    };

    match config.compute {
        ComputeBackend::Cpu => cpu(),
        ComputeBackend::Gpu => gpu().context("initializing GPU compute"),
        ComputeBackend::Auto => match gpu() {
            Ok(generator) => Ok(generator),
            Err(e) if e.permits_cpu_fallback() => {
                warn!(error = %e, "GPU compute unavailable, using the CPU path");
                cpu()
            }
            Err(e) => Err(e).context("initializing GPU compute"),
        },
    }
}

#[cfg(feature = "window")]
fn build_presenter(config: &FrameGenConfig) -> Result<Box<dyn Presenter>> {
    let window = interframe::present::WindowPresenter::new("interframe", config.capture_size, config.refresh_hz)?;
    Ok(Box::new(window))
}

#[cfg(not(feature = "window"))]
fn build_presenter(config: &FrameGenConfig) -> Result<Box<dyn Presenter>> {
    info!("built without a window; presenting headless");
    Ok(Box::new(interframe::NullPresenter::paced(config.capture_size, config.refresh_hz)))
}
