// gpu/kernel.rs — Compute pipeline creation with compiler diagnostics captured.

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::gpu::device::GpuDevice;

/// Compile `source` and build a compute pipeline for `entry_point` with a
/// single bind group layout.
///
/// Shader and pipeline creation run inside a validation error scope, so a
/// rejected kernel comes back as `Error::KernelCompile` carrying the
/// compiler output rather than tripping wgpu's uncaptured-error panic.
pub(crate) fn compile_compute(
    gpu: &GpuDevice,
    entry_point: &'static str,
    source: &str,
    bgl: &wgpu::BindGroupLayout,
) -> Result<wgpu::ComputePipeline> {
    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(entry_point),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(entry_point),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });

    let pipeline = gpu.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(entry_point),
        layout: Some(&layout),
        module: &module,
        entry_point,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    });

    if let Some(err) = pollster::block_on(gpu.device.pop_error_scope()) {
        let diagnostics = err.to_string();
        error!(kernel = entry_point, %diagnostics, "kernel compilation failed");
        return Err(Error::KernelCompile {
            kernel: entry_point,
            diagnostics,
        });
    }
    debug!(kernel = entry_point, "kernel compiled");
    Ok(pipeline)
}
