// gpu/motion.rs — GPU block-matching kernel.
//
// Mirrors `MotionEstimator::estimate` in motion.rs. The motion field lives
// in a storage buffer of vec2<f32>, one per block, row-major over the grid,
// which the synthesis kernel then reads in the same command buffer.

use crate::error::Result;
use crate::gpu::device::GpuDevice;
use crate::gpu::kernel::compile_compute;
use crate::image::FrameSize;
use crate::motion::MotionParams;

/// Uniform block; must match `struct MotionParams` in motion.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct MotionUniforms {
    width: u32,
    height: u32,
    block_size: u32,
    search_radius: u32,
    early_out: f32,
    grid_w: u32,
    grid_h: u32,
    _pad: u32,
}

impl MotionUniforms {
    pub(crate) fn new(size: FrameSize, params: &MotionParams) -> Self {
        let (gw, gh) = params.grid_size(size);
        MotionUniforms {
            width: size.width,
            height: size.height,
            block_size: params.block_size as u32,
            search_radius: params.search_radius,
            early_out: params.early_out_threshold,
            grid_w: gw as u32,
            grid_h: gh as u32,
            _pad: 0,
        }
    }
}

/// Compiled `estimate_motion` pipeline.
pub struct MotionKernel {
    pipeline: wgpu::ComputePipeline,
    bgl: wgpu::BindGroupLayout,
}

impl MotionKernel {
    pub const ENTRY_POINT: &'static str = "estimate_motion";

    pub fn new(gpu: &GpuDevice) -> Result<Self> {
        let bgl = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("motion BGL"),
            entries: &[
                // binding 0: previous frame
                texture_entry(0),
                // binding 1: current frame
                texture_entry(1),
                // binding 2: motion field (storage read_write)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 3: params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline = compile_compute(
            gpu,
            Self::ENTRY_POINT,
            &gpu.block_workgroup.specialize(include_str!("../shaders/motion.wgsl")),
            &bgl,
        )?;
        Ok(MotionKernel { pipeline, bgl })
    }

    /// Bind group for one set of persistent resources.
    pub fn bind(
        &self,
        gpu: &GpuDevice,
        previous: &wgpu::TextureView,
        current: &wgpu::TextureView,
        field: &wgpu::Buffer,
        uniforms: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("motion BG"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(previous) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(current) },
                wgpu::BindGroupEntry { binding: 2, resource: field.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: uniforms.as_entire_binding() },
            ],
        })
    }

    /// Record one dispatch covering a `grid_w`×`grid_h` block grid.
    pub fn encode(
        &self,
        gpu: &GpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        grid_w: u32,
        grid_h: u32,
    ) {
        let (wg_x, wg_y) = gpu.block_workgroup.dispatch_size(grid_w, grid_h);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(Self::ENTRY_POINT),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(wg_x, wg_y, 1);
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    }
}
