// gpu/synth.rs — GPU motion-compensated synthesis kernel.
//
// Mirrors `FrameSynthesizer::synthesize` in synth.rs, except that the
// bilinear filter is the sampler's. Hardware filtering quantizes the blend
// weights, so results may differ from the CPU path by one or two levels on
// odd vectors; even vectors and the zero vector land on texel centres and
// match exactly.

use crate::error::Result;
use crate::gpu::device::GpuDevice;
use crate::gpu::frame::FRAME_FORMAT;
use crate::gpu::kernel::compile_compute;
use crate::image::FrameSize;
use crate::motion::MotionParams;

/// Uniform block; must match `struct SynthParams` in synth.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct SynthUniforms {
    width: u32,
    height: u32,
    block_size: u32,
    search_radius: u32,
    grid_w: u32,
    _pad: [u32; 3],
}

impl SynthUniforms {
    pub(crate) fn new(size: FrameSize, params: &MotionParams) -> Self {
        let (gw, _) = params.grid_size(size);
        SynthUniforms {
            width: size.width,
            height: size.height,
            block_size: params.block_size as u32,
            search_radius: params.search_radius,
            grid_w: gw as u32,
            _pad: [0; 3],
        }
    }
}

/// Compiled `synthesize` pipeline plus its sampler.
pub struct SynthKernel {
    pipeline: wgpu::ComputePipeline,
    bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl SynthKernel {
    pub const ENTRY_POINT: &'static str = "synthesize";

    pub fn new(gpu: &GpuDevice) -> Result<Self> {
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("previous frame sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bgl = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("synth BGL"),
            entries: &[
                // binding 0: previous frame, filterable for the linear sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                // binding 1: sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // binding 2: motion field (storage read)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 3: output frame (storage write)
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: FRAME_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // binding 4: params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
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
            &gpu.pixel_workgroup.specialize(include_str!("../shaders/synth.wgsl")),
            &bgl,
        )?;
        Ok(SynthKernel { pipeline, bgl, sampler })
    }

    pub fn bind(
        &self,
        gpu: &GpuDevice,
        previous: &wgpu::TextureView,
        field: &wgpu::Buffer,
        output: &wgpu::TextureView,
        uniforms: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("synth BG"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(previous) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
                wgpu::BindGroupEntry { binding: 2, resource: field.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(output) },
                wgpu::BindGroupEntry { binding: 4, resource: uniforms.as_entire_binding() },
            ],
        })
    }

    /// Record one dispatch covering every output pixel.
    pub fn encode(
        &self,
        gpu: &GpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        size: FrameSize,
    ) {
        let (wg_x, wg_y) = gpu.pixel_workgroup.dispatch_size(size.width, size.height);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(Self::ENTRY_POINT),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(wg_x, wg_y, 1);
    }
}
