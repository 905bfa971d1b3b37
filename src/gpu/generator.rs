// gpu/generator.rs — The cycle on the GPU.
//
// Every resource is created once in `new`: five textures, the motion field
// buffer and its readback twin, both uniform buffers, both bind groups and
// the output readback buffer. A cycle allocates nothing.
//
// COMMAND ORDER (one encoder, one submit per cycle)
// ─────────────────────────────────────────────────
//   queue.write_texture(capture)          staged before the submit
//   copy current  → previous              ┐
//   copy capture  → current               │ advance()
//   pass estimate_motion  (writes field)  ┐
//   pass synthesize       (reads field)   │ generate()
//   copy output   → readback buffer       ┘
//   submit, map, unpack into the CPU output frame
//
// The two compute passes are separate passes on one queue, so wgpu's usage
// tracking places a barrier between the field writes and the reads.

use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::generator::FrameGenerator;
use crate::gpu::device::GpuDevice;
use crate::gpu::frame::{map_and_read, FrameReadback, GpuFrame};
use crate::gpu::motion::{MotionKernel, MotionUniforms};
use crate::gpu::synth::{SynthKernel, SynthUniforms};
use crate::image::{Frame, FrameSize};
use crate::motion::{MotionField, MotionParams};

/// wgpu implementation of [`FrameGenerator`].
pub struct GpuFrameGenerator {
    size: FrameSize,
    params: MotionParams,
    grid: (u32, u32),

    capture: GpuFrame,
    previous: GpuFrame,
    current: GpuFrame,
    output: GpuFrame,
    field: wgpu::Buffer,
    field_readback: wgpu::Buffer,
    output_readback: FrameReadback,

    motion: MotionKernel,
    motion_bg: wgpu::BindGroup,
    synth: SynthKernel,
    synth_bg: wgpu::BindGroup,

    /// Encoder holding the aging copies until `generate` completes it.
    pending: Option<wgpu::CommandEncoder>,
    ingested: u64,
    generated: u64,

    output_cpu: Frame,
    field_cpu: MotionField,
    field_stale: bool,

    // Declared last: dropped after every resource created from it.
    gpu: GpuDevice,
}

impl GpuFrameGenerator {
    pub fn new(gpu: GpuDevice, size: FrameSize, params: MotionParams) -> Result<Self> {
        params.validate()?;
        if size.is_empty() {
            return Err(Error::ResourceCreation {
                resource: "frame textures",
                reason: format!("frame size {size} is empty"),
            });
        }
        let max = gpu.max_texture_dimension();
        if size.width > max || size.height > max {
            return Err(Error::ResourceCreation {
                resource: "frame textures",
                reason: format!("{size} exceeds the device limit of {max} px"),
            });
        }

        let motion = MotionKernel::new(&gpu)?;
        let synth = SynthKernel::new(&gpu)?;

        let capture = GpuFrame::new(&gpu, size, "capture", false);
        let previous = GpuFrame::new(&gpu, size, "previous", false);
        let current = GpuFrame::new(&gpu, size, "current", false);
        let output = GpuFrame::new(&gpu, size, "output", true);

        let (gw, gh) = params.grid_size(size);
        let field_bytes = (gw * gh * std::mem::size_of::<[f32; 2]>()) as u64;
        let field = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("motion field"),
            size: field_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let field_readback = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("motion field readback"),
            size: field_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let motion_uniforms = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("motion params"),
            contents: bytemuck::bytes_of(&MotionUniforms::new(size, &params)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let synth_uniforms = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("synth params"),
            contents: bytemuck::bytes_of(&SynthUniforms::new(size, &params)),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let motion_bg = motion.bind(&gpu, &previous.view, &current.view, &field, &motion_uniforms);
        let synth_bg = synth.bind(&gpu, &previous.view, &field, &output.view, &synth_uniforms);

        let output_readback = FrameReadback::new(&gpu, size);

        debug!(%size, grid_w = gw, grid_h = gh, "GPU frame resources allocated");

        Ok(GpuFrameGenerator {
            size,
            params,
            grid: (gw as u32, gh as u32),
            capture,
            previous,
            current,
            output,
            field,
            field_readback,
            output_readback,
            motion,
            motion_bg,
            synth,
            synth_bg,
            pending: None,
            ingested: 0,
            generated: 0,
            output_cpu: Frame::new(size.width as usize, size.height as usize),
            field_cpu: MotionField::new(size, &params),
            field_stale: false,
            gpu,
        })
    }

    pub fn device(&self) -> &GpuDevice {
        &self.gpu
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Number of frames synthesized so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }
}

impl FrameGenerator for GpuFrameGenerator {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn size(&self) -> FrameSize {
        self.size
    }

    fn advance(&mut self, capture: &[u8]) -> Result<()> {
        // A queued texture write runs before the next submit. Flush any
        // earlier aging copies first so they read the capture they were
        // recorded for.
        if let Some(earlier) = self.pending.take() {
            self.gpu.queue.submit(std::iter::once(earlier.finish()));
        }
        self.capture.write(&self.gpu, capture)?;

        let mut encoder = self.encoder("interframe cycle");
        self.previous.encode_copy_from(&mut encoder, &self.current);
        self.current.encode_copy_from(&mut encoder, &self.capture);
        self.pending = Some(encoder);
        self.ingested += 1;
        Ok(())
    }

    fn generate(&mut self) -> Result<()> {
        if self.ingested == 0 {
            return Err(Error::Capture("no frame has been ingested yet".into()));
        }
        let mut encoder = match self.pending.take() {
            Some(encoder) => encoder,
            None => self.encoder("interframe regenerate"),
        };

        self.motion
            .encode(&self.gpu, &mut encoder, &self.motion_bg, self.grid.0, self.grid.1);
        self.synth
            .encode(&self.gpu, &mut encoder, &self.synth_bg, self.size);
        self.output_readback.encode_copy(&mut encoder, &self.output);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.output_readback.read_into(&self.gpu, &mut self.output_cpu)?;

        self.field_stale = true;
        self.generated += 1;
        trace!(n = self.generated, "gpu frame generated");
        Ok(())
    }

    fn output(&mut self) -> Result<&Frame> {
        Ok(&self.output_cpu)
    }

    fn motion_field(&mut self) -> Result<&MotionField> {
        if self.field_stale {
            let mut encoder = self.encoder("motion field readback");
            encoder.copy_buffer_to_buffer(&self.field, 0, &self.field_readback, 0, self.field.size());
            self.gpu.queue.submit(std::iter::once(encoder.finish()));

            let cells = self.field_cpu.as_mut_slice();
            map_and_read(&self.gpu, &self.field_readback, |mapped| {
                cells.copy_from_slice(bytemuck::cast_slice(mapped));
            })?;
            self.field_stale = false;
        }
        Ok(&self.field_cpu)
    }
}
