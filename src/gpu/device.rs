// gpu/device.rs — wgpu device selection.
//
// ADAPTER SELECTION
// ─────────────────
// wgpu's `request_adapter` power-preference heuristics happily return a
// software rasterizer (llvmpipe, WARP) when one is visible. We enumerate
// explicitly and take, in order of preference:
//
//   DiscreteGpu / IntegratedGpu   real hardware
//   VirtualGpu / Other            VM pass-through, translation layers
//   anything else                 last resort, logged
//
// WORKGROUP SIZES
// ───────────────
// naga does not accept `override` expressions inside @workgroup_size(), so
// the dimensions are baked into the WGSL source by string replacement of
// the {{WG_X}} / {{WG_Y}} placeholders when a kernel is compiled.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

/// A 2D compute workgroup configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    /// Total invocations per workgroup (x * y).
    pub fn total(&self) -> u32 {
        self.x * self.y
    }

    /// Workgroups needed to cover a `w`×`h` grid of invocations. The shader
    /// must guard against the overhang.
    pub fn dispatch_size(&self, w: u32, h: u32) -> (u32, u32) {
        (w.div_ceil(self.x), h.div_ceil(self.y))
    }

    /// Substitute the `{{WG_X}}` / `{{WG_Y}}` placeholders in a WGSL
    /// template.
    pub fn specialize(&self, template: &str) -> String {
        template
            .replace("{{WG_X}}", &self.x.to_string())
            .replace("{{WG_Y}}", &self.y.to_string())
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} ({} invocations)", self.x, self.y, self.total())
    }
}

/// Cached adapter information for logging.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// Adapter, device and queue for the session.
///
/// # Field drop order
/// `_instance` is declared last so the `wgpu::Instance` outlives `device`
/// and `queue`. Some translation layers crash when the instance goes away
/// while device-level objects still reference it.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: AdapterInfo,
    /// Workgroup shape for per-pixel kernels.
    pub pixel_workgroup: WorkgroupSize,
    /// Workgroup shape for per-block kernels.
    pub block_workgroup: WorkgroupSize,
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Create a device on the best available adapter.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> Result<Self, GpuError> {
        let flags = if cfg!(debug_assertions) {
            wgpu::InstanceFlags::VALIDATION
                | wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        } else {
            wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags,
            ..Default::default()
        });

        let all_adapters = instance.enumerate_adapters(wgpu::Backends::PRIMARY);
        if all_adapters.is_empty() {
            return Err(GpuError::NoSuitableAdapter);
        }
        for a in &all_adapters {
            let info = a.get_info();
            debug!(name = %info.name, backend = ?info.backend, kind = ?info.device_type, "adapter");
        }

        let adapter = all_adapters
            .into_iter()
            .max_by_key(|a| adapter_rank(a.get_info().device_type))
            .ok_or(GpuError::NoSuitableAdapter)?;

        let raw_info = adapter.get_info();
        if raw_info.device_type == wgpu::DeviceType::Cpu {
            warn!(name = %raw_info.name, "only a software adapter is available");
        }
        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            device_type: raw_info.device_type,
            backend: raw_info.backend,
        };

        // wgpu 22: request_device returns (Device, Queue) directly; the tuple
        // type must be spelled out to help the type inferencer.
        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("interframe"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        info!(adapter = %adapter_info, "GPU device created");

        Ok(GpuDevice {
            device,
            queue,
            adapter_info,
            pixel_workgroup: WorkgroupSize { x: 16, y: 16 },
            block_workgroup: WorkgroupSize { x: 8, y: 8 },
            _instance: instance,
        })
    }

    /// Largest texture edge the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GpuDevice {{ adapter: {}, pixel workgroup: {}, block workgroup: {} }}",
            self.adapter_info, self.pixel_workgroup, self.block_workgroup
        )
    }
}

fn adapter_rank(kind: wgpu::DeviceType) -> u8 {
    match kind {
        wgpu::DeviceType::DiscreteGpu => 4,
        wgpu::DeviceType::IntegratedGpu => 3,
        wgpu::DeviceType::VirtualGpu | wgpu::DeviceType::Other => 2,
        wgpu::DeviceType::Cpu => 1,
    }
}

/// Errors from GPU device initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No adapter was enumerated on any primary backend.
    #[error("no GPU adapter found on the primary backends (Vulkan, Metal, DX12)")]
    NoSuitableAdapter,
    /// The adapter refused the device request.
    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}
