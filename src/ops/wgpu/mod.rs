//! GPU-accelerated update rules using WGPU.
//!
//! This module runs the update rules as WGSL compute kernels. It handles GPU
//! context initialization, shader compilation (cached once via `lazy_static`)
//! and the dispatch of every pass of a rule:
//!
//! - `gradient_descent`: one pass
//! - `adagrad`, `momentum`, `adam`: accumulate, then apply
//! - `adadelta`: blend `accum_grad`, then update `accum_update` and weights
//! - `rms_prop`: mean square, velocity, apply
//! - `max_weight_col_norm`: column norms, clamp, rescale
//!
//! Each rule is one shader module with one entry point per pass. Passes are
//! recorded as separate compute passes in one command encoder, so every write
//! of a pass is visible to the next one. Buffers are `f32` only; data is copied
//! to the GPU, updated, and read back into the caller's slices.

use briny::prelude::*;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use wgpu::util::DeviceExt;

mod adadelta;
pub use self::adadelta::wgpu_apply_adadelta;

mod adagrad;
pub use self::adagrad::wgpu_apply_adagrad;

mod adam;
pub use self::adam::wgpu_apply_adam;

mod gradient_descent;
pub use self::gradient_descent::wgpu_apply_gradient_descent;

mod max_weight_col_norm;
pub use self::max_weight_col_norm::wgpu_apply_max_weight_col_norm;

mod momentum;
pub use self::momentum::wgpu_apply_momentum;

mod rms_prop;
pub use self::rms_prop::wgpu_apply_rms_prop;

const GRADIENT_DESCENT: &str = include_str!("shaders/gradient_descent.wgsl");
const ADAGRAD: &str = include_str!("shaders/adagrad.wgsl");
const ADADELTA: &str = include_str!("shaders/adadelta.wgsl");
const MOMENTUM: &str = include_str!("shaders/momentum.wgsl");
const ADAM: &str = include_str!("shaders/adam.wgsl");
const RMS_PROP: &str = include_str!("shaders/rms_prop.wgsl");
const MAX_WEIGHT_COL_NORM: &str = include_str!("shaders/max_weight_col_norm.wgsl");

/// Invocations per workgroup, matching `@workgroup_size` in every shader.
const WORKGROUP_SIZE: usize = 64;

/// Largest workgroup count allowed in one dispatch dimension by default limits.
const MAX_GROUPS_PER_DIM: usize = 65_535;

/// Errors raised while preparing or running a GPU kernel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),
    #[error("failed to open GPU device: {0}")]
    Device(String),
    #[error("shader `{0}` failed validation")]
    Shader(&'static str),
    #[error("GPU poll failed: {0}")]
    Poll(String),
    #[error("failed to map `{0}` results back to the host")]
    Map(&'static str),
    #[error("`{label}` needs a {bytes}-byte buffer, the device allows {limit}")]
    TooLarge {
        label: &'static str,
        bytes: u64,
        limit: u64,
    },
    #[error("`{0}` was rejected by the device: {1}")]
    Validation(&'static str, String),
}

impl From<wgpu::PollError> for GpuError {
    fn from(e: wgpu::PollError) -> Self {
        Self::Poll(e.to_string())
    }
}

/// Holds the WGPU device and queue used for executing compute pipelines.
///
/// Initialized once globally and reused for all kernels via `lazy_static`.
pub struct GpuContext {
    /// The actual GPU device.
    pub device: wgpu::Device,
    /// A queue for information related to the device.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Initializes a new GPU context, selecting the default adapter and creating a device + queue.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::Adapter`] or [`GpuError::Device`] if acquisition fails.
    pub fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .map_err(|e| GpuError::Adapter(e.to_string()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("briny_optim"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|e| GpuError::Device(e.to_string()))?;

        log::info!("GPU context ready on {}", adapter.get_info().name);
        Ok(Self { device, queue })
    }
}

/// Wrapper for WGSL source checked before compilation.
struct WgslSource<'a>(&'a str);

impl Validate for WgslSource<'_> {
    fn validate(&self) -> Result<(), ValidationError> {
        let src = self.0;

        if src.is_empty() || src.len() > 65536 {
            return Err(ValidationError);
        }

        if !src.contains("@compute") || !src.contains("fn main") {
            return Err(ValidationError);
        }

        if src.contains("import") || src.contains("#include") {
            return Err(ValidationError);
        }

        Ok(())
    }
}

/// Access mode of one storage binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadWrite,
    Read,
}

/// A compiled rule: its bind group layout and one pipeline per pass, in order.
struct Kernel {
    label: &'static str,
    layout: wgpu::BindGroupLayout,
    passes: Vec<wgpu::ComputePipeline>,
}

impl Kernel {
    /// Compiles `source` with `outputs` read-write buffers, then `inputs`
    /// read-only buffers, then a read-only parameter buffer.
    fn new(
        label: &'static str,
        source: &'static str,
        outputs: usize,
        inputs: usize,
        entry_points: &[&'static str],
    ) -> Result<Self, GpuError> {
        WgslSource(source)
            .validate()
            .map_err(|_| GpuError::Shader(label))?;
        let device = &context()?.device;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let accesses = core::iter::repeat_n(Access::ReadWrite, outputs)
            .chain(core::iter::repeat_n(Access::Read, inputs + 1));
        let entries: Vec<wgpu::BindGroupLayoutEntry> = accesses
            .enumerate()
            .map(|(binding, access)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage {
                        read_only: access == Access::Read,
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let passes = entry_points
            .iter()
            .map(|entry| {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(*entry),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some(*entry),
                    cache: None,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                })
            })
            .collect();

        Ok(Self {
            label,
            layout,
            passes,
        })
    }
}

lazy_static::lazy_static! {
    static ref GPU_CONTEXT: Result<GpuContext, GpuError> = GpuContext::new();

    static ref GRADIENT_DESCENT_KERNEL: Result<Kernel, GpuError> =
        Kernel::new("gradient_descent", GRADIENT_DESCENT, 1, 1, &["main"]);
    static ref ADAGRAD_KERNEL: Result<Kernel, GpuError> =
        Kernel::new("adagrad", ADAGRAD, 2, 1, &["accumulate", "main"]);
    static ref ADADELTA_KERNEL: Result<Kernel, GpuError> =
        Kernel::new("adadelta", ADADELTA, 3, 1, &["blend", "main"]);
    static ref MOMENTUM_KERNEL: Result<Kernel, GpuError> =
        Kernel::new("momentum", MOMENTUM, 2, 1, &["accumulate", "main"]);
    static ref ADAM_KERNEL: Result<Kernel, GpuError> =
        Kernel::new("adam", ADAM, 3, 1, &["moments", "main"]);
    static ref RMS_PROP_KERNEL: Result<Kernel, GpuError> =
        Kernel::new("rms_prop", RMS_PROP, 3, 1, &["mean_square", "velocity", "main"]);
    static ref MAX_WEIGHT_COL_NORM_KERNEL: Result<Kernel, GpuError> =
        Kernel::new(
            "max_weight_col_norm",
            MAX_WEIGHT_COL_NORM,
            2,
            0,
            &["norms", "clamp_scale", "main"],
        );
}

/// The shared GPU context, initializing it on first use.
///
/// # Errors
///
/// Returns the initialization error if no adapter or device could be acquired.
pub fn context() -> Result<&'static GpuContext, GpuError> {
    GPU_CONTEXT.as_ref().map_err(Clone::clone)
}

/// `true` if a GPU context can be created on this machine.
pub fn is_available() -> bool {
    context().is_ok()
}

fn kernel(k: &'static Result<Kernel, GpuError>) -> Result<&'static Kernel, GpuError> {
    k.as_ref().map_err(Clone::clone)
}

/// Workgroup grid covering `n` invocations, folded into a second dimension
/// once the first one is full.
fn grid(n: usize) -> (u32, u32) {
    let groups = n.div_ceil(WORKGROUP_SIZE).max(1);
    let x = groups.min(MAX_GROUPS_PER_DIM);
    let y = groups.div_ceil(x);
    (x as u32, y as u32)
}

fn as_bytes(data: &[f32]) -> &[u8] {
    let len = core::mem::size_of_val(data);
    unsafe { core::slice::from_raw_parts(data.as_ptr() as *const u8, len) }
}

fn bytes_to_f32_slice(data: &[u8]) -> Result<&[f32], &'static str> {
    use core::mem::{align_of, size_of};

    if data.as_ptr() as usize % align_of::<f32>() != 0 {
        return Err("unaligned buffer");
    }

    if data.len() % size_of::<f32>() != 0 {
        return Err("buffer length is not a multiple of f32");
    }

    let len = data.len() / size_of::<f32>();
    unsafe { Ok(core::slice::from_raw_parts(data.as_ptr() as *const f32, len)) }
}

/// Rejects a binding of `len` floats that the device could not hold.
fn check_fits(limits: &wgpu::Limits, label: &'static str, len: usize) -> Result<(), GpuError> {
    let bytes = (len * core::mem::size_of::<f32>()) as u64;
    let limit = limits
        .max_buffer_size
        .min(u64::from(limits.max_storage_buffer_binding_size));
    if bytes > limit {
        return Err(GpuError::TooLarge {
            label,
            bytes,
            limit,
        });
    }
    Ok(())
}

/// Runs every pass of `kernel` over the given buffers and copies the read-write
/// buffers back into `outputs`.
///
/// `extents[k]` is the number of invocations pass `k` needs.
fn launch(
    kernel: &Kernel,
    outputs: &mut [&mut [f32]],
    inputs: &[&[f32]],
    params: &[f32],
    extents: &[usize],
) -> Result<(), GpuError> {
    debug_assert_eq!(extents.len(), kernel.passes.len());
    if outputs.iter().any(|o| o.is_empty()) {
        return Ok(());
    }

    let ctx = context()?;
    let device = &ctx.device;
    let label = kernel.label;

    let limits = device.limits();
    for len in outputs
        .iter()
        .map(|o| o.len())
        .chain(inputs.iter().map(|i| i.len()))
        .chain(core::iter::once(params.len()))
    {
        check_fits(&limits, label, len)?;
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let upload = |data: &[f32], usage: wgpu::BufferUsages| {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: as_bytes(data),
            usage,
        })
    };

    let output_bufs: Vec<wgpu::Buffer> = outputs
        .iter()
        .map(|o| upload(&o[..], wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC))
        .collect();
    let input_bufs: Vec<wgpu::Buffer> = inputs
        .iter()
        .map(|i| upload(&i[..], wgpu::BufferUsages::STORAGE))
        .collect();
    let params_buf = upload(params, wgpu::BufferUsages::STORAGE);

    let entries: Vec<wgpu::BindGroupEntry> = output_bufs
        .iter()
        .chain(&input_bufs)
        .chain(core::iter::once(&params_buf))
        .enumerate()
        .map(|(binding, buf)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: buf.as_entire_binding(),
        })
        .collect();

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &kernel.layout,
        entries: &entries,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some(label),
    });

    for (pipeline, &n) in kernel.passes.iter().zip(extents) {
        let (x, y) = grid(n);
        log::trace!("{label}: dispatching {x}x{y} workgroups for {n} invocations");
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        cpass.set_pipeline(pipeline);
        cpass.set_bind_group(0, &bind_group, &[]);
        cpass.dispatch_workgroups(x, y, 1);
    }

    let staging: Vec<wgpu::Buffer> = output_bufs
        .iter()
        .map(|buf| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("staging"),
                size: buf.size(),
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
        .collect();

    for (src, dst) in output_bufs.iter().zip(&staging) {
        encoder.copy_buffer_to_buffer(src, 0, dst, 0, dst.size());
    }

    let command = encoder.finish();
    if let Some(e) = pollster::block_on(device.pop_error_scope()) {
        return Err(GpuError::Validation(label, e.to_string()));
    }
    ctx.queue.submit(Some(command));

    let mapped = Arc::new(AtomicUsize::new(0));
    for buf in &staging {
        let mapped = Arc::clone(&mapped);
        buf.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            if result.is_ok() {
                mapped.fetch_add(1, Ordering::Release);
            }
        });
    }

    device.poll(wgpu::PollType::Wait)?;

    if mapped.load(Ordering::Acquire) != staging.len() {
        return Err(GpuError::Map(label));
    }

    let views: Vec<wgpu::BufferView> = staging
        .iter()
        .map(|buf| buf.slice(..).get_mapped_range())
        .collect();
    let updated = views
        .iter()
        .zip(outputs.iter())
        .map(|(view, out)| match bytes_to_f32_slice(view) {
            Ok(data) if data.len() == out.len() => Ok(data),
            _ => Err(GpuError::Map(label)),
        })
        .collect::<Result<Vec<&[f32]>, GpuError>>()?;

    for (out, data) in outputs.iter_mut().zip(updated) {
        out.copy_from_slice(data);
    }
    drop(views);
    for buf in &staging {
        buf.unmap();
    }

    Ok(())
}
