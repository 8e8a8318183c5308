use wgpu::util::DeviceExt;

use crate::device::GpuContext;
use crate::error::{Error, Result};
use crate::reflect::{BindingKind, ShaderReflection};

use super::dispatch::WorkgroupGrid;
use super::readback::{check_copy_size, StagingBuffer};

/// One-shot compute pass over a storage buffer.
///
/// Binding convention (checked by reflection at construction):
/// - `@group(0) @binding(0)`: input, `var<storage, read>`
/// - `@group(0) @binding(1)`: output, `var<storage, read_write>`, same size as input
///
/// Both arrays hold 32-bit elements. The workgroup size is read from the entry
/// point's `@workgroup_size`.
pub struct ComputeJob {
    label: String,
    pipeline: wgpu::ComputePipeline,
    workgroup_size: [u32; 3],
}

impl ComputeJob {
    pub fn new(ctx: GpuContext<'_>, label: &str, source: &str, entry_point: &str) -> Result<Self> {
        let reflection = ShaderReflection::parse(label, source)?;
        let workgroup_size = reflection.workgroup_size(entry_point)?;

        let bindings = reflection.bindings(0);
        let kinds: Vec<_> = bindings.iter().map(|b| (b.binding, b.kind)).collect();
        let expected = [
            (0, BindingKind::StorageBuffer { read_only: true }),
            (1, BindingKind::StorageBuffer { read_only: false }),
        ];
        if kinds != expected {
            return Err(Error::mismatch(format!(
                "compute shader `{label}` declares @group(0) {kinds:?}, expected {expected:?}"
            )));
        }

        let module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.to_owned().into()),
        });
        let pipeline = ctx.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: None,
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        log::debug!("compute job `{label}` ready, workgroup size {workgroup_size:?}");

        Ok(Self {
            label: label.to_owned(),
            pipeline,
            workgroup_size,
        })
    }

    pub fn workgroup_size(&self) -> [u32; 3] {
        self.workgroup_size
    }

    /// Grid covering `extent` with this job's workgroup size.
    pub fn grid_for(&self, extent: [u32; 3]) -> WorkgroupGrid {
        WorkgroupGrid::covering(extent, self.workgroup_size)
    }

    /// Runs over `input` with the covering grid for `extent`; returns the output bytes.
    pub fn run(&self, ctx: GpuContext<'_>, input: &[u8], extent: [u32; 3]) -> Result<Vec<u8>> {
        self.run_with_grid(ctx, input, extent, self.grid_for(extent))
    }

    /// Like [`ComputeJob::run`] with an explicit grid, which must cover `extent`.
    ///
    /// `extent` must span every element of `input`.
    pub fn run_with_grid(
        &self,
        ctx: GpuContext<'_>,
        input: &[u8],
        extent: [u32; 3],
        grid: WorkgroupGrid,
    ) -> Result<Vec<u8>> {
        let size = input.len() as u64;
        check_copy_size(&self.label, size)?;
        check_extent(&self.label, size, extent)?;
        grid.verify_covers(extent, self.workgroup_size)?;

        let input_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("primer compute input"),
            contents: input,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("primer compute output"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("primer compute bindings"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&self.label),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&self.label),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(grid.x, grid.y, grid.z);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let staging = StagingBuffer::new(ctx.device, "primer compute staging", size)?;
        let mut copy = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("primer compute readback"),
        });
        staging.copy_from(&mut copy, &output_buffer, 0)?;
        ctx.queue.submit(std::iter::once(copy.finish()));

        log::debug!("compute job `{}` dispatched {grid:?}", self.label);
        staging.read(ctx.device)
    }

    /// Runs over a one-dimensional `f32` array.
    pub fn run_f32(&self, ctx: GpuContext<'_>, input: &[f32]) -> Result<Vec<f32>> {
        let len = u32::try_from(input.len())
            .map_err(|_| Error::mismatch(format!("{} elements exceed a dispatch extent", input.len())))?;
        let bytes = self.run(ctx, bytemuck::cast_slice(input), [len, 1, 1])?;
        Ok(bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect())
    }
}

/// Bytes per element of the input and output arrays.
const ELEMENT_SIZE: u64 = 4;

fn check_extent(label: &str, size: u64, extent: [u32; 3]) -> Result<()> {
    let elements = size / ELEMENT_SIZE;
    let spanned = extent.iter().map(|&e| u64::from(e)).product::<u64>();
    if spanned < elements {
        return Err(Error::mismatch(format!(
            "`{label}`: extent {extent:?} spans {spanned} elements but the input holds {elements}"
        )));
    }
    Ok(())
}
