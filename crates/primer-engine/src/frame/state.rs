use std::ops::Range;

use bytemuck::Pod;
use glam::Mat4;

use crate::error::{Error, Result};
use crate::layout::StepMode;
use crate::resources::{
    BindGroupId, BufferClass, BufferId, PipelineId, PipelineTarget, ResourceManifest, TransformBlock, TransformSlot,
};
use crate::time::FrameTime;

use super::plan::{ColorTarget, FramePlan, FrameStep, LoadPolicy, PassCommand, PassPlan};

/// Transient per-tick recording state.
///
/// Created at tick start, consumed by [`FrameState::finish`]. Every write and
/// command is validated against the scene's [`ResourceManifest`] as it is
/// recorded, so an invalid frame fails before anything reaches the GPU.
///
/// Load policy: the first pass touching a color target in the tick clears it,
/// later passes load it. The surface depth attachment follows the same rule.
pub struct FrameState<'m> {
    manifest: &'m ResourceManifest,
    time: FrameTime,
    surface_size: (u32, u32),
    clear_color: wgpu::Color,
    steps: Vec<FrameStep>,
    touched: Vec<ColorTarget>,
    depth_touched: bool,
    /// Steps recorded since the last submission boundary.
    pending: bool,
}

impl<'m> FrameState<'m> {
    pub fn new(manifest: &'m ResourceManifest, time: FrameTime, surface_size: (u32, u32)) -> Self {
        Self {
            manifest,
            time,
            surface_size,
            clear_color: wgpu::Color::BLACK,
            steps: Vec::new(),
            touched: Vec::new(),
            depth_touched: false,
            pending: false,
        }
    }

    pub fn time(&self) -> FrameTime {
        self.time
    }

    pub fn manifest(&self) -> &'m ResourceManifest {
        self.manifest
    }

    /// Drawable size in physical pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Width over height of the surface; `1.0` while minimized.
    pub fn aspect(&self) -> f32 {
        let (w, h) = self.surface_size;
        if w == 0 || h == 0 { 1.0 } else { w as f32 / h as f32 }
    }

    /// Clear color for passes opened after this call.
    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Records a queue write of `data` at `offset` into a uniform or storage buffer.
    pub fn write_buffer<T: Pod>(&mut self, buffer: BufferId, offset: u64, data: &[T]) -> Result<()> {
        let info = self.manifest.buffer(buffer)?;
        if !info.class.is_writable() {
            return Err(Error::mismatch(format!(
                "buffer `{}` ({:?}) is immutable after creation",
                info.label, info.class
            )));
        }

        let bytes: &[u8] = bytemuck::cast_slice(data);
        let len = bytes.len() as u64;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(Error::mismatch(format!(
                "write to `{}` at {offset} of {len} bytes is not 4-byte aligned",
                info.label
            )));
        }
        if offset.checked_add(len).is_none_or(|end| end > info.size) {
            return Err(Error::out_of_bounds(format!("write to `{}`", info.label), offset, len, info.size));
        }
        if len == 0 {
            return Ok(());
        }

        self.steps.push(FrameStep::WriteBuffer {
            buffer,
            offset,
            data: bytes.to_vec(),
        });
        self.pending = true;
        Ok(())
    }

    /// Writes one matrix of a [`TransformBlock`] at its fixed offset.
    pub fn write_transform(&mut self, buffer: BufferId, slot: TransformSlot, matrix: Mat4) -> Result<()> {
        self.write_buffer(buffer, slot.offset(), &matrix.to_cols_array())
    }

    /// Writes a whole [`TransformBlock`] at offset 0.
    pub fn write_transforms(&mut self, buffer: BufferId, block: &TransformBlock) -> Result<()> {
        self.write_buffer(buffer, 0, std::slice::from_ref(block))
    }

    /// Opens a render pass. The pass closes when the recorder is dropped or
    /// [`PassRecorder::end`]ed.
    pub fn begin_pass(&mut self, target: ColorTarget) -> Result<PassRecorder<'_, 'm>> {
        if let ColorTarget::Texture(id) = target {
            let info = self.manifest.texture(id)?;
            if info.render_target.is_none() {
                return Err(Error::mismatch(format!(
                    "texture `{}` is sampled-only and cannot be rendered into",
                    info.label
                )));
            }
        }

        let color_load = if self.touched.contains(&target) {
            LoadPolicy::Load
        } else {
            self.touched.push(target);
            LoadPolicy::Clear
        };

        let depth_load = (target == ColorTarget::Surface && self.manifest.attachments.depth).then(|| {
            let load = if self.depth_touched { LoadPolicy::Load } else { LoadPolicy::Clear };
            self.depth_touched = true;
            load
        });

        let index = self.steps.iter().filter(|s| matches!(s, FrameStep::Pass(_))).count();
        let plan = PassPlan {
            label: format!("primer pass {index}"),
            target,
            color_load,
            clear_color: self.clear_color,
            depth_load,
            commands: Vec::new(),
        };

        Ok(PassRecorder {
            state: self,
            target,
            plan: Some(plan),
            pipeline: None,
            vertex_slots: Vec::new(),
            bound_groups: Vec::new(),
            index_buffer: None,
        })
    }

    /// Records `count` objects into a single pass on `target`, then closes the
    /// pass and submits exactly once.
    ///
    /// `record` is called with the object index `0..count`. Queue writes are not
    /// reachable from inside the pass; per-object data has to be written before
    /// (typically into a storage buffer indexed by instance).
    pub fn accumulate<F>(&mut self, target: ColorTarget, count: u32, mut record: F) -> Result<()>
    where
        F: FnMut(&mut PassRecorder<'_, 'm>, u32) -> Result<()>,
    {
        {
            let mut pass = self.begin_pass(target)?;
            for i in 0..count {
                record(&mut pass, i)?;
            }
        }
        log::trace!("accumulated {count} objects into one pass");
        self.submit();
        Ok(())
    }

    /// Marks a submission boundary. No-op when nothing was recorded since the
    /// previous one.
    pub fn submit(&mut self) {
        if self.pending {
            self.steps.push(FrameStep::Submit);
            self.pending = false;
        }
    }

    /// Closes the tick, submitting whatever is still pending.
    pub fn finish(mut self) -> FramePlan {
        self.submit();
        FramePlan::from_steps(std::mem::take(&mut self.steps))
    }
}

/// Records commands into one open pass.
///
/// Holds the frame state mutably, so no queue write or second pass can be
/// recorded while the pass is open. Dropping the recorder closes the pass.
pub struct PassRecorder<'s, 'm> {
    state: &'s mut FrameState<'m>,
    target: ColorTarget,
    /// Taken when the pass closes.
    plan: Option<PassPlan>,
    pipeline: Option<PipelineId>,
    /// Buffer bound to each vertex slot of the current pipeline.
    vertex_slots: Vec<Option<BufferId>>,
    /// `@group` indices bound since the current pipeline was set.
    bound_groups: Vec<u32>,
    index_buffer: Option<BufferId>,
}

impl<'s, 'm> PassRecorder<'s, 'm> {
    pub fn target(&self) -> ColorTarget {
        self.target
    }

    pub fn manifest(&self) -> &'m ResourceManifest {
        self.state.manifest
    }

    pub fn time(&self) -> FrameTime {
        self.state.time
    }

    /// Selects the pipeline; vertex buffers and bind groups must be (re)bound afterwards.
    pub fn set_pipeline(&mut self, id: PipelineId) -> Result<()> {
        let manifest = self.state.manifest;
        let info = manifest.pipeline(id)?;
        let compatible = match (info.target, self.target()) {
            (PipelineTarget::Surface, ColorTarget::Surface) => true,
            (PipelineTarget::Offscreen(format), ColorTarget::Texture(texture)) => {
                manifest.texture(texture)?.render_target == Some(format)
            }
            _ => false,
        };
        if !compatible {
            return Err(Error::mismatch(format!(
                "pipeline `{}` targets {:?} but the pass renders into {:?}",
                info.label,
                info.target,
                self.target()
            )));
        }

        self.pipeline = Some(id);
        self.vertex_slots = vec![None; info.vertex_slots.len()];
        self.bound_groups.clear();
        self.push(PassCommand::SetPipeline(id));
        Ok(())
    }

    /// Binds a group created against the current pipeline's layout.
    pub fn set_bind_group(&mut self, index: u32, group: BindGroupId) -> Result<()> {
        let pipeline = self.require_pipeline()?;
        let info = self.state.manifest.bind_group(group)?;
        if info.pipeline != pipeline || info.group != index {
            return Err(Error::mismatch(format!(
                "bind group `{}` was created for @group({}) of pipeline {}, not @group({index}) of pipeline {}",
                info.label,
                info.group,
                info.pipeline.index(),
                pipeline.index()
            )));
        }
        if !self.bound_groups.contains(&index) {
            self.bound_groups.push(index);
        }
        self.push(PassCommand::SetBindGroup { index, group });
        Ok(())
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()> {
        let manifest = self.state.manifest;
        let pipeline = manifest.pipeline(self.require_pipeline()?)?;
        let Some(&expected) = pipeline.vertex_slots.get(slot as usize) else {
            return Err(Error::mismatch(format!(
                "pipeline `{}` has {} vertex slots, got slot {slot}",
                pipeline.label,
                pipeline.vertex_slots.len()
            )));
        };
        let info = manifest.buffer(buffer)?;
        match info.class {
            BufferClass::Vertex { step_mode, .. } if step_mode == expected => {}
            other => {
                return Err(Error::mismatch(format!(
                    "slot {slot} of `{}` expects a {expected:?}-rate stream, `{}` is {other:?}",
                    pipeline.label, info.label
                )));
            }
        }
        self.vertex_slots[slot as usize] = Some(buffer);
        self.push(PassCommand::SetVertexBuffer { slot, buffer });
        Ok(())
    }

    pub fn set_index_buffer(&mut self, buffer: BufferId) -> Result<()> {
        self.state.manifest.index_count(buffer)?;
        self.index_buffer = Some(buffer);
        self.push(PassCommand::SetIndexBuffer(buffer));
        Ok(())
    }

    /// Non-indexed draw. Both ranges are checked against the bound streams.
    pub fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) -> Result<()> {
        self.check_bind_groups()?;
        self.check_streams(Some(&vertices), &instances)?;
        self.push(PassCommand::Draw { vertices, instances });
        Ok(())
    }

    /// Indexed draw over the bound index buffer.
    pub fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) -> Result<()> {
        let Some(buffer) = self.index_buffer else {
            return Err(Error::mismatch("draw_indexed without an index buffer"));
        };
        let count = self.state.manifest.index_count(buffer)?;
        check_range("indices", &indices, count)?;
        self.check_bind_groups()?;
        self.check_streams(None, &instances)?;
        self.push(PassCommand::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
        Ok(())
    }

    /// Closes the pass.
    pub fn end(self) {}

    fn push(&mut self, command: PassCommand) {
        if let Some(plan) = self.plan.as_mut() {
            plan.commands.push(command);
        }
    }

    fn require_pipeline(&self) -> Result<PipelineId> {
        self.pipeline
            .ok_or_else(|| Error::mismatch("no pipeline set in this pass"))
    }

    fn check_bind_groups(&self) -> Result<()> {
        let pipeline = self.state.manifest.pipeline(self.require_pipeline()?)?;
        match pipeline.bind_groups.iter().find(|&&g| !self.bound_groups.contains(&g)) {
            Some(group) => Err(Error::mismatch(format!(
                "@group({group}) of `{}` is unbound",
                pipeline.label
            ))),
            None => Ok(()),
        }
    }

    fn check_streams(&self, vertices: Option<&Range<u32>>, instances: &Range<u32>) -> Result<()> {
        let manifest = self.state.manifest;
        let pipeline = manifest.pipeline(self.require_pipeline()?)?;
        for (slot, bound) in self.vertex_slots.iter().enumerate() {
            let Some(buffer) = *bound else {
                return Err(Error::mismatch(format!(
                    "vertex slot {slot} of `{}` is unbound",
                    pipeline.label
                )));
            };
            let elements = manifest.element_count(buffer)?;
            match pipeline.vertex_slots[slot] {
                StepMode::Vertex => {
                    if let Some(vertices) = vertices {
                        check_range("vertices", vertices, elements)?;
                    }
                }
                StepMode::Instance => check_range("instances", instances, elements)?,
            }
        }
        Ok(())
    }
}

impl Drop for PassRecorder<'_, '_> {
    fn drop(&mut self) {
        if let Some(plan) = self.plan.take() {
            self.state.steps.push(FrameStep::Pass(plan));
            self.state.pending = true;
        }
    }
}

fn check_range(what: &str, range: &Range<u32>, count: u32) -> Result<()> {
    if range.start > range.end || range.end > count {
        return Err(Error::out_of_bounds(
            what,
            range.start as u64,
            range.end.saturating_sub(range.start) as u64,
            count as u64,
        ));
    }
    Ok(())
}
