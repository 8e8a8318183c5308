use winit::dpi::PhysicalSize;

use crate::device::{Gpu, GpuContext, SurfaceErrorAction};
use crate::error::{Error, Result};
use crate::resources::{ResourceInitializer, ResourceManifest, SceneDesc, SceneResources};
use crate::time::{FrameClock, FrameTime};

use super::encode::execute_plan;
use super::plan::{FramePlan, FrameStats};
use super::state::FrameState;

/// An animated scene: describes its resources once, then records every tick.
pub trait Scene {
    /// Typed ids the scene keeps from its description (buffers, pipelines, ...).
    type Handles;

    /// Declares every long-lived resource. Called once, before the first tick.
    fn describe(&self) -> Result<(SceneDesc, Self::Handles)>;

    /// Records one tick's writes, passes and submissions.
    fn record(&mut self, handles: &Self::Handles, frame: &mut FrameState<'_>) -> Result<()>;
}

/// What the driver borrows every tick: initialized resources and the scene's ids.
pub struct FrameContext<H> {
    pub resources: SceneResources,
    pub handles: H,
}

/// Result of one tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TickOutcome {
    Presented(FrameStats),
    /// The backbuffer could not be acquired; nothing was recorded.
    Skipped,
}

/// Records one tick of `scene` against `manifest` without touching the GPU.
///
/// Draws are only checked for unbound `@group`s when `manifest` came from
/// [`SceneDesc::checked_manifest`](crate::resources::SceneDesc::checked_manifest).
pub fn record_frame<S: Scene>(
    scene: &mut S,
    handles: &S::Handles,
    manifest: &ResourceManifest,
    time: FrameTime,
    surface_size: (u32, u32),
) -> Result<FramePlan> {
    let mut frame = FrameState::new(manifest, time, surface_size);
    scene.record(handles, &mut frame)?;
    Ok(frame.finish())
}

/// Owns a scene and its resources and drives it one tick at a time.
///
/// Per tick: acquire the backbuffer, sample the clock, record a plan, encode and
/// submit it, present. Tick `n` is fully submitted before tick `n + 1` is recorded.
pub struct FrameDriver<S: Scene> {
    scene: S,
    context: FrameContext<S::Handles>,
    clock: FrameClock,
    last_stats: FrameStats,
}

impl<S: Scene> FrameDriver<S> {
    /// Describes the scene and initializes all of its resources.
    pub fn new(ctx: GpuContext<'_>, scene: S) -> Result<Self> {
        let (desc, handles) = scene.describe()?;
        let resources = ResourceInitializer::new(ctx).initialize(&desc)?;
        Ok(Self {
            scene,
            context: FrameContext { resources, handles },
            clock: FrameClock::new(),
            last_stats: FrameStats::default(),
        })
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn context(&self) -> &FrameContext<S::Handles> {
        &self.context
    }

    /// Counters of the last presented tick.
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Records a plan for `time` without executing it.
    pub fn plan(&mut self, time: FrameTime, surface_size: (u32, u32)) -> Result<FramePlan> {
        record_frame(
            &mut self.scene,
            &self.context.handles,
            self.context.resources.manifest(),
            time,
            surface_size,
        )
    }

    /// Runs one tick against the window surface.
    ///
    /// Surface loss and timeouts skip the tick; only out-of-memory is returned as
    /// an error from acquisition. A recording or encoding error abandons the tick
    /// without presenting.
    pub fn tick(&mut self, gpu: &mut Gpu<'_>) -> Result<TickOutcome> {
        let frame = match gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match gpu.handle_surface_error(&err) {
                    SurfaceErrorAction::Fatal => Err(Error::Surface(err)),
                    action => {
                        log::warn!("frame skipped: {err} ({action:?})");
                        Ok(TickOutcome::Skipped)
                    }
                };
            }
        };

        let time = self.clock.tick();
        let ctx = gpu.context();
        let plan = self.plan(time, ctx.size)?;
        execute_plan(ctx, &self.context.resources, Some(&frame.view), &plan)?;
        frame.present();

        let stats = plan.stats();
        log::trace!("frame {}: {stats:?}", time.frame_index);
        self.last_stats = stats;
        Ok(TickOutcome::Presented(stats))
    }

    /// Records and executes one tick at a fixed time without a surface.
    ///
    /// Only offscreen targets are available; a surface pass is a configuration
    /// mismatch.
    pub fn render_offscreen(&mut self, ctx: GpuContext<'_>, time: FrameTime) -> Result<FrameStats> {
        let plan = self.plan(time, ctx.size)?;
        execute_plan(ctx, &self.context.resources, None, &plan)?;
        Ok(plan.stats())
    }

    /// Reconfigures the surface and rebuilds size-dependent attachments.
    pub fn resize(&mut self, gpu: &mut Gpu<'_>, new_size: PhysicalSize<u32>) {
        if gpu.resize(new_size) {
            self.context.resources.resize_attachments(gpu.context());
            self.clock.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColorTarget, FrameStep, PassCommand};
    use crate::layout::{VertexAttribute, VertexLayout};
    use crate::resources::{BufferId, PipelineDesc, PipelineId, StageRef};
    use wgpu::VertexFormat::Float32x4;

    /// Colored quad: 4 vertices (position at 0, color at 16), 6 indices.
    struct Quad {
        ticks: u32,
    }

    struct QuadHandles {
        pipeline: PipelineId,
        vertices: BufferId,
        indices: BufferId,
    }

    impl Scene for Quad {
        type Handles = QuadHandles;

        fn describe(&self) -> Result<(SceneDesc, QuadHandles)> {
            let mut desc = SceneDesc::new("quad");
            let shader = desc.shader("quad", "");
            let layout = VertexLayout::per_vertex(
                32,
                &[VertexAttribute::new(0, 0, Float32x4), VertexAttribute::new(1, 16, Float32x4)],
            )?;
            let pipeline = desc.pipeline(
                PipelineDesc::new("quad", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
                    .with_vertex_buffer(layout.clone()),
            );
            let vertices = desc.vertex_buffer("vertices", layout, &[0.0f32; 32]);
            let indices = desc.index_buffer_u16("indices", &[0, 1, 2, 0, 2, 3]);
            Ok((desc, QuadHandles { pipeline, vertices, indices }))
        }

        fn record(&mut self, h: &QuadHandles, frame: &mut FrameState<'_>) -> Result<()> {
            self.ticks += 1;
            let count = frame.manifest().index_count(h.indices)?;
            let mut pass = frame.begin_pass(ColorTarget::Surface)?;
            pass.set_pipeline(h.pipeline)?;
            pass.set_vertex_buffer(0, h.vertices)?;
            pass.set_index_buffer(h.indices)?;
            pass.draw_indexed(0..count, 0, 0..1)
        }
    }

    #[test]
    fn each_tick_records_a_fresh_plan() {
        let mut scene = Quad { ticks: 0 };
        let (desc, handles) = scene.describe().unwrap();
        let manifest = desc.manifest().unwrap();

        for i in 0..3 {
            let plan = record_frame(&mut scene, &handles, &manifest, FrameTime::at(i as f32, i), (64, 64)).unwrap();
            let stats = plan.stats();
            assert_eq!(stats.indexed_draws, 1);
            assert_eq!(stats.submissions, 1);
            assert!(matches!(plan.steps().last(), Some(FrameStep::Submit)));
            let pass = plan.passes().next().unwrap();
            assert!(pass.commands.contains(&PassCommand::DrawIndexed {
                indices: 0..6,
                base_vertex: 0,
                instances: 0..1
            }));
        }
        assert_eq!(scene.ticks, 3);
    }

    #[test]
    fn a_failed_record_leaves_no_plan() {
        struct Broken;
        impl Scene for Broken {
            type Handles = ();
            fn describe(&self) -> Result<(SceneDesc, ())> {
                Ok((SceneDesc::new("broken"), ()))
            }
            fn record(&mut self, _: &(), frame: &mut FrameState<'_>) -> Result<()> {
                let mut pass = frame.begin_pass(ColorTarget::Surface)?;
                pass.draw(0..3, 0..1)
            }
        }

        let mut scene = Broken;
        let manifest = scene.describe().unwrap().0.manifest().unwrap();
        assert!(record_frame(&mut scene, &(), &manifest, FrameTime::at(0.0, 0), (1, 1)).is_err());
    }
}
