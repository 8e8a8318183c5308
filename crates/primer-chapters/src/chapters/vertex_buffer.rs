//! A single colored triangle fed from one vertex buffer.

use primer_engine::frame::{ColorTarget, FrameState, Scene};
use primer_engine::resources::{BufferId, PipelineDesc, PipelineId, SceneDesc, StageRef};
use primer_engine::Result;

use crate::geometry::{ColoredVertex, TRIANGLE};

pub struct VertexBuffer;

pub struct Handles {
    pipeline: PipelineId,
    vertices: BufferId,
}

impl Scene for VertexBuffer {
    type Handles = Handles;

    fn describe(&self) -> Result<(SceneDesc, Handles)> {
        let mut desc = SceneDesc::new("vertex-buffer");
        let shader = desc.shader("colored", include_str!("../../shaders/colored.wgsl"));
        let layout = ColoredVertex::layout()?;
        let pipeline = desc.pipeline(
            PipelineDesc::new("colored", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
                .with_vertex_buffer(layout.clone()),
        );
        let vertices = desc.vertex_buffer("triangle", layout, &TRIANGLE);
        Ok((desc, Handles { pipeline, vertices }))
    }

    fn record(&mut self, h: &Handles, frame: &mut FrameState<'_>) -> Result<()> {
        let count = frame.manifest().element_count(h.vertices)?;
        let mut pass = frame.begin_pass(ColorTarget::Surface)?;
        pass.set_pipeline(h.pipeline)?;
        pass.set_vertex_buffer(0, h.vertices)?;
        pass.draw(0..count, 0..1)
    }
}
