//! Four shared vertices drawn as two triangles through an index buffer.

use primer_engine::frame::{ColorTarget, FrameState, Scene};
use primer_engine::resources::{BufferId, PipelineDesc, PipelineId, SceneDesc, StageRef};
use primer_engine::Result;

use crate::geometry::{ColoredVertex, QUAD, QUAD_INDICES};

pub struct IndexedQuad;

pub struct Handles {
    pipeline: PipelineId,
    vertices: BufferId,
    indices: BufferId,
}

impl Scene for IndexedQuad {
    type Handles = Handles;

    fn describe(&self) -> Result<(SceneDesc, Handles)> {
        let mut desc = SceneDesc::new("indexed-quad");
        let shader = desc.shader("colored", include_str!("../../shaders/colored.wgsl"));
        let layout = ColoredVertex::layout()?;
        let pipeline = desc.pipeline(
            PipelineDesc::new("colored", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
                .with_vertex_buffer(layout.clone()),
        );
        let vertices = desc.vertex_buffer("quad", layout, &QUAD);
        let indices = desc.index_buffer_u16("quad indices", &QUAD_INDICES);
        Ok((
            desc,
            Handles {
                pipeline,
                vertices,
                indices,
            },
        ))
    }

    fn record(&mut self, h: &Handles, frame: &mut FrameState<'_>) -> Result<()> {
        let count = frame.manifest().index_count(h.indices)?;
        let mut pass = frame.begin_pass(ColorTarget::Surface)?;
        pass.set_pipeline(h.pipeline)?;
        pass.set_vertex_buffer(0, h.vertices)?;
        pass.set_index_buffer(h.indices)?;
        pass.draw_indexed(0..count, 0, 0..1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::testing::record_once;
    use primer_engine::frame::PassCommand;

    #[test]
    fn one_tick_is_one_indexed_draw_of_six() {
        let plan = record_once(&mut IndexedQuad, 0.0);
        let stats = plan.stats();
        assert_eq!((stats.indexed_draws, stats.draws, stats.submissions), (1, 1, 1));

        let pass = plan.passes().next().unwrap();
        assert!(matches!(
            pass.draws().next(),
            Some(PassCommand::DrawIndexed { indices, base_vertex: 0, .. }) if *indices == (0..6)
        ));
    }
}
