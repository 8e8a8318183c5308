//! Nine copies of one quad, offset by a per-instance attribute stream.

use primer_engine::frame::{ColorTarget, FrameState, Scene};
use primer_engine::layout::{VertexAttribute, VertexLayout};
use primer_engine::resources::{BufferId, PipelineDesc, PipelineId, SceneDesc, StageRef};
use primer_engine::Result;
use wgpu::VertexFormat::Float32x2;

use crate::geometry::QUAD_INDICES;

const CORNERS: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];

/// Offsets of a 3x3 grid, two floats per instance.
pub const OFFSETS: [f32; 18] = [
    -0.6, 0.6, 0.0, 0.6, 0.6, 0.6, //
    -0.6, 0.0, 0.0, 0.0, 0.6, 0.0, //
    -0.6, -0.6, 0.0, -0.6, 0.6, -0.6,
];

pub struct Instancing;

pub struct Handles {
    pipeline: PipelineId,
    corners: BufferId,
    offsets: BufferId,
    indices: BufferId,
}

impl Scene for Instancing {
    type Handles = Handles;

    fn describe(&self) -> Result<(SceneDesc, Handles)> {
        let mut desc = SceneDesc::new("instancing");
        let shader = desc.shader("instanced", include_str!("../../shaders/instanced.wgsl"));
        let corner_layout = VertexLayout::per_vertex(8, &[VertexAttribute::new(0, 0, Float32x2)])?;
        let offset_layout = VertexLayout::per_instance(8, &[VertexAttribute::new(1, 0, Float32x2)])?;
        let pipeline = desc.pipeline(
            PipelineDesc::new("instanced", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
                .with_vertex_buffer(corner_layout.clone())
                .with_vertex_buffer(offset_layout.clone()),
        );
        let corners = desc.vertex_buffer("corners", corner_layout, &CORNERS);
        let offsets = desc.vertex_buffer("offsets", offset_layout, &OFFSETS);
        let indices = desc.index_buffer_u16("quad indices", &QUAD_INDICES);
        Ok((
            desc,
            Handles {
                pipeline,
                corners,
                offsets,
                indices,
            },
        ))
    }

    fn record(&mut self, h: &Handles, frame: &mut FrameState<'_>) -> Result<()> {
        let manifest = frame.manifest();
        let instances = manifest.element_count(h.offsets)?;
        let indices = manifest.index_count(h.indices)?;

        let mut pass = frame.begin_pass(ColorTarget::Surface)?;
        pass.set_pipeline(h.pipeline)?;
        pass.set_vertex_buffer(0, h.corners)?;
        pass.set_vertex_buffer(1, h.offsets)?;
        pass.set_index_buffer(h.indices)?;
        pass.draw_indexed(0..indices, 0, 0..instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::testing::record_once;
    use primer_engine::frame::PassCommand;

    #[test]
    fn eighteen_floats_are_nine_instances() {
        let (desc, h) = Instancing.describe().unwrap();
        assert_eq!(desc.manifest().unwrap().element_count(h.offsets).unwrap(), 9);
    }

    #[test]
    fn all_instances_go_out_in_one_draw() {
        let plan = record_once(&mut Instancing, 0.0);
        assert_eq!(plan.stats().draws, 1);
        let pass = plan.passes().next().unwrap();
        assert!(matches!(
            pass.draws().next(),
            Some(PassCommand::DrawIndexed { instances, .. }) if *instances == (0..9)
        ));
    }
}
