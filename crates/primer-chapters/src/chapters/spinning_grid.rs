//! A grid of colored cubes sharing one uniform block.
//!
//! Each cube rewrites the world matrix, draws in its own pass and submits before
//! the next cube's write, so every draw sees its own matrix.

use primer_engine::frame::animation::{camera, perspective, GridLayout};
use primer_engine::frame::{ColorTarget, FrameState, Scene};
use primer_engine::resources::{
    BindGroupId, BindingRef, BufferId, PipelineDesc, PipelineId, SceneDesc, StageRef, TransformBlock, TransformSlot,
};
use primer_engine::Result;

use crate::geometry::{cube, cube_layout, CUBE_COLOR, CUBE_POSITION};

pub struct SpinningGrid {
    grid: GridLayout,
    camera_distance: f32,
}

impl Default for SpinningGrid {
    fn default() -> Self {
        Self {
            grid: GridLayout::new(3, 3, 3.0),
            camera_distance: 10.0,
        }
    }
}

pub struct Handles {
    pipeline: PipelineId,
    vertices: BufferId,
    indices: BufferId,
    transforms: BufferId,
    group: BindGroupId,
}

impl Scene for SpinningGrid {
    type Handles = Handles;

    fn describe(&self) -> Result<(SceneDesc, Handles)> {
        let mut desc = SceneDesc::new("spinning-grid").with_depth();
        let shader = desc.shader("colored cube", include_str!("../../shaders/colored_cube.wgsl"));
        let layout = cube_layout(&[CUBE_POSITION, CUBE_COLOR])?;
        let pipeline = desc.pipeline(
            PipelineDesc::new("colored cube", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
                .with_vertex_buffer(layout.clone()),
        );

        let (cube_vertices, cube_indices) = cube();
        let vertices = desc.vertex_buffer("cube", layout, &cube_vertices);
        let indices = desc.index_buffer_u16("cube indices", &cube_indices);
        let transforms = desc.uniform_buffer("transforms", TransformBlock::SIZE);
        let group = desc.bind_group("colored cube", pipeline, 0, &[(0, BindingRef::Buffer(transforms))]);

        Ok((
            desc,
            Handles {
                pipeline,
                vertices,
                indices,
                transforms,
                group,
            },
        ))
    }

    fn record(&mut self, h: &Handles, frame: &mut FrameState<'_>) -> Result<()> {
        let elapsed = frame.time().elapsed;
        let index_count = frame.manifest().index_count(h.indices)?;

        frame.write_transform(h.transforms, TransformSlot::Projection, perspective(frame.aspect()))?;
        frame.write_transform(h.transforms, TransformSlot::View, camera(self.camera_distance))?;

        for i in 0..self.grid.len() {
            let Some(world) = self.grid.world(i, elapsed) else {
                break;
            };
            frame.write_transform(h.transforms, TransformSlot::World, world)?;
            {
                let mut pass = frame.begin_pass(ColorTarget::Surface)?;
                pass.set_pipeline(h.pipeline)?;
                pass.set_bind_group(0, h.group)?;
                pass.set_vertex_buffer(0, h.vertices)?;
                pass.set_index_buffer(h.indices)?;
                pass.draw_indexed(0..index_count, 0, 0..1)?;
            }
            frame.submit();
        }
        Ok(())
    }
}
