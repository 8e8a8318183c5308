//! A grid of textured cubes drawn in one accumulated pass.
//!
//! Every cube's world matrix goes into a storage buffer before the pass opens;
//! the vertex shader picks its matrix by instance index, so one uniform block
//! and one submission serve the whole grid.

use primer_engine::frame::animation::{camera, perspective, GridLayout};
use primer_engine::frame::{ColorTarget, FrameState, Scene};
use primer_engine::resources::{
    BindGroupId, BindingRef, BufferId, ImageSource, PipelineDesc, PipelineId, SamplerDesc, SceneDesc, StageRef,
    TextureSource, TransformBlock,
};
use primer_engine::{Error, Result};

use crate::geometry::{cube, cube_layout, CUBE_COLOR, CUBE_POSITION, CUBE_UV};

const MATRIX_SIZE: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

pub struct TexturedCubes {
    grid: GridLayout,
    camera_distance: f32,
}

impl Default for TexturedCubes {
    fn default() -> Self {
        Self {
            grid: GridLayout::new(4, 4, 3.0),
            camera_distance: 14.0,
        }
    }
}

pub struct Handles {
    pipeline: PipelineId,
    vertices: BufferId,
    indices: BufferId,
    transforms: BufferId,
    worlds: BufferId,
    group: BindGroupId,
}

impl Scene for TexturedCubes {
    type Handles = Handles;

    fn describe(&self) -> Result<(SceneDesc, Handles)> {
        if self.grid.is_empty() {
            return Err(Error::ConfigurationMismatch("textured cube grid has no cells".into()));
        }

        let mut desc = SceneDesc::new("textured-cubes").with_depth();
        let shader = desc.shader("textured cube", include_str!("../../shaders/textured_cube.wgsl"));
        let layout = cube_layout(&[CUBE_POSITION, CUBE_COLOR, CUBE_UV])?;
        let pipeline = desc.pipeline(
            PipelineDesc::new("textured cube", StageRef::new(shader, "vs_main"), StageRef::new(shader, "fs_main"))
                .with_vertex_buffer(layout.clone()),
        );

        let (cube_vertices, cube_indices) = cube();
        let vertices = desc.vertex_buffer("cube", layout, &cube_vertices);
        let indices = desc.index_buffer_u16("cube indices", &cube_indices);
        let transforms = desc.uniform_buffer("transforms", TransformBlock::SIZE);
        let worlds = desc.storage_buffer("worlds", MATRIX_SIZE * u64::from(self.grid.len()));
        let texture = desc.texture("checker", TextureSource::Image(ImageSource::checkerboard(8, 16)));
        let sampler = desc.sampler(SamplerDesc::linear("cube sampler"));
        let group = desc.bind_group(
            "textured cube",
            pipeline,
            0,
            &[
                (0, BindingRef::Buffer(transforms)),
                (1, BindingRef::Buffer(worlds)),
                (2, BindingRef::Texture(texture)),
                (3, BindingRef::Sampler(sampler)),
            ],
        );

        Ok((
            desc,
            Handles {
                pipeline,
                vertices,
                indices,
                transforms,
                worlds,
                group,
            },
        ))
    }

    fn record(&mut self, h: &Handles, frame: &mut FrameState<'_>) -> Result<()> {
        let elapsed = frame.time().elapsed;
        let block = TransformBlock::new(
            perspective(frame.aspect()),
            camera(self.camera_distance),
            glam::Mat4::IDENTITY,
        );
        frame.write_transforms(h.transforms, &block)?;

        let worlds = (0..self.grid.len())
            .filter_map(|i| self.grid.world(i, elapsed))
            .map(|m| m.to_cols_array_2d())
            .collect::<Vec<_>>();
        frame.write_buffer(h.worlds, 0, &worlds)?;

        let index_count = frame.manifest().index_count(h.indices)?;
        frame.accumulate(ColorTarget::Surface, self.grid.len(), |pass, i| {
            if i == 0 {
                pass.set_pipeline(h.pipeline)?;
                pass.set_bind_group(0, h.group)?;
                pass.set_vertex_buffer(0, h.vertices)?;
                pass.set_index_buffer(h.indices)?;
            }
            pass.draw_indexed(0..index_count, 0, i..i + 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::testing::record_once;
    use primer_engine::frame::{FrameStep, LoadPolicy};

    #[test]
    fn whole_grid_is_one_pass_and_one_submission() {
        let mut scene = TexturedCubes::default();
        let plan = record_once(&mut scene, 0.5);
        let stats = plan.stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.draws, 16);
        assert_eq!(stats.submissions, 1);

        let pass = plan.passes().next().unwrap();
        assert_eq!(pass.depth_load, Some(LoadPolicy::Clear));
    }

    #[test]
    fn worlds_are_written_before_the_pass() {
        let mut scene = TexturedCubes::default();
        let plan = record_once(&mut scene, 0.5);
        let first_pass = plan
            .steps()
            .iter()
            .position(|s| matches!(s, FrameStep::Pass(_)))
            .unwrap();
        let writes_before = plan.steps()[..first_pass]
            .iter()
            .filter(|s| matches!(s, FrameStep::WriteBuffer { .. }))
            .count();
        assert_eq!(writes_before, 2);
        assert_eq!(plan.stats().bytes_written, TransformBlock::SIZE + 16 * MATRIX_SIZE);
    }

    #[test]
    fn empty_grid_is_rejected() {
        let scene = TexturedCubes {
            grid: GridLayout::new(0, 4, 1.0),
            camera_distance: 5.0,
        };
        assert!(scene.describe().is_err());
    }
}
