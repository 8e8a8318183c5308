//! Renders the triangle into a 512x512 texture, then samples that texture onto the surface.

use primer_engine::frame::{ColorTarget, FrameState, Scene};
use primer_engine::resources::{
    BindGroupId, BindingRef, BufferId, PipelineDesc, PipelineId, PipelineTarget, SamplerDesc, SceneDesc, StageRef,
    TextureId, TextureSource,
};
use primer_engine::Result;

use crate::geometry::{ColoredVertex, TRIANGLE};

pub const TARGET_SIZE: u32 = 512;
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub struct RenderToTexture;

pub struct Handles {
    offscreen: PipelineId,
    blit: PipelineId,
    vertices: BufferId,
    target: TextureId,
    blit_group: BindGroupId,
}

/// Offscreen background, cycling slowly with time.
fn backdrop(elapsed: f32) -> wgpu::Color {
    let phase = f64::from(elapsed) * 0.5;
    wgpu::Color {
        r: 0.25 + 0.2 * phase.sin(),
        g: 0.25,
        b: 0.25 + 0.2 * phase.cos(),
        a: 1.0,
    }
}

impl Scene for RenderToTexture {
    type Handles = Handles;

    fn describe(&self) -> Result<(SceneDesc, Handles)> {
        let mut desc = SceneDesc::new("render-to-texture");
        let colored = desc.shader("colored", include_str!("../../shaders/colored.wgsl"));
        let blit_shader = desc.shader("blit", include_str!("../../shaders/blit.wgsl"));
        let layout = ColoredVertex::layout()?;

        let offscreen = desc.pipeline(
            PipelineDesc::new("offscreen", StageRef::new(colored, "vs_main"), StageRef::new(colored, "fs_main"))
                .with_vertex_buffer(layout.clone())
                .with_target(PipelineTarget::Offscreen(TARGET_FORMAT)),
        );
        let blit = desc.pipeline(PipelineDesc::new(
            "blit",
            StageRef::new(blit_shader, "vs_main"),
            StageRef::new(blit_shader, "fs_main"),
        ));

        let vertices = desc.vertex_buffer("triangle", layout, &TRIANGLE);
        let target = desc.texture(
            "offscreen target",
            TextureSource::RenderTarget {
                width: TARGET_SIZE,
                height: TARGET_SIZE,
                format: TARGET_FORMAT,
            },
        );
        let sampler = desc.sampler(SamplerDesc::linear("blit sampler"));
        let blit_group = desc.bind_group(
            "blit",
            blit,
            0,
            &[(0, BindingRef::Texture(target)), (1, BindingRef::Sampler(sampler))],
        );

        Ok((
            desc,
            Handles {
                offscreen,
                blit,
                vertices,
                target,
                blit_group,
            },
        ))
    }

    fn record(&mut self, h: &Handles, frame: &mut FrameState<'_>) -> Result<()> {
        frame.set_clear_color(backdrop(frame.time().elapsed));
        {
            let mut pass = frame.begin_pass(ColorTarget::Texture(h.target))?;
            pass.set_pipeline(h.offscreen)?;
            pass.set_vertex_buffer(0, h.vertices)?;
            pass.draw(0..3, 0..1)?;
        }

        frame.set_clear_color(wgpu::Color::BLACK);
        let mut pass = frame.begin_pass(ColorTarget::Surface)?;
        pass.set_pipeline(h.blit)?;
        pass.set_bind_group(0, h.blit_group)?;
        pass.draw(0..6, 0..1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::testing::record_once;
    use primer_engine::frame::LoadPolicy;

    #[test]
    fn texture_pass_precedes_surface_pass_in_one_submission() {
        let plan = record_once(&mut RenderToTexture, 1.0);
        let targets: Vec<_> = plan.passes().map(|p| p.target).collect();
        assert_eq!(targets.len(), 2);
        assert!(matches!(targets[0], ColorTarget::Texture(_)));
        assert_eq!(targets[1], ColorTarget::Surface);
        assert!(plan.passes().all(|p| p.color_load == LoadPolicy::Clear));
        assert_eq!(plan.stats().submissions, 1);
    }

    #[test]
    fn backdrop_follows_time() {
        assert_eq!(backdrop(2.0), backdrop(2.0));
        assert_ne!(backdrop(0.0), backdrop(2.0));
    }
}
