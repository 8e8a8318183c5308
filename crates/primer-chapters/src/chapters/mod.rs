//! One module per tutorial chapter. Every windowed chapter is a [`Scene`].

use anyhow::Result;
use primer_engine::device::GpuInit;
use primer_engine::frame::Scene;
use primer_engine::window::{Runtime, RuntimeConfig};

pub mod compute;
pub mod indexed_quad;
pub mod instancing;
pub mod msaa;
pub mod render_to_texture;
pub mod spinning_grid;
pub mod textured_cubes;
pub mod vertex_buffer;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Chapter {
    VertexBuffer,
    IndexedQuad,
    Msaa,
    Instancing,
    Compute,
    RenderToTexture,
    TexturedCubes,
    SpinningGrid,
}

impl Chapter {
    pub const ALL: [Chapter; 8] = [
        Chapter::VertexBuffer,
        Chapter::IndexedQuad,
        Chapter::Msaa,
        Chapter::Instancing,
        Chapter::Compute,
        Chapter::RenderToTexture,
        Chapter::TexturedCubes,
        Chapter::SpinningGrid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Chapter::VertexBuffer => "vertex-buffer",
            Chapter::IndexedQuad => "indexed-quad",
            Chapter::Msaa => "msaa",
            Chapter::Instancing => "instancing",
            Chapter::Compute => "compute",
            Chapter::RenderToTexture => "render-to-texture",
            Chapter::TexturedCubes => "textured-cubes",
            Chapter::SpinningGrid => "spinning-grid",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Runs the chapter to completion: until its window closes, or once for `compute`.
    pub fn run(self) -> Result<()> {
        log::info!("running chapter `{}`", self.name());
        match self {
            Chapter::VertexBuffer => windowed(self, vertex_buffer::VertexBuffer),
            Chapter::IndexedQuad => windowed(self, indexed_quad::IndexedQuad),
            Chapter::Msaa => windowed(self, msaa::Msaa),
            Chapter::Instancing => windowed(self, instancing::Instancing),
            Chapter::Compute => compute::run(),
            Chapter::RenderToTexture => windowed(self, render_to_texture::RenderToTexture),
            Chapter::TexturedCubes => windowed(self, textured_cubes::TexturedCubes::default()),
            Chapter::SpinningGrid => windowed(self, spinning_grid::SpinningGrid::default()),
        }
    }
}

fn windowed<S: Scene + 'static>(chapter: Chapter, scene: S) -> Result<()> {
    let config = RuntimeConfig {
        title: format!("primer: {}", chapter.name()),
        ..RuntimeConfig::default()
    };
    Runtime::run(config, GpuInit::default(), scene)
}

#[cfg(test)]
pub(crate) mod testing {
    use primer_engine::frame::{record_frame, FramePlan, Scene};
    use primer_engine::time::FrameTime;

    /// Describes `scene`, checks its shaders against the description and records one tick.
    pub fn record_once<S: Scene>(scene: &mut S, elapsed: f32) -> FramePlan {
        let (desc, handles) = scene.describe().unwrap();
        let manifest = desc.checked_manifest().unwrap();
        record_frame(scene, &handles, &manifest, FrameTime::at(elapsed, 0), (800, 600)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for chapter in Chapter::ALL {
            assert_eq!(Chapter::from_name(chapter.name()), Some(chapter));
        }
        assert_eq!(Chapter::from_name("triangle"), None);
    }
}
