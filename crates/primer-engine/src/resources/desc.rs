use std::borrow::Cow;

use bytemuck::Pod;

use crate::error::{Error, Result};
use crate::layout::VertexLayout;
use crate::reflect::{merged_bindings, ShaderReflection};

use super::bind::validate_bind_group;
use super::ids::{BindGroupId, BufferId, PipelineId, SamplerId, ShaderId, TextureId};
use super::image::ImageSource;
use super::manifest::ResourceManifest;

/// WGSL source plus a label for diagnostics.
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    pub label: String,
    pub source: Cow<'static, str>,
}

/// What a buffer is used for. Fixes its usage flags and how it may be bound.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferKind {
    /// Per-vertex or per-instance attribute stream, depending on the layout's step mode.
    Vertex(VertexLayout),
    Index(wgpu::IndexFormat),
    /// Queue-writable uniform region of fixed size.
    Uniform,
    /// Queue-writable storage region of fixed size.
    Storage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BufferContents {
    /// Uploaded once at creation; the buffer is sized exactly to the data.
    Init(Vec<u8>),
    /// Zero-filled region of the given byte size.
    Zeroed(u64),
}

impl BufferContents {
    pub fn byte_len(&self) -> u64 {
        match self {
            Self::Init(bytes) => bytes.len() as u64,
            Self::Zeroed(size) => *size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub label: String,
    pub kind: BufferKind,
    pub contents: BufferContents,
}

/// Shader module + entry point for one pipeline stage.
#[derive(Debug, Clone)]
pub struct StageRef {
    pub shader: ShaderId,
    pub entry_point: String,
}

impl StageRef {
    pub fn new(shader: ShaderId, entry_point: impl Into<String>) -> Self {
        Self { shader, entry_point: entry_point.into() }
    }
}

/// Where a pipeline's single color output goes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PipelineTarget {
    /// The presentation surface. Depth and sample count follow the scene's
    /// [`AttachmentConfig`].
    Surface,
    /// An offscreen texture of the given format, single-sampled and without depth.
    Offscreen(wgpu::TextureFormat),
}

#[derive(Debug, Clone)]
pub struct PipelineDesc {
    pub label: String,
    pub vertex: StageRef,
    pub fragment: StageRef,
    /// Vertex buffer slots in order; slot `i` is bound with `set_vertex_buffer(i, ..)`.
    pub vertex_buffers: Vec<VertexLayout>,
    pub topology: wgpu::PrimitiveTopology,
    pub target: PipelineTarget,
}

impl PipelineDesc {
    /// Triangle-list pipeline targeting the surface.
    pub fn new(label: impl Into<String>, vertex: StageRef, fragment: StageRef) -> Self {
        Self {
            label: label.into(),
            vertex,
            fragment,
            vertex_buffers: Vec::new(),
            topology: wgpu::PrimitiveTopology::TriangleList,
            target: PipelineTarget::Surface,
        }
    }

    pub fn with_vertex_buffer(mut self, layout: VertexLayout) -> Self {
        self.vertex_buffers.push(layout);
        self
    }

    pub fn with_target(mut self, target: PipelineTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }
}

#[derive(Debug, Clone)]
pub enum TextureSource {
    /// Decoded at initialization and uploaded with one queue-level copy.
    Image(ImageSource),
    /// Offscreen color target that can later be sampled.
    RenderTarget {
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    },
}

#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub label: String,
    pub source: TextureSource,
}

#[derive(Debug, Clone)]
pub struct SamplerDesc {
    pub label: String,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
}

impl SamplerDesc {
    pub fn linear(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
        }
    }
}

/// Resource bound at one slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindingRef {
    Buffer(BufferId),
    Texture(TextureId),
    Sampler(SamplerId),
}

#[derive(Debug, Clone)]
pub struct BindGroupDesc {
    pub label: String,
    /// Pipeline whose automatic layout the group is created against.
    pub pipeline: PipelineId,
    pub group: u32,
    /// `(binding number, resource)` pairs.
    pub entries: Vec<(u32, BindingRef)>,
}

/// Size-dependent attachments shared by every surface-targeting pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttachmentConfig {
    /// Allocate a depth texture and enable depth testing (`less`, writes on).
    pub depth: bool,
    /// `1` renders straight into the backbuffer; otherwise an MSAA color target
    /// resolves into it.
    pub sample_count: u32,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self { depth: false, sample_count: 1 }
    }
}

/// Declarative description of every long-lived resource of a scene.
///
/// Builder methods hand out typed ids in declaration order. Nothing touches the
/// GPU until the description is passed to a
/// [`ResourceInitializer`](super::ResourceInitializer).
#[derive(Debug, Clone, Default)]
pub struct SceneDesc {
    pub label: String,
    pub attachments: AttachmentConfig,
    pub shaders: Vec<ShaderDesc>,
    pub pipelines: Vec<PipelineDesc>,
    pub buffers: Vec<BufferDesc>,
    pub textures: Vec<TextureDesc>,
    pub samplers: Vec<SamplerDesc>,
    pub bind_groups: Vec<BindGroupDesc>,
}

impl SceneDesc {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_depth(mut self) -> Self {
        self.attachments.depth = true;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.attachments.sample_count = sample_count;
        self
    }

    pub fn shader(&mut self, label: impl Into<String>, source: impl Into<Cow<'static, str>>) -> ShaderId {
        self.shaders.push(ShaderDesc {
            label: label.into(),
            source: source.into(),
        });
        ShaderId(self.shaders.len() - 1)
    }

    pub fn pipeline(&mut self, desc: PipelineDesc) -> PipelineId {
        self.pipelines.push(desc);
        PipelineId(self.pipelines.len() - 1)
    }

    pub fn buffer(&mut self, desc: BufferDesc) -> BufferId {
        self.buffers.push(desc);
        BufferId(self.buffers.len() - 1)
    }

    /// Immutable attribute stream (per-vertex or per-instance per `layout`).
    pub fn vertex_buffer<T: Pod>(&mut self, label: impl Into<String>, layout: VertexLayout, data: &[T]) -> BufferId {
        self.buffer(BufferDesc {
            label: label.into(),
            kind: BufferKind::Vertex(layout),
            contents: BufferContents::Init(bytemuck::cast_slice(data).to_vec()),
        })
    }

    pub fn index_buffer_u16(&mut self, label: impl Into<String>, indices: &[u16]) -> BufferId {
        self.buffer(BufferDesc {
            label: label.into(),
            kind: BufferKind::Index(wgpu::IndexFormat::Uint16),
            contents: BufferContents::Init(bytemuck::cast_slice(indices).to_vec()),
        })
    }

    pub fn index_buffer_u32(&mut self, label: impl Into<String>, indices: &[u32]) -> BufferId {
        self.buffer(BufferDesc {
            label: label.into(),
            kind: BufferKind::Index(wgpu::IndexFormat::Uint32),
            contents: BufferContents::Init(bytemuck::cast_slice(indices).to_vec()),
        })
    }

    pub fn uniform_buffer(&mut self, label: impl Into<String>, size: u64) -> BufferId {
        self.buffer(BufferDesc {
            label: label.into(),
            kind: BufferKind::Uniform,
            contents: BufferContents::Zeroed(size),
        })
    }

    pub fn storage_buffer(&mut self, label: impl Into<String>, size: u64) -> BufferId {
        self.buffer(BufferDesc {
            label: label.into(),
            kind: BufferKind::Storage,
            contents: BufferContents::Zeroed(size),
        })
    }

    pub fn texture(&mut self, label: impl Into<String>, source: TextureSource) -> TextureId {
        self.textures.push(TextureDesc {
            label: label.into(),
            source,
        });
        TextureId(self.textures.len() - 1)
    }

    pub fn sampler(&mut self, desc: SamplerDesc) -> SamplerId {
        self.samplers.push(desc);
        SamplerId(self.samplers.len() - 1)
    }

    pub fn bind_group(
        &mut self,
        label: impl Into<String>,
        pipeline: PipelineId,
        group: u32,
        entries: &[(u32, BindingRef)],
    ) -> BindGroupId {
        self.bind_groups.push(BindGroupDesc {
            label: label.into(),
            pipeline,
            group,
            entries: entries.to_vec(),
        });
        BindGroupId(self.bind_groups.len() - 1)
    }

    /// Structural validation and the GPU-free summary frames are recorded against.
    pub fn manifest(&self) -> Result<ResourceManifest> {
        ResourceManifest::from_desc(self)
    }

    /// [`manifest`](Self::manifest) after [`validate_interfaces`](Self::validate_interfaces),
    /// with each pipeline's reflected `@group` indices filled in.
    pub fn checked_manifest(&self) -> Result<ResourceManifest> {
        let mut manifest = self.manifest()?;
        let reflections = self.validate_interfaces()?;
        let reflection = |id: ShaderId| {
            reflections
                .get(id.0)
                .ok_or_else(|| Error::mismatch(format!("unknown shader id {}", id.0)))
        };

        for (info, pipeline) in manifest.pipelines.iter_mut().zip(&self.pipelines) {
            let mut groups = reflection(pipeline.vertex.shader)?.groups();
            groups.extend(reflection(pipeline.fragment.shader)?.groups());
            info.bind_groups = groups.into_iter().collect();
        }
        Ok(manifest)
    }

    /// Parses every shader and checks pipelines and bind groups against the
    /// reflected interfaces.
    ///
    /// Returns the reflections in shader-id order.
    pub fn validate_interfaces(&self) -> Result<Vec<ShaderReflection>> {
        let reflections = self
            .shaders
            .iter()
            .map(|s| ShaderReflection::parse(s.label.clone(), &s.source))
            .collect::<Result<Vec<_>>>()?;

        let reflection = |id: ShaderId| {
            reflections
                .get(id.0)
                .ok_or_else(|| Error::mismatch(format!("unknown shader id {}", id.0)))
        };

        for pipeline in &self.pipelines {
            let vs = reflection(pipeline.vertex.shader)?;
            let fs = reflection(pipeline.fragment.shader)?;

            let expected = vs.vertex_inputs(&pipeline.vertex.entry_point)?;
            let mut provided = std::collections::BTreeSet::new();
            for location in pipeline.vertex_buffers.iter().flat_map(|l| l.locations()) {
                if !provided.insert(location) {
                    return Err(Error::mismatch(format!(
                        "pipeline `{}` feeds @location({location}) from more than one buffer",
                        pipeline.label
                    )));
                }
            }
            if expected != provided {
                return Err(Error::mismatch(format!(
                    "pipeline `{}`: shader expects vertex inputs {expected:?}, layouts provide {provided:?}",
                    pipeline.label
                )));
            }

            fs.require_fragment(&pipeline.fragment.entry_point)?;
        }

        for group in &self.bind_groups {
            let pipeline = self
                .pipelines
                .get(group.pipeline.0)
                .ok_or_else(|| Error::mismatch(format!("bind group `{}` names an unknown pipeline", group.label)))?;
            let vs = reflection(pipeline.vertex.shader)?;
            let fs = reflection(pipeline.fragment.shader)?;
            let stages: Vec<&ShaderReflection> = if pipeline.vertex.shader == pipeline.fragment.shader {
                vec![vs]
            } else {
                vec![vs, fs]
            };
            let reflected = merged_bindings(&stages, group.group)?;
            validate_bind_group(self, group, &reflected)?;
        }

        Ok(reflections)
    }
}
