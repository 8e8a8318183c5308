use crate::error::{Error, Result};
use crate::layout::StepMode;

use super::desc::{AttachmentConfig, BufferContents, BufferKind, PipelineTarget, SceneDesc, TextureSource};
use super::ids::{BindGroupId, BufferId, PipelineId, TextureId};

/// GPU-free summary of one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferInfo {
    pub label: String,
    pub class: BufferClass,
    /// Exact byte size.
    pub size: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferClass {
    /// Attribute stream; `elements` is the vertex or instance count.
    Vertex { step_mode: StepMode, stride: u64, elements: u32 },
    Index { format: wgpu::IndexFormat, count: u32 },
    Uniform,
    Storage,
}

impl BufferClass {
    /// Whether the frame driver may rewrite the buffer through the queue.
    pub fn is_writable(self) -> bool {
        matches!(self, Self::Uniform | Self::Storage)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInfo {
    pub label: String,
    /// Step mode of each vertex buffer slot.
    pub vertex_slots: Vec<StepMode>,
    pub target: PipelineTarget,
    /// `@group` indices the pipeline's shaders declare, each of which must be bound
    /// before a draw. Empty until the shaders are reflected
    /// ([`SceneDesc::checked_manifest`]).
    pub bind_groups: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub label: String,
    /// Offscreen target format; `None` for sampled images.
    pub render_target: Option<wgpu::TextureFormat>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindGroupInfo {
    pub label: String,
    pub pipeline: PipelineId,
    pub group: u32,
}

/// What frame recording needs to know about a scene, without GPU handles.
///
/// Built from a [`SceneDesc`]; structural mistakes (dangling ids, partial
/// elements, unsupported sample counts) are reported here, before any allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceManifest {
    pub attachments: AttachmentConfig,
    pub buffers: Vec<BufferInfo>,
    pub pipelines: Vec<PipelineInfo>,
    pub textures: Vec<TextureInfo>,
    pub bind_groups: Vec<BindGroupInfo>,
}

impl ResourceManifest {
    pub fn from_desc(desc: &SceneDesc) -> Result<Self> {
        let attachments = desc.attachments;
        if !matches!(attachments.sample_count, 1 | 4) {
            return Err(Error::mismatch(format!(
                "sample count {} is not supported (use 1 or 4)",
                attachments.sample_count
            )));
        }

        let buffers = desc
            .buffers
            .iter()
            .map(|b| {
                let size = b.contents.byte_len();
                if size == 0 {
                    return Err(Error::mismatch(format!("buffer `{}` is empty", b.label)));
                }
                let class = match &b.kind {
                    BufferKind::Vertex(layout) => {
                        if !matches!(b.contents, BufferContents::Init(_)) {
                            return Err(Error::mismatch(format!("vertex buffer `{}` has no data", b.label)));
                        }
                        BufferClass::Vertex {
                            step_mode: layout.step_mode(),
                            stride: layout.stride(),
                            elements: layout.element_count(size)?,
                        }
                    }
                    BufferKind::Index(format) => {
                        let width = match format {
                            wgpu::IndexFormat::Uint16 => 2,
                            wgpu::IndexFormat::Uint32 => 4,
                        };
                        BufferClass::Index {
                            format: *format,
                            count: crate::layout::instance_count(size, width)?,
                        }
                    }
                    BufferKind::Uniform => {
                        if size % 16 != 0 {
                            return Err(Error::mismatch(format!(
                                "uniform `{}` size {size} is not a multiple of 16",
                                b.label
                            )));
                        }
                        BufferClass::Uniform
                    }
                    BufferKind::Storage => BufferClass::Storage,
                };
                Ok(BufferInfo {
                    label: b.label.clone(),
                    class,
                    size,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let pipelines = desc
            .pipelines
            .iter()
            .map(|p| {
                for stage in [&p.vertex, &p.fragment] {
                    if stage.shader.0 >= desc.shaders.len() {
                        return Err(Error::mismatch(format!(
                            "pipeline `{}` names unknown shader {}",
                            p.label, stage.shader.0
                        )));
                    }
                }
                Ok(PipelineInfo {
                    label: p.label.clone(),
                    vertex_slots: p.vertex_buffers.iter().map(|l| l.step_mode()).collect(),
                    target: p.target,
                    bind_groups: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let textures = desc
            .textures
            .iter()
            .map(|t| {
                let render_target = match &t.source {
                    TextureSource::Image(_) => None,
                    TextureSource::RenderTarget { width, height, format } => {
                        if *width == 0 || *height == 0 {
                            return Err(Error::mismatch(format!("render target `{}` has zero size", t.label)));
                        }
                        Some(*format)
                    }
                };
                Ok(TextureInfo {
                    label: t.label.clone(),
                    render_target,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let bind_groups = desc
            .bind_groups
            .iter()
            .map(|g| {
                if g.pipeline.0 >= pipelines.len() {
                    return Err(Error::mismatch(format!(
                        "bind group `{}` names unknown pipeline {}",
                        g.label, g.pipeline.0
                    )));
                }
                Ok(BindGroupInfo {
                    label: g.label.clone(),
                    pipeline: g.pipeline,
                    group: g.group,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            attachments,
            buffers,
            pipelines,
            textures,
            bind_groups,
        })
    }

    pub fn buffer(&self, id: BufferId) -> Result<&BufferInfo> {
        self.buffers
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown buffer id {}", id.0)))
    }

    pub fn pipeline(&self, id: PipelineId) -> Result<&PipelineInfo> {
        self.pipelines
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown pipeline id {}", id.0)))
    }

    pub fn texture(&self, id: TextureId) -> Result<&TextureInfo> {
        self.textures
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown texture id {}", id.0)))
    }

    pub fn bind_group(&self, id: BindGroupId) -> Result<&BindGroupInfo> {
        self.bind_groups
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown bind group id {}", id.0)))
    }

    /// Vertex or instance count of an attribute buffer.
    pub fn element_count(&self, id: BufferId) -> Result<u32> {
        match self.buffer(id)?.class {
            BufferClass::Vertex { elements, .. } => Ok(elements),
            other => Err(Error::mismatch(format!("buffer {} is {other:?}, not a vertex stream", id.0))),
        }
    }

    /// Number of indices in an index buffer.
    pub fn index_count(&self, id: BufferId) -> Result<u32> {
        match self.buffer(id)?.class {
            BufferClass::Index { count, .. } => Ok(count),
            other => Err(Error::mismatch(format!("buffer {} is {other:?}, not an index buffer", id.0))),
        }
    }
}
