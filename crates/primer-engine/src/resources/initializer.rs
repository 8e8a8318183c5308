use wgpu::util::DeviceExt;

use crate::device::{validated, GpuContext};
use crate::error::{Error, Result};

use super::attachments::{Attachments, GpuTexture};
use super::desc::{BindingRef, BufferContents, BufferKind, PipelineTarget, SceneDesc, TextureSource};
use super::ids::{BindGroupId, BufferId, PipelineId, SamplerId, TextureId};
use super::manifest::ResourceManifest;

/// Everything a scene renders with, built once.
///
/// Handles are immutable after initialization except for queue-level writes to
/// uniform/storage buffers and the attachment rebuild on resize.
#[derive(Debug)]
pub struct SceneResources {
    manifest: ResourceManifest,
    pipelines: Vec<wgpu::RenderPipeline>,
    buffers: Vec<wgpu::Buffer>,
    textures: Vec<GpuTexture>,
    samplers: Vec<wgpu::Sampler>,
    bind_groups: Vec<wgpu::BindGroup>,
    attachments: Attachments,
}

impl SceneResources {
    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn pipeline(&self, id: PipelineId) -> Result<&wgpu::RenderPipeline> {
        self.pipelines
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown pipeline id {}", id.0)))
    }

    pub fn buffer(&self, id: BufferId) -> Result<&wgpu::Buffer> {
        self.buffers
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown buffer id {}", id.0)))
    }

    pub fn texture(&self, id: TextureId) -> Result<&GpuTexture> {
        self.textures
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown texture id {}", id.0)))
    }

    pub fn sampler(&self, id: SamplerId) -> Result<&wgpu::Sampler> {
        self.samplers
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown sampler id {}", id.0)))
    }

    pub fn bind_group(&self, id: BindGroupId) -> Result<&wgpu::BindGroup> {
        self.bind_groups
            .get(id.0)
            .ok_or_else(|| Error::mismatch(format!("unknown bind group id {}", id.0)))
    }

    /// Rebuilds the size-dependent attachments for the context's current surface size.
    pub fn resize_attachments(&mut self, ctx: GpuContext<'_>) {
        self.attachments = Attachments::new(ctx, self.manifest.attachments);
    }
}

/// Builds [`SceneResources`] from a [`SceneDesc`].
///
/// Order:
/// 1. structural + reflection validation (nothing allocated on failure)
/// 2. pipelines with automatic layouts
/// 3. geometry, uniform and storage buffers
/// 4. depth / multisample attachments
/// 5. textures (image decode + one queue copy each) and samplers
/// 6. bind groups, after everything they reference exists
pub struct ResourceInitializer<'a> {
    ctx: GpuContext<'a>,
}

impl<'a> ResourceInitializer<'a> {
    pub fn new(ctx: GpuContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn initialize(&self, desc: &SceneDesc) -> Result<SceneResources> {
        let manifest = desc.checked_manifest()?;

        // Decode before allocating anything so a bad asset leaves no partial scene.
        let texels = desc
            .textures
            .iter()
            .map(|t| match &t.source {
                TextureSource::Image(src) => src.decode().map(Texels::Decoded),
                TextureSource::RenderTarget { width, height, format } => Ok(Texels::Target {
                    width: *width,
                    height: *height,
                    format: *format,
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "initializing scene `{}`: {} pipelines, {} buffers, {} textures, {} bind groups",
            desc.label,
            desc.pipelines.len(),
            desc.buffers.len(),
            desc.textures.len(),
            desc.bind_groups.len()
        );

        let resources = validated(self.ctx.device, &format!("scene `{}`", desc.label), || {
            Ok(self.allocate(desc, manifest, texels))
        })?;
        log::info!("scene `{}` initialized", desc.label);
        Ok(resources)
    }

    fn allocate(&self, desc: &SceneDesc, manifest: ResourceManifest, texels: Vec<Texels>) -> SceneResources {
        let pipelines = self.create_pipelines(desc);
        let buffers = self.create_buffers(desc);
        let attachments = Attachments::new(self.ctx, desc.attachments);
        let textures = self.create_textures(desc, texels);
        let samplers = desc
            .samplers
            .iter()
            .map(|s| {
                self.ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some(&s.label),
                    mag_filter: s.mag_filter,
                    min_filter: s.min_filter,
                    ..Default::default()
                })
            })
            .collect::<Vec<_>>();

        let bind_groups = desc
            .bind_groups
            .iter()
            .map(|g| {
                let layout = pipelines[g.pipeline.0].get_bind_group_layout(g.group);
                let entries = g
                    .entries
                    .iter()
                    .map(|(binding, resource)| wgpu::BindGroupEntry {
                        binding: *binding,
                        resource: match resource {
                            BindingRef::Buffer(id) => buffers[id.0].as_entire_binding(),
                            BindingRef::Texture(id) => wgpu::BindingResource::TextureView(&textures[id.0].view),
                            BindingRef::Sampler(id) => wgpu::BindingResource::Sampler(&samplers[id.0]),
                        },
                    })
                    .collect::<Vec<_>>();
                self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&g.label),
                    layout: &layout,
                    entries: &entries,
                })
            })
            .collect::<Vec<_>>();

        SceneResources {
            manifest,
            pipelines,
            buffers,
            textures,
            samplers,
            bind_groups,
            attachments,
        }
    }

    fn create_pipelines(&self, desc: &SceneDesc) -> Vec<wgpu::RenderPipeline> {
        let device = self.ctx.device;
        let modules = desc
            .shaders
            .iter()
            .map(|s| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&s.label),
                    source: wgpu::ShaderSource::Wgsl(s.source.clone()),
                })
            })
            .collect::<Vec<_>>();

        desc.pipelines
            .iter()
            .map(|p| {
                let (format, depth_stencil, sample_count) = match p.target {
                    PipelineTarget::Surface => (
                        self.ctx.surface_format,
                        Attachments::depth_stencil_state(desc.attachments),
                        desc.attachments.sample_count,
                    ),
                    PipelineTarget::Offscreen(format) => (format, None, 1),
                };
                let buffers = p.vertex_buffers.iter().map(|l| l.as_wgpu()).collect::<Vec<_>>();

                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(&p.label),
                    // Inferred from the shader; bind groups use `get_bind_group_layout`.
                    layout: None,
                    vertex: wgpu::VertexState {
                        module: &modules[p.vertex.shader.0],
                        entry_point: Some(&p.vertex.entry_point),
                        compilation_options: Default::default(),
                        buffers: &buffers,
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &modules[p.fragment.shader.0],
                        entry_point: Some(&p.fragment.entry_point),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: p.topology,
                        ..Default::default()
                    },
                    depth_stencil,
                    multisample: wgpu::MultisampleState {
                        count: sample_count,
                        ..Default::default()
                    },
                    multiview_mask: None,
                    cache: None,
                })
            })
            .collect()
    }

    fn create_buffers(&self, desc: &SceneDesc) -> Vec<wgpu::Buffer> {
        let device = self.ctx.device;
        desc.buffers
            .iter()
            .map(|b| {
                let usage = match b.kind {
                    BufferKind::Vertex(_) => wgpu::BufferUsages::VERTEX,
                    BufferKind::Index(_) => wgpu::BufferUsages::INDEX,
                    BufferKind::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    BufferKind::Storage => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                };
                match &b.contents {
                    // Mapped at creation, filled, then unmapped: immutable from the host afterwards.
                    BufferContents::Init(bytes) => device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&b.label),
                        contents: bytes,
                        usage,
                    }),
                    BufferContents::Zeroed(size) => device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some(&b.label),
                        size: *size,
                        usage,
                        mapped_at_creation: false,
                    }),
                }
            })
            .collect()
    }

    fn create_textures(&self, desc: &SceneDesc, texels: Vec<Texels>) -> Vec<GpuTexture> {
        desc.textures
            .iter()
            .zip(texels)
            .map(|(t, texels)| match texels {
                Texels::Decoded(pixels) => upload_image(self.ctx, &t.label, &pixels),
                Texels::Target { width, height, format } => {
                    let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
                        label: Some(&t.label),
                        size: wgpu::Extent3d {
                            width,
                            height,
                            depth_or_array_layers: 1,
                        },
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D2,
                        format,
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                        view_formats: &[],
                    });
                    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                    GpuTexture { texture, view }
                }
            })
            .collect()
    }
}

/// Texture contents resolved before any allocation.
enum Texels {
    Decoded(image::RgbaImage),
    Target {
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    },
}

/// Creates an RGBA8 texture of the image's size and fills it with one queue copy.
fn upload_image(ctx: GpuContext<'_>, label: &str, pixels: &image::RgbaImage) -> GpuTexture {
    let (width, height) = pixels.dimensions();
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    log::debug!("uploaded texture `{label}` ({width}x{height})");

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}
