use crate::device::GpuContext;

use super::desc::AttachmentConfig;

/// Depth format shared by every depth-tested pipeline.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// A texture together with its default view.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    fn new(device: &wgpu::Device, desc: &wgpu::TextureDescriptor<'_>) -> Self {
        let texture = device.create_texture(desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }
}

/// Size-dependent render attachments for surface passes.
///
/// Both are sized to the surface. They are the only resources rebuilt after
/// initialization, and only when the surface is resized.
#[derive(Debug)]
pub struct Attachments {
    config: AttachmentConfig,
    depth: Option<GpuTexture>,
    msaa: Option<GpuTexture>,
}

impl Attachments {
    pub(crate) fn new(ctx: GpuContext<'_>, config: AttachmentConfig) -> Self {
        let (width, height) = ctx.size;
        let extent = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };

        let depth = config.depth.then(|| {
            GpuTexture::new(
                ctx.device,
                &wgpu::TextureDescriptor {
                    label: Some("primer depth"),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: config.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: DEPTH_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                },
            )
        });

        let msaa = (config.sample_count > 1).then(|| {
            GpuTexture::new(
                ctx.device,
                &wgpu::TextureDescriptor {
                    label: Some("primer msaa color"),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: config.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: ctx.surface_format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                },
            )
        });

        log::debug!(
            "attachments {}x{}: depth={}, samples={}",
            extent.width,
            extent.height,
            config.depth,
            config.sample_count
        );

        Self { config, depth, msaa }
    }

    pub fn config(&self) -> AttachmentConfig {
        self.config
    }

    pub fn depth(&self) -> Option<&GpuTexture> {
        self.depth.as_ref()
    }

    /// Multisampled color target resolving into the backbuffer, when enabled.
    pub fn msaa(&self) -> Option<&GpuTexture> {
        self.msaa.as_ref()
    }

    /// Depth-stencil state for surface pipelines.
    pub(crate) fn depth_stencil_state(config: AttachmentConfig) -> Option<wgpu::DepthStencilState> {
        config.depth.then(|| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        })
    }
}
