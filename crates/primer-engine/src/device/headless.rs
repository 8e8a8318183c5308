use crate::error::{Error, Result};

use super::context::request_device;
use super::{GpuContext, GpuInit};

/// Device and queue without a presentation surface.
///
/// Used by compute work and by tests that need a real device.
pub struct Headless {
    _instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl Headless {
    pub async fn new(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::EnvironmentMissing(format!("no suitable GPU adapter: {e}")))?;

        let (device, queue) = request_device(&adapter, &init, "primer headless device").await?;
        log::debug!("headless device on {:?}", adapter.get_info().name);

        Ok(Self {
            _instance: instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking convenience over [`Headless::new`].
    pub fn acquire(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Handles for offscreen work; the nominal target is a 1x1 RGBA8 image.
    pub fn context(&self) -> GpuContext<'_> {
        GpuContext {
            device: &self.device,
            queue: &self.queue,
            surface_format: wgpu::TextureFormat::Rgba8Unorm,
            size: (1, 1),
        }
    }
}
