/// Adapter, device and surface preferences.
///
/// Shared by the windowed [`Gpu`](super::Gpu) and [`Headless`](super::Headless);
/// the surface fields are ignored without a window.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick `Bgra8UnormSrgb`/`Rgba8UnormSrgb` when the surface offers one,
    /// otherwise the surface's first (preferred) format.
    pub prefer_srgb: bool,

    /// `Fifo` is always available and paces ticks to the display.
    pub present_mode: wgpu::PresentMode,

    /// Falls back to the surface's first supported mode when unavailable.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power_preference: wgpu::PowerPreference,

    /// Every chapter runs on the empty set.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Hint only; backends may ignore it.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: Some(wgpu::CompositeAlphaMode::Opaque),
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
