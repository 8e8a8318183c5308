/// What the frame driver does when the backbuffer cannot be acquired.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Lost or outdated: the surface is configured again and the tick is skipped.
    Reconfigured,
    /// Timeout or an unspecified backend error: the tick is skipped.
    SkipFrame,
    /// Out of memory: the runtime exits.
    Fatal,
}

impl SurfaceErrorAction {
    pub fn classify(err: &wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Self::Reconfigured,
            wgpu::SurfaceError::OutOfMemory => Self::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => Self::SkipFrame,
        }
    }

    pub fn is_fatal(self) -> bool {
        self == Self::Fatal
    }
}
