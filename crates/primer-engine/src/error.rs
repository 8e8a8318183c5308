//! Engine error taxonomy.
//!
//! Every error is fatal for the operation that raised it: nothing here is retried,
//! and a failed frame is abandoned while the next tick starts from a fresh state.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// No window, surface, adapter or device could be obtained.
    ///
    /// Raised before any resource is allocated.
    #[error("environment missing: {0}")]
    EnvironmentMissing(String),

    /// Shader, pipeline and bind group disagree about their interface.
    #[error("configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    /// A vertex layout violates its own stride or location rules.
    #[error("invalid vertex layout: {0}")]
    InvalidLayout(String),

    /// A write or draw range falls outside the fixed size of its resource.
    #[error("{what}: range {offset}..{end} exceeds size {size}")]
    OutOfBounds {
        what: String,
        offset: u64,
        end: u64,
        size: u64,
    },

    /// A one-shot asynchronous operation (buffer map, device poll) was rejected.
    #[error("asynchronous operation failed: {0}")]
    AsyncOp(String),

    /// An encoded image could not be decoded.
    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// A dispatch grid does not cover the full data extent.
    #[error(
        "workgroup grid {grid:?} does not cover extent {extent:?} \
         (workgroup size {workgroup_size:?}, need {required:?})"
    )]
    BoundaryCoverage {
        grid: [u32; 3],
        extent: [u32; 3],
        workgroup_size: [u32; 3],
        required: [u32; 3],
    },

    /// WGSL source could not be parsed for reflection.
    #[error("shader `{label}` failed to parse: {message}")]
    ShaderParse { label: String, message: String },

    /// Acquiring the surface texture failed.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

impl Error {
    pub(crate) fn mismatch(msg: impl Into<String>) -> Self {
        Self::ConfigurationMismatch(msg.into())
    }

    pub(crate) fn out_of_bounds(what: impl Into<String>, offset: u64, len: u64, size: u64) -> Self {
        Self::OutOfBounds {
            what: what.into(),
            offset,
            end: offset.saturating_add(len),
            size,
        }
    }
}
