//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring backbuffers for the frame driver

mod context;
mod error;
mod frame;
mod headless;
mod init;
mod scope;
mod surface;

pub use context::{Gpu, GpuContext};
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use headless::Headless;
pub use init::GpuInit;
pub(crate) use scope::validated;
