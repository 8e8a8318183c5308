//! Primer engine crate.
//!
//! Builds a scene's GPU resources once, then records, validates and submits a
//! bounded command plan every frame. Also hosts the compute dispatch/readback
//! path and the window runtime the chapters run in.

pub mod compute;
pub mod device;
mod error;
pub mod frame;
pub mod layout;
pub mod logging;
pub mod reflect;
pub mod resources;
pub mod time;
pub mod window;

pub use error::{Error, Result};
