//! Vertex input description.
//!
//! A [`VertexLayout`] is validated when it is built, so an inconsistent layout never
//! reaches buffer or pipeline creation.

mod vertex;

pub use vertex::{instance_count, StepMode, VertexAttribute, VertexLayout};
