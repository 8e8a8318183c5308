use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Projection, view and world matrices as one uniform block.
///
/// Layout (column-major `mat4x4<f32>` each):
/// - projection at byte 0
/// - view at byte 64
/// - world at byte 128
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TransformBlock {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
}

impl TransformBlock {
    /// Byte size of the block; uniform buffers holding it are allocated with this size.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(projection: Mat4, view: Mat4, world: Mat4) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            world: world.to_cols_array_2d(),
        }
    }
}

impl Default for TransformBlock {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// One matrix inside a [`TransformBlock`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransformSlot {
    Projection,
    View,
    World,
}

impl TransformSlot {
    pub const MATRIX_SIZE: u64 = 64;

    /// Fixed byte offset of the slot inside the block.
    pub const fn offset(self) -> u64 {
        match self {
            Self::Projection => 0,
            Self::View => Self::MATRIX_SIZE,
            Self::World => 2 * Self::MATRIX_SIZE,
        }
    }
}
