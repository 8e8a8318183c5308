//! Time- and index-driven transforms for animated scenes.

use glam::{Mat4, Vec3};

/// Vertical field of view used by [`perspective`]: 72 degrees.
pub const FOV_Y: f32 = 2.0 * std::f32::consts::PI / 5.0;
pub const Z_NEAR: f32 = 1.0;
pub const Z_FAR: f32 = 100.0;

/// Right-handed perspective projection with depth in `0..1`.
pub fn perspective(aspect: f32) -> Mat4 {
    Mat4::perspective_rh(FOV_Y, aspect.max(f32::EPSILON), Z_NEAR, Z_FAR)
}

/// Camera on the +Z axis at `distance`, looking at the origin.
pub fn camera(distance: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -distance))
}

/// Rotation of one radian about an axis that sweeps the XY plane with time.
///
/// Deterministic in `elapsed` (seconds); the same time always yields the same matrix.
pub fn spin(elapsed: f32) -> Mat4 {
    // (sin, cos, 0) is already unit length.
    let axis = Vec3::new(elapsed.sin(), elapsed.cos(), 0.0);
    Mat4::from_axis_angle(axis, 1.0)
}

/// Objects laid out row-major on a centered grid in the XY plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
    /// Distance between neighboring cell centers.
    pub spacing: f32,
}

impl GridLayout {
    pub const fn new(columns: u32, rows: u32, spacing: f32) -> Self {
        Self { columns, rows, spacing }
    }

    pub const fn len(&self) -> u32 {
        self.columns * self.rows
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Center of cell `index`, or `None` past the last cell.
    pub fn position(&self, index: u32) -> Option<Vec3> {
        if index >= self.len() {
            return None;
        }
        let col = (index % self.columns) as f32;
        let row = (index / self.columns) as f32;
        let half_w = (self.columns - 1) as f32 * 0.5;
        let half_h = (self.rows - 1) as f32 * 0.5;
        Some(Vec3::new(
            (col - half_w) * self.spacing,
            (half_h - row) * self.spacing,
            0.0,
        ))
    }

    /// World matrix for object `index`: grid placement, then a spin phased by index.
    pub fn world(&self, index: u32, elapsed: f32) -> Option<Mat4> {
        let at = self.position(index)?;
        Some(Mat4::from_translation(at) * spin(elapsed + index as f32 * 0.25))
    }
}
