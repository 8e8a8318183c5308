//! Host-side meshes shared by the chapters.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use primer_engine::layout::{VertexAttribute, VertexLayout};
use primer_engine::Result;
use wgpu::VertexFormat::{Float32x2, Float32x4};

/// Position + color, the layout of the flat 2D chapters.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ColoredVertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl ColoredVertex {
    pub const fn new(x: f32, y: f32, color: [f32; 3]) -> Self {
        Self {
            position: [x, y, 0.0, 1.0],
            color: [color[0], color[1], color[2], 1.0],
        }
    }

    pub fn layout() -> Result<VertexLayout> {
        VertexLayout::per_vertex(
            32,
            &[VertexAttribute::new(0, 0, Float32x4), VertexAttribute::new(1, 16, Float32x4)],
        )
    }
}

pub const TRIANGLE: [ColoredVertex; 3] = [
    ColoredVertex::new(0.0, 0.5, [1.0, 0.0, 0.0]),
    ColoredVertex::new(-0.5, -0.5, [0.0, 1.0, 0.0]),
    ColoredVertex::new(0.5, -0.5, [0.0, 0.0, 1.0]),
];

pub const QUAD: [ColoredVertex; 4] = [
    ColoredVertex::new(-0.5, -0.5, [1.0, 0.0, 0.0]),
    ColoredVertex::new(0.5, -0.5, [0.0, 1.0, 0.0]),
    ColoredVertex::new(0.5, 0.5, [0.0, 0.0, 1.0]),
    ColoredVertex::new(-0.5, 0.5, [1.0, 1.0, 0.0]),
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Cube vertex: position at byte 0, color at 16, uv at 32.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CubeVertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

pub const CUBE_STRIDE: u64 = std::mem::size_of::<CubeVertex>() as u64;

pub const CUBE_POSITION: VertexAttribute = VertexAttribute::new(0, 0, Float32x4);
pub const CUBE_COLOR: VertexAttribute = VertexAttribute::new(1, 16, Float32x4);
pub const CUBE_UV: VertexAttribute = VertexAttribute::new(2, 32, Float32x2);

/// Cube layout exposing only `attributes`; the stride stays [`CUBE_STRIDE`].
pub fn cube_layout(attributes: &[VertexAttribute]) -> Result<VertexLayout> {
    VertexLayout::per_vertex(CUBE_STRIDE, attributes)
}

/// Outward normal, then the two in-face axes with `u × v = normal`.
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

/// Unit cube (corners at ±1), four vertices per face so every face gets the full uv square.
///
/// Triangles wind counter-clockwise seen from outside.
pub fn cube() -> (Vec<CubeVertex>, Vec<u16>) {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, u, v)) in FACES.iter().enumerate() {
        let (normal, u, v) = (Vec3::from(*normal), Vec3::from(*u), Vec3::from(*v));
        let base = (face * 4) as u16;

        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = normal + u * su + v * sv;
            let tint = (p + Vec3::ONE) * 0.5;
            vertices.push(CubeVertex {
                position: p.extend(1.0).to_array(),
                color: tint.extend(1.0).to_array(),
                uv: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
            });
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(v: &CubeVertex) -> Vec3 {
        Vec3::new(v.position[0], v.position[1], v.position[2])
    }

    #[test]
    fn cube_vertex_matches_attribute_offsets() {
        assert_eq!(CUBE_STRIDE, 40);
        assert!(cube_layout(&[CUBE_POSITION, CUBE_COLOR, CUBE_UV]).is_ok());
        assert_eq!(std::mem::size_of::<ColoredVertex>(), 32);
    }

    #[test]
    fn cube_has_four_corners_per_face() {
        let (vertices, indices) = cube();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        for v in &vertices {
            let p = position(v);
            assert_eq!(p.abs().max_element(), 1.0);
            assert!(v.uv.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn cube_triangles_face_outward() {
        let (vertices, indices) = cube();
        for tri in indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| position(&vertices[tri[k] as usize]));
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "triangle {tri:?} winds inward");
        }
    }
}
