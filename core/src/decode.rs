//! CPU reference of the runtime reconstruction.
//!
//! The generated shader fragment performs exactly this subtraction on the GPU.

use crate::encoder::{self, OFFSET_A_CHANNEL, OFFSET_B_CHANNEL};
use crate::math::{Vec2, Vec3};
use crate::mesh::Mesh;

/// Undo the displacement of a single vertex.
pub fn decode_position(position: &Vec3, normal: &Vec3, a: &Vec2, b: &Vec2, weights: &[f32]) -> Vec3 {
    position - encoder::displacement(normal, a, b, weights)
}

/// Reconstruct every position of an encoded mesh using the offsets stored in
/// its uv channels.
///
/// Vertices without stored offsets are returned unchanged.
pub fn decode_mesh_positions(mesh: &Mesh, weights: &[f32]) -> Vec<Vec3> {
    let zero = Vec2::zeros();
    mesh.positions
        .iter()
        .enumerate()
        .map(|(v, position)| {
            let normal = mesh.normals.get(v).copied().unwrap_or_else(Vec3::zeros);
            let a = mesh.uv[OFFSET_A_CHANNEL].get(v).unwrap_or(&zero);
            let b = mesh.uv[OFFSET_B_CHANNEL].get(v).unwrap_or(&zero);
            decode_position(position, &normal, a, b, weights)
        })
        .collect()
}
