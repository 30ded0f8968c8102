//! Mesh data structures.
//!
//! This module provides:
//! - [`IndexFormat`] - Index data format (u16 or u32)
//! - [`Bounds`] - Axis-aligned bounding box
//! - [`SubMesh`] - Triangle list into the shared vertex sequence
//! - [`Mesh`] - The full mesh document

use serde::{Deserialize, Serialize};

use crate::math::{Mat4, Vec2, Vec3, Vec4};

use super::blend::BlendShape;

/// Number of texture coordinate channels a mesh carries.
pub const UV_CHANNELS: usize = 8;

/// Index format of the source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers (max ~4 billion vertices).
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or a zero box for no points.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::new(Vec3::zeros(), Vec3::zeros());
        };
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min = min.inf(p);
            max = max.sup(p);
        }
        Self { min, max }
    }

    /// Difference of the corner magnitudes, `|max| - |min|`.
    ///
    /// This is not the diagonal length. A box centered on the origin yields
    /// zero, and a box whose `min` corner is farther out yields a negative
    /// value.
    pub fn magnitude_spread(&self) -> f32 {
        self.max.norm() - self.min.norm()
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros())
    }
}

/// Skinning influences of a single vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneWeight {
    pub indices: [u32; 4],
    pub weights: [f32; 4],
}

/// An ordered triangle list into the mesh's vertex sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubMesh {
    pub indices: Vec<u32>,
}

impl SubMesh {
    pub fn new(indices: Vec<u32>) -> Self {
        Self { indices }
    }

    /// Number of whole triangles in the list.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the list is a valid triangle list for `vertex_count` vertices.
    pub fn is_well_formed(&self, vertex_count: usize) -> bool {
        self.indices.len() % 3 == 0
            && self
                .indices
                .iter()
                .all(|&index| (index as usize) < vertex_count)
    }
}

/// A mesh document.
///
/// Vertex channels other than `positions` may be empty when the source has no
/// such attribute. When present, a channel has one entry per vertex.
///
/// # Example
///
/// ```
/// use shroud_core::math::Vec3;
/// use shroud_core::mesh::{Mesh, SubMesh};
///
/// let mesh = Mesh::new("Quad")
///     .with_positions(vec![
///         Vec3::new(0.0, 0.0, 0.0),
///         Vec3::new(1.0, 0.0, 0.0),
///         Vec3::new(1.0, 1.0, 0.0),
///     ])
///     .with_submesh(SubMesh::new(vec![0, 1, 2]))
///     .with_computed_bounds();
/// assert_eq!(mesh.vertex_count(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    #[serde(default)]
    pub normals: Vec<Vec3>,
    #[serde(default)]
    pub tangents: Vec<Vec4>,
    #[serde(default)]
    pub colors: Vec<Vec4>,
    #[serde(default)]
    pub bone_weights: Vec<BoneWeight>,
    /// Texture coordinate channels 0 through 7.
    #[serde(default)]
    pub uv: [Vec<Vec2>; UV_CHANNELS],
    #[serde(default)]
    pub submeshes: Vec<SubMesh>,
    #[serde(default)]
    pub bind_poses: Vec<Mat4>,
    #[serde(default)]
    pub index_format: IndexFormat,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default)]
    pub blend_shapes: Vec<BlendShape>,
}

impl Mesh {
    /// Create an empty mesh with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positions: Vec::new(),
            normals: Vec::new(),
            tangents: Vec::new(),
            colors: Vec::new(),
            bone_weights: Vec::new(),
            uv: Default::default(),
            submeshes: Vec::new(),
            bind_poses: Vec::new(),
            index_format: IndexFormat::Uint16,
            bounds: Bounds::default(),
            blend_shapes: Vec::new(),
        }
    }

    pub fn with_positions(mut self, positions: Vec<Vec3>) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_tangents(mut self, tangents: Vec<Vec4>) -> Self {
        self.tangents = tangents;
        self
    }

    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_bone_weights(mut self, weights: Vec<BoneWeight>) -> Self {
        self.bone_weights = weights;
        self
    }

    /// Set texture coordinate channel `channel` (0-based).
    ///
    /// Channels past [`UV_CHANNELS`] are ignored.
    pub fn with_uv(mut self, channel: usize, uv: Vec<Vec2>) -> Self {
        if let Some(slot) = self.uv.get_mut(channel) {
            *slot = uv;
        }
        self
    }

    pub fn with_submesh(mut self, submesh: SubMesh) -> Self {
        self.submeshes.push(submesh);
        self
    }

    pub fn with_bind_poses(mut self, bind_poses: Vec<Mat4>) -> Self {
        self.bind_poses = bind_poses;
        self
    }

    pub fn with_index_format(mut self, format: IndexFormat) -> Self {
        self.index_format = format;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Recompute bounds from the current positions.
    pub fn with_computed_bounds(mut self) -> Self {
        self.bounds = Bounds::from_points(&self.positions);
        self
    }

    pub fn with_blend_shape(mut self, shape: BlendShape) -> Self {
        self.blend_shapes.push(shape);
        self
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether texture coordinate channel `channel` carries data.
    pub fn uses_uv_channel(&self, channel: usize) -> bool {
        self.uv.get(channel).is_some_and(|uv| !uv.is_empty())
    }

    /// Parse a mesh from its JSON document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize the mesh as a pretty JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        Mesh::new("Tri")
            .with_positions(vec![
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 2.0, 0.5),
            ])
            .with_normals(vec![Vec3::z(); 3])
            .with_submesh(SubMesh::new(vec![0, 1, 2]))
            .with_computed_bounds()
    }

    #[test]
    fn computed_bounds() {
        let mesh = triangle();
        assert_eq!(mesh.bounds.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(mesh.bounds.max, Vec3::new(1.0, 2.0, 0.5));
    }

    #[test]
    fn magnitude_spread_is_not_diagonal() {
        let bounds = Bounds::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 4.0, 0.0));
        assert_eq!(bounds.magnitude_spread(), 5.0);

        let centered = Bounds::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(centered.magnitude_spread(), 0.0);
    }

    #[test]
    fn submesh_well_formed() {
        assert!(SubMesh::new(vec![0, 1, 2]).is_well_formed(3));
        assert!(!SubMesh::new(vec![0, 1]).is_well_formed(3));
        assert!(!SubMesh::new(vec![0, 1, 3]).is_well_formed(3));
        assert_eq!(SubMesh::new(vec![0, 1, 2, 2, 1, 0]).triangle_count(), 2);
    }

    #[test]
    fn uv_channel_usage() {
        let mesh = triangle().with_uv(6, vec![Vec2::zeros(); 3]);
        assert!(mesh.uses_uv_channel(6));
        assert!(!mesh.uses_uv_channel(0));
        assert!(!mesh.uses_uv_channel(42));
    }

    #[test]
    fn json_defaults_for_missing_channels() {
        let mesh = Mesh::from_json(
            r#"{ "name": "Bare", "positions": [[0.0, 0.0, 0.0]], "submeshes": [{ "indices": [] }] }"#,
        )
        .unwrap();
        assert_eq!(mesh.vertex_count(), 1);
        assert!(mesh.normals.is_empty());
        assert_eq!(mesh.index_format, IndexFormat::Uint16);
        assert!(mesh.uv.iter().all(Vec::is_empty));
    }

    #[test]
    fn json_document_survives_save_and_load() {
        let mesh = triangle()
            .with_index_format(IndexFormat::Uint32)
            .with_bind_poses(vec![Mat4::identity()]);
        let loaded = Mesh::from_json(&mesh.to_json().unwrap()).unwrap();
        assert_eq!(loaded, mesh);
    }
}
