//! Keyed vertex encoder.
//!
//! Every vertex that renders through a protected material is pushed along its
//! normal by a key-dependent amount. Two random 2D offsets are drawn per
//! vertex and stored in texture-coordinate channels 6 and 7 of the output so
//! the decode fragment can subtract the same displacement at runtime:
//!
//! ```text
//! displacement = normal * Σ component(i) * weight[i]
//! component(i) = (i < len/2 ? offsetA : offsetB).(i even ? x : y)
//! ```
//!
//! Everything else about the mesh is cloned verbatim.

use std::collections::BTreeSet;

use rand::rngs::ThreadRng;
use rand::Rng;
use thiserror::Error;

use crate::asset;
use crate::material::MaterialSlot;
use crate::math::{self, Vec2, Vec3};
use crate::mesh::{Mesh, SubMesh};

/// Channel that receives offset A.
pub const OFFSET_A_CHANNEL: usize = 6;
/// Channel that receives offset B.
pub const OFFSET_B_CHANNEL: usize = 7;

/// Errors that abort encoding of a whole mesh.
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    /// The mesh has no backing asset or names a built-in placeholder.
    #[error("unsupported mesh source: {0}")]
    UnsupportedSource(String),
    /// The normal channel does not have one entry per vertex.
    #[error("mesh '{mesh}' has {normals} normals for {vertices} vertices")]
    NormalCountMismatch {
        mesh: String,
        normals: usize,
        vertices: usize,
    },
    /// Distortion ratio must be a positive finite number.
    #[error("invalid distortion ratio {0}")]
    InvalidRatio(f32),
}

/// Source of the per-vertex random offsets.
pub trait OffsetSampler {
    /// Draw a 2D vector with both components in `[low, high]`.
    ///
    /// Callers guarantee `low <= high`.
    fn sample(&mut self, low: f32, high: f32) -> Vec2;
}

/// [`OffsetSampler`] backed by a `rand` generator.
pub struct RandomOffsets<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomOffsets<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomOffsets<ThreadRng> {
    /// Sampler drawing from the thread-local generator.
    pub fn thread_local() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: Rng> OffsetSampler for RandomOffsets<R> {
    fn sample(&mut self, low: f32, high: f32) -> Vec2 {
        if low >= high {
            return Vec2::new(low, low);
        }
        Vec2::new(
            self.rng.gen_range(low..=high),
            self.rng.gen_range(low..=high),
        )
    }
}

/// Total displacement for one vertex.
///
/// The first `weights.len() / 2` weights pair with offset `a`, the rest with
/// offset `b`. Step `i` reads `x` when `i` is even and `y` when `i` is odd,
/// continuing across the two halves.
pub fn displacement(normal: &Vec3, a: &Vec2, b: &Vec2, weights: &[f32]) -> Vec3 {
    let half = weights.len() / 2;
    let mut amount = 0.0f32;
    for (i, weight) in weights.iter().enumerate() {
        let offset = if i < half { a } else { b };
        amount += math::parity_component(offset, i) * weight;
    }
    normal * amount
}

/// Inputs of one encoding run.
pub struct EncodeInput<'a> {
    pub mesh: &'a Mesh,
    /// Asset path the mesh was loaded from.
    pub source_path: Option<&'a str>,
    /// Material slots of the renderer, slot `i` renders submesh `i`.
    pub slots: &'a [Option<MaterialSlot<'a>>],
    /// Derived key weights.
    pub weights: &'a [f32],
    /// Asset paths of materials that must never be displaced.
    pub ignored: &'a BTreeSet<String>,
}

/// Non-fatal anomalies and counters collected while encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeReport {
    /// Vertices moved along their normal.
    pub displaced: usize,
    /// Vertices left in place because their material is not protected.
    pub skipped: usize,
    /// Vertices referenced by no submesh.
    pub orphan_vertices: Vec<usize>,
    /// `(submesh, index)` pairs pointing past the vertex range.
    pub out_of_range: Vec<(usize, u32)>,
    /// Submeshes rendered by the last slot because the renderer has fewer slots.
    pub clamped_submeshes: Vec<usize>,
    /// Submeshes transferred as empty lists.
    pub malformed_submeshes: Vec<usize>,
    /// Offset channels that held data in the source and were overwritten.
    pub overwritten_uv_channels: Vec<usize>,
}

impl EncodeReport {
    /// Whether anything unusual was recorded.
    pub fn has_anomalies(&self) -> bool {
        !(self.orphan_vertices.is_empty()
            && self.out_of_range.is_empty()
            && self.clamped_submeshes.is_empty()
            && self.malformed_submeshes.is_empty()
            && self.overwritten_uv_channels.is_empty())
    }
}

/// Result of a successful encoding run.
#[derive(Debug, Clone)]
pub struct EncodedMesh {
    pub mesh: Mesh,
    pub report: EncodeReport,
}

/// Keyed vertex encoder.
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use shroud_core::encoder::{EncodeInput, RandomOffsets, VertexEncoder};
/// use shroud_core::material::{Material, MaterialSlot, ShaderRef};
/// use shroud_core::math::Vec3;
/// use shroud_core::mesh::{Mesh, SubMesh};
///
/// let mesh = Mesh::new("Tri")
///     .with_positions(vec![Vec3::zeros(), Vec3::x(), Vec3::y()])
///     .with_normals(vec![Vec3::z(); 3])
///     .with_submesh(SubMesh::new(vec![0, 1, 2]))
///     .with_computed_bounds();
/// let skin = Material::new("Skin", ShaderRef::new("Toon_Protected.shader", "Toon/Protected"));
/// let slots = [Some(MaterialSlot::new("Skin.mat.json", &skin))];
///
/// let mut encoder = VertexEncoder::new(1.0, RandomOffsets::thread_local()).unwrap();
/// let encoded = encoder
///     .encode(&EncodeInput {
///         mesh: &mesh,
///         source_path: Some("Tri.mesh.json"),
///         slots: &slots,
///         weights: &[0.5, -0.5],
///         ignored: &BTreeSet::new(),
///     })
///     .unwrap();
/// assert_eq!(encoded.report.displaced, 3);
/// ```
pub struct VertexEncoder<S> {
    distort_ratio: f32,
    sampler: S,
}

impl<S: OffsetSampler> VertexEncoder<S> {
    pub fn new(distort_ratio: f32, sampler: S) -> Result<Self, EncodeError> {
        if !distort_ratio.is_finite() || distort_ratio <= 0.0 {
            return Err(EncodeError::InvalidRatio(distort_ratio));
        }
        Ok(Self {
            distort_ratio,
            sampler,
        })
    }

    pub fn distort_ratio(&self) -> f32 {
        self.distort_ratio
    }

    /// Encode one mesh for one renderer.
    pub fn encode(&mut self, input: &EncodeInput<'_>) -> Result<EncodedMesh, EncodeError> {
        let mesh = input.mesh;
        if !asset::is_supported_source(input.source_path) {
            return Err(EncodeError::UnsupportedSource(
                input.source_path.unwrap_or(&mesh.name).to_owned(),
            ));
        }

        let vertex_count = mesh.vertex_count();
        if mesh.normals.len() != vertex_count {
            return Err(EncodeError::NormalCountMismatch {
                mesh: mesh.name.clone(),
                normals: mesh.normals.len(),
                vertices: vertex_count,
            });
        }

        let mut report = EncodeReport::default();
        let owners = owning_submeshes(mesh, &mut report);
        let eligible = eligible_submeshes(mesh.submeshes.len(), input, &mut report);

        let spread = mesh.bounds.magnitude_spread();
        let (low, high) = math::ordered(
            self.distort_ratio * -spread,
            self.distort_ratio * -spread / 2.0,
        );

        let mut positions = mesh.positions.clone();
        let mut offsets_a = vec![Vec2::zeros(); vertex_count];
        let mut offsets_b = vec![Vec2::zeros(); vertex_count];

        for (v, owner) in owners.iter().enumerate() {
            let Some(submesh) = *owner else {
                report.orphan_vertices.push(v);
                continue;
            };
            if !eligible[submesh] {
                report.skipped += 1;
                continue;
            }

            let a = self.sampler.sample(low, high);
            let b = self.sampler.sample(low, high);
            positions[v] += displacement(&mesh.normals[v], &a, &b, input.weights);
            offsets_a[v] = a;
            offsets_b[v] = b;
            report.displaced += 1;
        }

        for channel in [OFFSET_A_CHANNEL, OFFSET_B_CHANNEL] {
            if mesh.uses_uv_channel(channel) {
                log::warn!(
                    "mesh '{}' already uses uv channel {channel}; it will be overwritten",
                    mesh.name
                );
                report.overwritten_uv_channels.push(channel);
            }
        }

        let mut encoded = mesh.clone();
        encoded.positions = positions;
        encoded.uv[OFFSET_A_CHANNEL] = offsets_a;
        encoded.uv[OFFSET_B_CHANNEL] = offsets_b;
        encoded.submeshes = transfer_submeshes(mesh, &mut report);

        log::info!(
            "encoded mesh '{}': {} displaced, {} skipped",
            mesh.name,
            report.displaced,
            report.skipped
        );

        Ok(EncodedMesh {
            mesh: encoded,
            report,
        })
    }
}

/// First submesh (in order) referencing each vertex.
fn owning_submeshes(mesh: &Mesh, report: &mut EncodeReport) -> Vec<Option<usize>> {
    let vertex_count = mesh.vertex_count();
    let mut owners = vec![None; vertex_count];
    for (s, submesh) in mesh.submeshes.iter().enumerate() {
        for &index in &submesh.indices {
            match owners.get_mut(index as usize) {
                Some(owner) => {
                    if owner.is_none() {
                        *owner = Some(s);
                    }
                }
                None => report.out_of_range.push((s, index)),
            }
        }
    }
    owners
}

/// Whether each submesh renders through a protected, non-ignored material.
fn eligible_submeshes(
    submesh_count: usize,
    input: &EncodeInput<'_>,
    report: &mut EncodeReport,
) -> Vec<bool> {
    (0..submesh_count)
        .map(|s| {
            if input.slots.is_empty() {
                return false;
            }
            let slot_index = if s >= input.slots.len() {
                report.clamped_submeshes.push(s);
                input.slots.len() - 1
            } else {
                s
            };
            match input.slots[slot_index] {
                Some(slot) => {
                    !input.ignored.contains(slot.path) && slot.material.is_protected()
                }
                None => false,
            }
        })
        .collect()
}

/// Copy triangle lists, replacing malformed ones with empty lists.
fn transfer_submeshes(mesh: &Mesh, report: &mut EncodeReport) -> Vec<SubMesh> {
    let vertex_count = mesh.vertex_count();
    mesh.submeshes
        .iter()
        .enumerate()
        .map(|(s, submesh)| {
            if submesh.is_well_formed(vertex_count) {
                submesh.clone()
            } else {
                log::warn!(
                    "mesh '{}': submesh {s} is not a valid triangle list, transferring it empty",
                    mesh.name
                );
                report.malformed_submeshes.push(s);
                SubMesh::default()
            }
        })
        .collect()
}
