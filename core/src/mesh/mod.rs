//! Serializable mesh document.
//!
//! This module provides:
//!
//! - [`Mesh`] - vertex channels, submeshes, bind poses and bounds
//! - [`SubMesh`] - an ordered triangle index list
//! - [`BlendShape`] / [`BlendShapeFrame`] - per-vertex morph deltas
//! - [`IndexFormat`] - index width of the source asset
//!
//! Meshes are stored in the asset store as JSON documents.

mod blend;
mod data;

pub use blend::{BlendShape, BlendShapeFrame};
pub use data::{BoneWeight, Bounds, IndexFormat, Mesh, SubMesh, UV_CHANNELS};
