use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// A single blend shape frame: per-vertex deltas applied at `weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShapeFrame {
    /// Frame weight (0-100 in most authoring tools).
    pub weight: f32,
    /// Position deltas, one per vertex.
    pub delta_positions: Vec<Vec3>,
    /// Normal deltas, one per vertex (may be empty).
    #[serde(default)]
    pub delta_normals: Vec<Vec3>,
    /// Tangent deltas, one per vertex (may be empty).
    #[serde(default)]
    pub delta_tangents: Vec<Vec3>,
}

/// A named blend shape with one or more frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub frames: Vec<BlendShapeFrame>,
}

impl BlendShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: Vec::new(),
        }
    }

    /// Append a frame and return self (builder style).
    pub fn with_frame(mut self, frame: BlendShapeFrame) -> Self {
        self.frames.push(frame);
        self
    }
}
