//! Materials and the shader references they carry.
//!
//! A [`Material`] points at exactly one shader program by asset path and
//! declared name, and carries a string tag map. Renderers reference materials
//! through [`MaterialSlot`]s, one per submesh.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Suffix appended to the declared name of a patched shader program.
pub const PROTECTED_SHADER_SUFFIX: &str = "/Protected";

/// Override tag consulted by hosts when a shader cannot run.
pub const FALLBACK_TAG: &str = "Fallback";

/// Fallback tag value for protected materials: render nothing rather than the
/// distorted mesh with a stock shader.
pub const FALLBACK_HIDDEN: &str = "Hidden";

/// Reference to a shader program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderRef {
    /// Asset path of the shader source.
    pub path: String,
    /// Declared program name (`Shader "name"`).
    pub name: String,
}

impl ShaderRef {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Whether this references a program produced by the shader patcher.
    pub fn is_protected(&self) -> bool {
        self.name.ends_with(PROTECTED_SHADER_SUFFIX)
    }
}

/// A material document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub shader: ShaderRef,
    /// Override tags (`RenderType`, `Fallback`, ...).
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Material {
    pub fn new(name: impl Into<String>, shader: ShaderRef) -> Self {
        Self {
            name: name.into(),
            shader,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether the material already renders through a protected program.
    pub fn is_protected(&self) -> bool {
        self.shader.is_protected()
    }

    /// Swap the shader for its protected variant and hide the material when
    /// the host falls back.
    pub fn bind_protected(&mut self, shader: ShaderRef) {
        self.shader = shader;
        self.tags
            .insert(FALLBACK_TAG.to_owned(), FALLBACK_HIDDEN.to_owned());
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A renderer's reference to a material: the material's asset path plus the
/// loaded document.
#[derive(Debug, Clone, Copy)]
pub struct MaterialSlot<'a> {
    pub path: &'a str,
    pub material: &'a Material,
}

impl<'a> MaterialSlot<'a> {
    pub fn new(path: &'a str, material: &'a Material) -> Self {
        Self { path, material }
    }
}
