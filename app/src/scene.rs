//! Flat description of the renderers making up a protected asset.

use serde::{Deserialize, Serialize};
use shroud_vfs::{path, AssetStore};

use crate::protect::ProtectError;

/// Suffix of rebound scene manifests written after protection.
pub const PROTECTED_SCENE_SUFFIX: &str = "_Protected";

/// One drawable: a mesh and the materials its submeshes render with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererEntry {
    pub name: String,
    /// Asset path of the mesh, absent for renderers without geometry.
    #[serde(default)]
    pub mesh: Option<String>,
    /// Material asset paths, slot `i` rendering submesh `i`.
    #[serde(default)]
    pub materials: Vec<Option<String>>,
    /// Renderers driven by cloth simulation are left alone.
    #[serde(default)]
    pub cloth: bool,
}

/// Synced parameter space available for the key bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBudget {
    /// Total bits the host can sync.
    pub capacity: usize,
    /// Bits already taken by other parameters.
    pub used: usize,
}

impl ParameterBudget {
    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.used)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneManifest {
    pub name: String,
    #[serde(default)]
    pub renderers: Vec<RendererEntry>,
    #[serde(default, rename = "parameters")]
    pub budget: Option<ParameterBudget>,
}

impl SceneManifest {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn load(store: &dyn AssetStore, path: &str) -> Result<Self, ProtectError> {
        let text = store.read_to_string(path)?;
        Self::from_json(&text).map_err(|source| ProtectError::Manifest {
            path: path.to_owned(),
            source,
        })
    }

    /// Where the rebound copy of this manifest is saved inside `output_dir`.
    pub fn protected_path(&self, output_dir: &str) -> String {
        let file = format!("{}{PROTECTED_SCENE_SUFFIX}.scene.json", self.name.trim());
        if output_dir.is_empty() {
            file
        } else {
            format!("{}/{file}", output_dir.trim_end_matches('/'))
        }
    }
}

/// Output path for an encoded copy of the mesh at `mesh_path`:
/// `<output_dir>/<source dir>/<stem>_Protected.mesh.json`.
///
/// The source directory is kept so meshes sharing a file name in different
/// folders get distinct outputs.
pub fn protected_mesh_path(output_dir: &str, mesh_path: &str) -> String {
    let name = path::file_name(mesh_path);
    let stem = name
        .strip_suffix(".mesh.json")
        .unwrap_or_else(|| path::split_extension(name).0);
    let file = format!("{stem}_Protected.mesh.json");
    [output_dir.trim_matches('/'), path::parent(mesh_path), file.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
