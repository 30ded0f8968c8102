use shroud_core::encoder::EncodeReport;
use shroud_core::material::ShaderRef;

/// What happened to the mesh of one renderer.
#[derive(Debug, Clone)]
pub struct MeshOutcome {
    pub renderer: String,
    pub mesh: Option<String>,
    pub status: MeshStatus,
}

#[derive(Debug, Clone)]
pub enum MeshStatus {
    /// Encoded and saved to `output`.
    Encoded { output: String, report: EncodeReport },
    /// Another renderer already encoded the same mesh.
    Reused { output: String },
    Skipped(String),
    Failed(String),
}

/// What happened to one material.
#[derive(Debug, Clone)]
pub struct ShaderOutcome {
    pub material: String,
    pub status: ShaderStatus,
}

#[derive(Debug, Clone)]
pub enum ShaderStatus {
    /// The material now renders with `shader`.
    Protected {
        shader: ShaderRef,
        rule_misses: usize,
        warnings: Vec<String>,
    },
    /// Rebound to a program another material already patched.
    Reused { shader: ShaderRef },
    AlreadyProtected,
    Skipped(String),
    Failed(String),
}

/// Everything a protection run produced.
#[derive(Debug, Clone, Default)]
pub struct ProtectReport {
    /// Names of the bit parameters, in key order.
    pub bit_names: Vec<String>,
    /// The generated key, in the same order.
    pub bits: Vec<bool>,
    pub meshes: Vec<MeshOutcome>,
    pub shaders: Vec<ShaderOutcome>,
    /// Path of the rebound scene manifest, when it could be saved.
    pub scene: Option<String>,
    /// Key records written through the key stores.
    pub keys_written: usize,
}

impl ProtectReport {
    pub fn key_length(&self) -> usize {
        self.bit_names.len()
    }

    pub fn encoded_meshes(&self) -> usize {
        self.meshes
            .iter()
            .filter(|m| matches!(m.status, MeshStatus::Encoded { .. }))
            .count()
    }

    pub fn protected_materials(&self) -> usize {
        self.shaders
            .iter()
            .filter(|s| {
                matches!(
                    s.status,
                    ShaderStatus::Protected { .. } | ShaderStatus::Reused { .. }
                )
            })
            .count()
    }

    pub fn failures(&self) -> usize {
        let meshes = self
            .meshes
            .iter()
            .filter(|m| matches!(m.status, MeshStatus::Failed(_)))
            .count();
        let shaders = self
            .shaders
            .iter()
            .filter(|s| matches!(s.status, ShaderStatus::Failed(_)))
            .count();
        meshes + shaders
    }

    /// One line suitable for the end of a run.
    pub fn summary(&self) -> String {
        format!(
            "{}-bit key, {} meshes encoded, {} materials protected, {} failures",
            self.key_length(),
            self.encoded_meshes(),
            self.protected_materials(),
            self.failures()
        )
    }
}
