use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shroud_core::key::DEFAULT_KEY_LENGTH;
use shroud_shader::{ShaderCapabilities, ShaderCapability};
use shroud_vfs::{FileSystemProvider, Vfs};

/// Smallest accepted distortion ratio.
pub const MIN_DISTORT_RATIO: f32 = 0.6;
/// Largest accepted distortion ratio, also the default.
pub const MAX_DISTORT_RATIO: f32 = 5.0;

/// Errors raised while loading `shroud.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("protect.key_length must be at least 1")]
    ZeroKeyLength,
}

/// Top-level configuration loaded from `shroud.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShroudConfig {
    #[serde(default)]
    pub protect: ProtectSettings,
    #[serde(default)]
    pub mount: Vec<MountConfig>,
    /// Rule sets registered on top of the built-in ones.
    #[serde(default)]
    pub shader: Vec<ShaderCapability>,
    /// Bit parameter renames, `BitKey3 = "Shade"`.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// The `[protect]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtectSettings {
    pub distort_ratio: f32,
    pub key_length: usize,
    /// Asset directory encoded meshes are saved into.
    pub output_dir: String,
    /// Filesystem path of the JSON audit document.
    pub audit_log: PathBuf,
    pub ignored_materials: Vec<String>,
    /// Materials to protect even when no renderer uses them.
    pub additional_materials: Vec<String>,
    /// Identifier the key record is stored under. Keys are not persisted
    /// without one.
    pub owner_id: Option<String>,
    /// Directory holding one subdirectory per local user profile.
    pub saved_params_root: Option<PathBuf>,
}

impl Default for ProtectSettings {
    fn default() -> Self {
        Self {
            distort_ratio: MAX_DISTORT_RATIO,
            key_length: DEFAULT_KEY_LENGTH,
            output_dir: "Shroud/Generated".into(),
            audit_log: PathBuf::from("shroud-audit.json"),
            ignored_materials: Vec::new(),
            additional_materials: Vec::new(),
            owner_id: None,
            saved_params_root: None,
        }
    }
}

impl ProtectSettings {
    /// The configured ratio, clamped into the accepted range.
    pub fn clamped_distort_ratio(&self) -> f32 {
        let ratio = self.distort_ratio;
        if !(MIN_DISTORT_RATIO..=MAX_DISTORT_RATIO).contains(&ratio) {
            log::warn!(
                "distort_ratio {ratio} outside {MIN_DISTORT_RATIO}..={MAX_DISTORT_RATIO}, clamping"
            );
        }
        if ratio.is_nan() {
            return MAX_DISTORT_RATIO;
        }
        ratio.clamp(MIN_DISTORT_RATIO, MAX_DISTORT_RATIO)
    }
}

/// A single VFS mount point definition.
#[derive(Debug, Clone, Deserialize)]
pub struct MountConfig {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub default: bool,
    /// Only `"filesystem"` is understood.
    #[serde(default = "default_mount_type")]
    pub r#type: String,
}

fn default_mount_type() -> String {
    "filesystem".into()
}

impl ShroudConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Built-in rule sets followed by the configured ones, so a `[[shader]]`
    /// table can override a built-in fragment.
    pub fn capabilities(&self) -> ShaderCapabilities {
        let mut capabilities = ShaderCapabilities::with_builtins();
        capabilities.extend(self.shader.iter().cloned());
        capabilities
    }

    /// Reject settings no protection run can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protect.key_length == 0 {
            return Err(ConfigError::ZeroKeyLength);
        }
        Ok(())
    }
}

/// Load a config from a TOML file.
pub fn load_config(path: &Path) -> Result<ShroudConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    let config = ShroudConfig::from_toml(&content).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Build a [`Vfs`] from the configured mounts.
pub fn build_vfs(config: &ShroudConfig) -> Vfs {
    let mut vfs = Vfs::new();

    for mount in &config.mount {
        match mount.r#type.as_str() {
            "filesystem" => {
                log::info!(
                    "VFS mount: \"{}\" -> filesystem {:?}",
                    mount.name,
                    mount.path
                );
                vfs.mount(&mount.name, FileSystemProvider::new(&mount.path));
            }
            other => {
                log::warn!("Unknown mount type \"{}\" for \"{}\"", other, mount.name);
            }
        }
    }

    if let Some(default_mount) = config.mount.iter().find(|m| m.default) {
        vfs.set_default(&default_mount.name);
    }

    vfs
}

/// Load config, falling back to defaults if the file is missing.
///
/// A file that exists but cannot be read, parsed or validated is an error.
pub fn load_or_default(path: &Path) -> Result<ShroudConfig, ConfigError> {
    match load_config(path) {
        Ok(config) => {
            log::info!(
                "Loaded {} ({} mounts, {} shader rule sets)",
                path.display(),
                config.mount.len(),
                config.shader.len()
            );
            Ok(config)
        }
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("{} not found, using defaults", path.display());
            Ok(ShroudConfig {
                mount: vec![MountConfig {
                    name: "Assets".into(),
                    path: "./Assets".into(),
                    default: true,
                    r#type: default_mount_type(),
                }],
                ..Default::default()
            })
        }
        Err(e) => Err(e),
    }
}
