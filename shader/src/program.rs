use shroud_core::material::{ShaderRef, PROTECTED_SHADER_SUFFIX};
use shroud_vfs::AssetStore;

use crate::error::PatchError;

/// First line of every file the patcher writes.
pub const SENTINEL: &str = "// shroud: protected";

const DECLARATION: &str = "Shader \"";

/// A shader program loaded from the asset store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    pub path: String,
    pub source: String,
}

impl ShaderProgram {
    pub fn load(store: &dyn AssetStore, path: &str) -> Result<Self, PatchError> {
        Ok(Self {
            path: path.to_owned(),
            source: store.read_to_string(path)?,
        })
    }

    /// Declared program name, the text of the first `Shader "..."`.
    pub fn declared_name(&self) -> Option<&str> {
        declared_name(&self.source)
    }

    pub fn is_patched(&self) -> bool {
        is_patched(&self.source)
    }

    /// Reference to this program by path and declared name.
    pub fn shader_ref(&self) -> Option<ShaderRef> {
        self.declared_name()
            .map(|name| ShaderRef::new(self.path.clone(), name))
    }
}

pub(crate) fn declared_name(source: &str) -> Option<&str> {
    let start = source.find(DECLARATION)? + DECLARATION.len();
    let len = source[start..].find('"')?;
    Some(&source[start..start + len])
}

pub(crate) fn is_patched(source: &str) -> bool {
    source
        .trim_start_matches('\u{feff}')
        .lines()
        .next()
        .is_some_and(|line| line.trim_end() == SENTINEL)
}

/// Name of the protected variant of program `name`.
pub(crate) fn protected_name(name: &str) -> String {
    format!("{name}{PROTECTED_SHADER_SUFFIX}")
}

/// Replace every `Shader "name"` declaration with the protected name.
pub(crate) fn rename_declaration(source: &str, name: &str) -> String {
    source.replace(
        &format!("{DECLARATION}{name}\""),
        &format!("{DECLARATION}{}\"", protected_name(name)),
    )
}

/// Prefix `body` with the sentinel line.
pub(crate) fn with_sentinel(body: &str) -> String {
    format!("{SENTINEL}\n{body}")
}
