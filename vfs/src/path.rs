//! Forward-slash path helpers shared by every asset store.

use crate::VfsError;

/// Canonical form of an asset path: forward slashes only, no empty or `.`
/// segments, and every `..` folded into its parent.
///
/// Windows-style include paths (`Shaders\Toon.shader`) are accepted.
/// Fails with [`VfsError::InvalidPath`] when nothing is left or a `..`
/// would leave the store.
pub fn normalize(path: &str) -> Result<String, VfsError> {
    let unified = path.replace('\\', "/");
    let mut kept: Vec<&str> = Vec::new();

    for segment in unified.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment != ".." {
            kept.push(segment);
        } else if kept.pop().is_none() {
            return Err(VfsError::InvalidPath(format!("{path}: escapes the store root")));
        }
    }

    if kept.is_empty() {
        return Err(VfsError::InvalidPath("empty path".into()));
    }
    Ok(kept.join("/"))
}

/// Resolve `relative` against the directory `dir` and normalize the result.
///
/// An empty `dir` means the store root.
pub fn join(dir: &str, relative: &str) -> Result<String, VfsError> {
    if dir.is_empty() {
        normalize(relative)
    } else {
        normalize(&format!("{dir}/{relative}"))
    }
}

/// Directory part of a normalized path, or `""` for a top-level file.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Final segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Split a file name into stem and extension (the extension keeps its dot).
///
/// `"Toon.shader"` gives `("Toon", ".shader")`; a name without a dot, or
/// whose only dot is the first character, has an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Insert `suffix` between the stem and the extension of the file name.
///
/// ```
/// use shroud_vfs::path::with_stem_suffix;
///
/// assert_eq!(
///     with_stem_suffix("Shaders/Toon.shader", "_Protected"),
///     "Shaders/Toon_Protected.shader"
/// );
/// ```
pub fn with_stem_suffix(path: &str, suffix: &str) -> String {
    let dir = parent(path);
    let (stem, ext) = split_extension(file_name(path));
    if dir.is_empty() {
        format!("{stem}{suffix}{ext}")
    } else {
        format!("{dir}/{stem}{suffix}{ext}")
    }
}

/// Mount name and the path inside that mount.
pub(crate) fn split_source(path: &str) -> (&str, &str) {
    match path.find('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => (path, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_paths_pass_through() {
        assert_eq!(normalize("Shaders/Toon.shader").unwrap(), "Shaders/Toon.shader");
    }

    #[test]
    fn separators_are_cleaned() {
        assert_eq!(normalize("/Shaders/").unwrap(), "Shaders");
        assert_eq!(normalize("Shaders//./Toon.shader").unwrap(), "Shaders/Toon.shader");
        assert_eq!(
            normalize("Shaders\\Core\\Lighting.cginc").unwrap(),
            "Shaders/Core/Lighting.cginc"
        );
    }

    #[test]
    fn parent_segments_fold() {
        assert_eq!(
            normalize("Shaders/Core/../Common.cginc").unwrap(),
            "Shaders/Common.cginc"
        );
        assert!(matches!(
            normalize("Shaders/../../secret.txt"),
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[test]
    fn nothing_left_is_invalid() {
        for path in ["", "///", "././."] {
            assert!(normalize(path).is_err(), "{path:?}");
        }
    }

    #[test]
    fn include_resolves_against_shader_folder() {
        assert_eq!(
            join("Shaders/Toon", "../Common/Light.cginc").unwrap(),
            "Shaders/Common/Light.cginc"
        );
        assert_eq!(join("", "Light.cginc").unwrap(), "Light.cginc");
    }

    #[test]
    fn folder_and_name_of_asset() {
        assert_eq!(parent("Shaders/Toon.shader"), "Shaders");
        assert_eq!(parent("Toon.shader"), "");
        assert_eq!(file_name("Shaders/Toon.shader"), "Toon.shader");
        assert_eq!(file_name("Toon.shader"), "Toon.shader");
    }

    #[test]
    fn extension_split() {
        assert_eq!(split_extension("Toon.shader"), ("Toon", ".shader"));
        assert_eq!(split_extension("Body.mesh.json"), ("Body.mesh", ".json"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[test]
    fn protected_include_name() {
        assert_eq!(
            with_stem_suffix("Light.cginc", "_Protected"),
            "Light_Protected.cginc"
        );
    }

    #[test]
    fn mount_name_is_first_segment() {
        assert_eq!(
            split_source("Assets/Shaders/Toon.shader"),
            ("Assets", "Shaders/Toon.shader")
        );
        assert_eq!(split_source("Assets"), ("Assets", ""));
    }
}
