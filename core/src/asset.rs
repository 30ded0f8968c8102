//! Asset path classification.

/// Path fragments that name assets built into the host engine rather than
/// files in the project. Such assets cannot be copied or rewritten.
const BUILTIN_MARKERS: &[&str] = &["_builtin_", "default resources"];

/// Whether `path` names a built-in placeholder asset.
pub fn is_builtin_placeholder(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    BUILTIN_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Whether an asset with this backing path can be read and re-saved.
///
/// Assets without a path (created in memory by the host) and built-in
/// placeholders are unsupported.
pub fn is_supported_source(path: Option<&str>) -> bool {
    match path {
        Some(path) => !path.trim().is_empty() && !is_builtin_placeholder(path),
        None => false,
    }
}
