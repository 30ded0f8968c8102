use thiserror::Error;

/// Failure reported by an [`AssetStore`](crate::AssetStore).
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
    /// Empty, or climbs above the store root.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A text asset that is not UTF-8.
    #[error("file is not valid UTF-8: {0}")]
    InvalidText(String),
    /// First path segment names no mount and there is no default mount.
    #[error("no such source: {0}")]
    NoSuchSource(String),
    #[error("provider is read-only")]
    ReadOnly,
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::Io(err),
        }
    }
}
