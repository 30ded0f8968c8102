use shroud_vfs::VfsError;
use thiserror::Error;

/// Errors that abort patching of one shader program.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The shader cannot be protected (no declaration, placeholder asset).
    #[error("unsupported shader asset {path}: {reason}")]
    UnsupportedAsset { path: String, reason: String },
    /// Reading or writing the root program failed.
    #[error("asset store error: {0}")]
    Store(#[from] VfsError),
    /// The key schedule and the parameter names disagree in length.
    #[error("{names} bit names for a schedule of {bits} bits")]
    NameCountMismatch { names: usize, bits: usize },
}

impl PatchError {
    pub(crate) fn unsupported(path: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedAsset {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}
