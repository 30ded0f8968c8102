use crate::VfsError;

/// Repository the protection pipeline loads meshes, materials and shaders
/// from and saves its generated artifacts into.
///
/// Only the lookups are mandatory. A store that never overrides the
/// mutating methods is read-only and answers them with [`VfsError::ReadOnly`].
///
/// Paths reaching a store are already in [`crate::path::normalize`] form;
/// the [`Vfs`](crate::Vfs) router normalizes on entry.
pub trait AssetStore {
    /// Raw bytes of the asset at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError>;

    /// Whether an asset is stored at `path`.
    fn exists(&self, path: &str) -> Result<bool, VfsError>;

    /// Sorted names (not paths) directly under `path`; empty when the folder
    /// does not exist.
    fn list_dir(&self, path: &str) -> Result<Vec<String>, VfsError>;

    /// Whether `path` is a folder. Stores with implicit folders get this
    /// from `list_dir`.
    fn is_dir(&self, path: &str) -> Result<bool, VfsError> {
        Ok(!self.list_dir(path)?.is_empty())
    }

    /// Shader, material and manifest sources are UTF-8.
    fn read_to_string(&self, path: &str) -> Result<String, VfsError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|_| VfsError::InvalidText(path.to_owned()))
    }

    /// True unless the store accepts generated assets.
    fn is_read_only(&self) -> bool {
        true
    }

    /// Create or replace the asset at `path`.
    fn write(&self, _path: &str, _data: Vec<u8>) -> Result<(), VfsError> {
        Err(VfsError::ReadOnly)
    }

    /// Ask the store to pick up files written behind its back.
    ///
    /// Stores without an index (plain directories, memory) do nothing.
    fn refresh_index(&self) -> Result<(), VfsError> {
        Ok(())
    }
}
