use std::path::PathBuf;

use crate::error::VfsError;
use crate::provider::AssetStore;

/// Asset store backed by a directory on disk.
///
/// The root path is joined with the asset path to form the actual filesystem
/// path. Paths arrive normalized, so `..` can never climb above `root`.
///
/// # Example
///
/// ```no_run
/// use shroud_vfs::{FileSystemProvider, Vfs};
///
/// let mut vfs = Vfs::new();
/// vfs.mount("Assets", FileSystemProvider::new("./Assets"));
/// ```
pub struct FileSystemProvider {
    root: PathBuf,
}

impl FileSystemProvider {
    /// Store over `root`, which is only touched on first access.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl AssetStore for FileSystemProvider {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        std::fs::read(self.resolve(path)).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound(path.to_owned()),
            _ => VfsError::Io(err),
        })
    }

    fn exists(&self, path: &str) -> Result<bool, VfsError> {
        Ok(self.resolve(path).exists())
    }

    fn is_dir(&self, path: &str) -> Result<bool, VfsError> {
        Ok(self.resolve(path).is_dir())
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, VfsError> {
        let full_path = self.resolve(path);
        if !full_path.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(full_path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_owned());
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn write(&self, path: &str, data: Vec<u8>) -> Result<(), VfsError> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        log::debug!("writing {} bytes to {}", data.len(), full_path.display());
        std::fs::write(full_path, data)?;
        Ok(())
    }
}
