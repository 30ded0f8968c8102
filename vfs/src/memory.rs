use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::VfsError;
use crate::provider::AssetStore;

/// In-memory asset store for tests and generated assets.
///
/// Clones share the same storage, so a handle kept by a test still observes
/// the files written after the provider was mounted in a [`Vfs`](crate::Vfs).
///
/// Directories are implicit: they exist whenever a file path contains
/// that directory prefix.
///
/// # Example
///
/// ```
/// use shroud_vfs::{AssetStore, MemoryProvider};
///
/// let mem = MemoryProvider::new();
/// mem.insert("Shaders/Toon.shader", b"Shader \"Toon\" {}".to_vec());
/// assert!(mem.exists("Shaders/Toon.shader").unwrap());
/// ```
#[derive(Clone, Default)]
pub struct MemoryProvider {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file at the given path, overwriting any existing file.
    ///
    /// The path should use forward slashes and have no leading slash.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), data.into());
    }

    /// Get a file as text. Convenience for tests.
    pub fn text(&self, path: &str) -> Option<String> {
        self.files
            .read()
            .get(path)
            .and_then(|data| String::from_utf8(data.clone()).ok())
    }

    /// All stored paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }
}

impl AssetStore for MemoryProvider {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(path.to_owned()))
    }

    fn exists(&self, path: &str) -> Result<bool, VfsError> {
        Ok(self.files.read().contains_key(path))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, VfsError> {
        let map = self.files.read();
        let mut children = BTreeSet::new();

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        for key in map.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                // Immediate child name (first segment)
                let child = match rest.find('/') {
                    Some(pos) => &rest[..pos],
                    None => rest,
                };
                if !child.is_empty() {
                    children.insert(child.to_owned());
                }
            }
        }

        Ok(children.into_iter().collect())
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn write(&self, path: &str, data: Vec<u8>) -> Result<(), VfsError> {
        self.files.write().insert(path.to_owned(), data);
        Ok(())
    }
}
