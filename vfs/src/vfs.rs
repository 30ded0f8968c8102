use std::collections::HashMap;

use crate::error::VfsError;
use crate::path;
use crate::provider::AssetStore;

/// Asset store that routes paths to mounted providers.
///
/// Paths are structured as `"source_name/rest/of/path"`. The first path
/// segment selects the provider. If no source name matches, the default
/// source (if set) is tried with the full path.
///
/// `Vfs` itself implements [`AssetStore`], so the pipeline never needs to
/// know whether it talks to a single provider or a set of mounts.
///
/// # Example
///
/// ```
/// use shroud_vfs::{AssetStore, MemoryProvider, Vfs};
///
/// let generated = MemoryProvider::new();
/// generated.insert("Body.mesh.json", b"{}".to_vec());
///
/// let mut vfs = Vfs::new();
/// vfs.mount("Generated", generated);
/// vfs.set_default("Generated");
///
/// assert!(vfs.exists("Generated/Body.mesh.json").unwrap());
/// // With the default source, the mount name can be omitted:
/// assert!(vfs.exists("Body.mesh.json").unwrap());
/// ```
#[derive(Default)]
pub struct Vfs {
    sources: HashMap<String, Box<dyn AssetStore>>,
    default_source: Option<String>,
}

impl Vfs {
    /// Create an empty VFS with no mounted sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a provider under the given source name.
    ///
    /// Replaces any previously mounted provider with the same name.
    pub fn mount(&mut self, name: impl Into<String>, provider: impl AssetStore + 'static) {
        let name = name.into();
        log::debug!("mounting asset source '{name}'");
        self.sources.insert(name, Box::new(provider));
    }

    /// Set the default source name used when a path does not match any mount.
    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_source = Some(name.into());
    }

    /// Names of all mounted sources, sorted.
    pub fn sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a raw path to a provider reference and the path within that provider.
    fn resolve(&self, raw_path: &str) -> Result<(&dyn AssetStore, String), VfsError> {
        let normalized = path::normalize(raw_path)?;
        let (source, rest) = path::split_source(&normalized);

        // Try matching the first segment as a source name
        if let Some(provider) = self.sources.get(source) {
            return Ok((provider.as_ref(), rest.to_owned()));
        }

        // Fall back to default source with the full path
        let fallback = self
            .default_source
            .as_ref()
            .and_then(|name| self.sources.get(name));
        match fallback {
            Some(provider) => Ok((provider.as_ref(), normalized)),
            None => Err(VfsError::NoSuchSource(source.to_owned())),
        }
    }
}

impl AssetStore for Vfs {
    fn read(&self, raw_path: &str) -> Result<Vec<u8>, VfsError> {
        let (provider, resolved) = self.resolve(raw_path)?;
        provider.read(&resolved)
    }

    fn exists(&self, raw_path: &str) -> Result<bool, VfsError> {
        let (provider, resolved) = self.resolve(raw_path)?;
        provider.exists(&resolved)
    }

    fn list_dir(&self, raw_path: &str) -> Result<Vec<String>, VfsError> {
        let (provider, resolved) = self.resolve(raw_path)?;
        provider.list_dir(&resolved)
    }

    fn is_dir(&self, raw_path: &str) -> Result<bool, VfsError> {
        let (provider, resolved) = self.resolve(raw_path)?;
        provider.is_dir(&resolved)
    }

    /// A router is writable as long as any mount is; individual writes
    /// still fail with [`VfsError::ReadOnly`] on read-only mounts.
    fn is_read_only(&self) -> bool {
        self.sources.values().all(|p| p.is_read_only())
    }

    fn write(&self, raw_path: &str, data: Vec<u8>) -> Result<(), VfsError> {
        let (provider, resolved) = self.resolve(raw_path)?;
        provider.write(&resolved, data)
    }

    fn refresh_index(&self) -> Result<(), VfsError> {
        for provider in self.sources.values() {
            provider.refresh_index()?;
        }
        Ok(())
    }
}
