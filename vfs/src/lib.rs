//! Asset store abstraction for Shroud.
//!
//! Provides a unified, synchronous API for reading and writing mesh, material
//! and shader assets through the [`AssetStore`] trait and the [`Vfs`] router.
//!
//! All operations block the calling thread. The protection pipeline runs one
//! author-invoked operation at a time, so there is no need for futures here.
//!
//! # Providers
//!
//! - [`MemoryProvider`]: in-memory storage for tests and generated assets (read-write)
//! - [`FileSystemProvider`]: native filesystem access (read-write)
//!
//! Custom providers can implement the [`AssetStore`] trait for packed
//! archives or a host editor's asset database.
//!
//! # Paths
//!
//! Paths are forward-slash strings. Every provider receives paths already
//! normalized by [`path::normalize`]: no leading or trailing slash, no `.`
//! segments, `..` collapsed against the preceding segment.

mod error;
#[cfg(feature = "filesystem")]
mod filesystem;
mod memory;
pub mod path;
mod provider;
mod vfs;

pub use error::VfsError;
#[cfg(feature = "filesystem")]
pub use filesystem::FileSystemProvider;
pub use memory::MemoryProvider;
pub use provider::AssetStore;
pub use vfs::Vfs;
