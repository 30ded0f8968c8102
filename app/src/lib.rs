//! # Shroud App
//!
//! The protection pipeline on top of the core, shader and asset store crates,
//! and the `shroud` command line tool driving it.
//!
//! ## Overview
//!
//! - [`Protector`] - Protects every renderer of a [`SceneManifest`] with a fresh key
//! - [`MaterialBinder`] - Decides which materials are protected and rebinds them
//! - [`ProtectContext`] - Audit trail, memo tables and report of one run
//! - [`KeyStore`] - Where the secret bits are persisted for the runtime
//! - [`ShroudConfig`] - The `shroud.toml` configuration
//!
//! ## Example
//!
//! ```
//! use shroud_app::{ProtectContext, Protector, SceneManifest, ShroudConfig};
//! use shroud_vfs::MemoryProvider;
//!
//! let store = MemoryProvider::new();
//! let config = ShroudConfig::default();
//! let manifest = SceneManifest::from_json(
//!     r#"{"name": "Empty", "parameters": {"capacity": 256, "used": 0}}"#,
//! )
//! .unwrap();
//!
//! let mut ctx = ProtectContext::new();
//! let result = Protector::new(&store, &config).protect(&manifest, &mut rand::thread_rng(), &mut ctx);
//! assert!(result.is_err());
//! ```

mod app;
mod args;
pub mod audit;
mod binder;
pub mod config;
mod context;
pub mod keys;
mod protect;
mod report;
pub mod scene;

pub use app::App;
pub use args::CliArgs;
pub use audit::{AuditEntry, AuditLog, Severity};
pub use binder::{BindOptions, MaterialBinder, NoLocker, ShaderLocker};
pub use config::{ConfigError, MountConfig, ProtectSettings, ShroudConfig};
pub use context::ProtectContext;
pub use keys::{KeyNotifier, KeyRecord, KeyStore, LocalKeyStore, NoNotifier};
pub use protect::{FixedOperator, Operator, ProtectError, Protector};
pub use report::{MeshOutcome, MeshStatus, ProtectReport, ShaderOutcome, ShaderStatus};
pub use scene::{ParameterBudget, RendererEntry, SceneManifest};

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version.
pub fn init() {
    log::info!("Shroud v{} initialized", VERSION);
}
