//! Shader source patching for Shroud.
//!
//! This crate weaves the vertex reconstruction routine into text shader
//! programs:
//!
//! - [`ShaderPatchRuleSet`] - the three ordered find/replace rules for one shader family
//! - [`ShaderCapabilities`] - which shader families can be patched
//! - [`IncludeGraphResolver`] - transitive `#include` discovery
//! - [`ShaderPatcher`] - rename, rule application, include rewriting, persistence
//! - [`decode`] - generation of the `ShroudDecode.cginc` support file
//!
//! Patching is idempotent: every output starts with the [`SENTINEL`] line and
//! files carrying it are never patched again.
//!
//! # Example
//!
//! ```
//! use shroud_shader::{ShaderCapabilities, ShaderPatcher};
//! use shroud_vfs::{AssetStore, MemoryProvider};
//!
//! let store = MemoryProvider::new();
//! store.insert(
//!     "Shaders/Toon.shader",
//!     "Shader \"Shroud/Toon\" {\n#pragma vertex vert\n}\n",
//! );
//!
//! let capabilities = ShaderCapabilities::with_builtins();
//! let rules = capabilities.lookup("Shroud/Toon").unwrap();
//! let patched = ShaderPatcher::new(&store, "// decode")
//!     .patch("Shaders/Toon.shader", rules)
//!     .unwrap();
//!
//! assert_eq!(patched.shader.name, "Shroud/Toon/Protected");
//! assert!(store.exists("Shaders/Toon_Protected.shader").unwrap());
//! ```

pub mod decode;
mod error;
mod includes;
mod patcher;
mod program;
mod registry;
mod rules;

pub use error::PatchError;
pub use includes::{include_target, IncludeGraphResolver};
pub use patcher::{
    rewrite_references, IncludeOutcome, PatchedShader, RuleMiss, ShaderPatcher,
    PROTECTED_FILE_SUFFIX,
};
pub use program::{ShaderProgram, SENTINEL};
pub use registry::{ShaderCapabilities, ShaderCapability};
pub use rules::{PatchRule, RuleCategory, ShaderPatchRuleSet};
