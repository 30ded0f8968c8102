//! # Shroud Core
//!
//! Data model and math for keyed mesh protection:
//!
//! - [`mesh`]: the serializable mesh document (vertices, submeshes, blend shapes)
//! - [`material`]: materials, shader references and renderer slots
//! - [`key`]: the secret bit vector and the schedule that turns it into weights
//! - [`encoder`]: the keyed vertex encoder
//! - [`decode`]: the CPU reference of the reconstruction the shaders perform

pub mod asset;
pub mod decode;
pub mod encoder;
pub mod key;
pub mod material;
pub mod math;
pub mod mesh;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
