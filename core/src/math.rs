//! Math type aliases.
//!
//! All mesh attributes are stored as f32 nalgebra vectors, which serialize as
//! plain JSON arrays through nalgebra's `serde-serialize` feature.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Component of a 2D vector selected by step parity: `x` on even steps,
/// `y` on odd steps.
#[inline]
pub fn parity_component(v: &Vec2, step: usize) -> f32 {
    if step % 2 == 0 {
        v.x
    } else {
        v.y
    }
}

/// Order two bounds so that the first is not greater than the second.
#[inline]
pub fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
