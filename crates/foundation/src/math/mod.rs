pub mod ellipsoid;
pub mod mat4;
pub mod quat;
pub mod vec;

pub use ellipsoid::*;
pub use mat4::*;
pub use quat::*;
pub use vec::*;

/// Tolerance used when deciding that a direction or axis has collapsed.
pub const EPSILON_DIRECTION: f64 = 1.0e-12;
