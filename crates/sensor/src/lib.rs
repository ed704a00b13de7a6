//! Procedural sensor volume: an angle-limited pyramid with lateral faces,
//! boundary/segment lines, a bounding dome and an animated scan plane.
//!
//! `SensorVolume::update` is called once per frame from the render callback.
//! It diffs the current configuration against the last applied one and
//! rebuilds only what went stale: vertex arrays on geometry changes, programs
//! and render states on translucency changes, nothing but uniforms otherwise.

pub mod dirty;
pub mod error;
pub mod material;
pub mod mesher;
pub mod orientation;
pub mod resource_cache;
pub mod shaders;
pub mod uniforms;
pub mod volume;

pub use dirty::*;
pub use error::*;
pub use material::*;
pub use mesher::*;
pub use orientation::*;
pub use resource_cache::*;
pub use uniforms::*;
pub use volume::*;
