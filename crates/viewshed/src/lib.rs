//! Line-of-sight analysis from an observer toward a target.
//!
//! A virtual shadow camera is placed at the observer and aimed at the target;
//! the classifier then tints every screen fragment green or red depending on
//! whether the shadow map sees it, clipped by independent horizontal and
//! vertical half-angles and a maximum distance. A [`sensor::SensorVolume`]
//! draws the analysed frustum.

pub mod classifier;
pub mod config;
pub mod controller;
pub mod depth;
pub mod error;
pub mod shadow_camera;

pub use classifier::*;
pub use config::*;
pub use controller::*;
pub use depth::*;
pub use error::*;
pub use shadow_camera::*;
