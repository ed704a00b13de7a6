//! Host renderer boundary.
//!
//! Everything the sensor and viewshed crates need from a GPU backend is
//! expressed here: opaque resource handles, creation descriptors, the
//! per-frame state handed to `update` calls, and the command list that draw
//! commands are appended to. `HeadlessContext` implements the context without
//! a device so the rest of the stack can be exercised deterministically.

pub mod context;
pub mod headless;
pub mod renderer;

pub use context::*;
pub use headless::*;
pub use renderer::*;
