//! World module - scene descriptions and the assets they reference
//!
//! - RON scene files (camera, models, lights, render settings)
//! - OBJ/MTL model loading
//! - Procedural primitives and the built-in scene table

mod obj;
mod primitives;
mod registry;
mod scene;

pub use obj::*;
pub use primitives::*;
pub use registry::*;
pub use scene::*;
