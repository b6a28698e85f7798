//! softras: CPU software rasterizer
//!
//! - Perspective-correct triangle rasterization with 2x2 supersampling
//! - Blinn-Phong shading with MTL materials and texture maps
//! - Shadow maps with percentage-closer soft shadows
//! - RON scene files, OBJ models, PNG/PPM output

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod rasterizer;
pub mod world;
pub mod output;
#[cfg(feature = "viewer")]
pub mod viewer;
