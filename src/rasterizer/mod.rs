//! Software rasterizer
//!
//! Features:
//! - Perspective-correct attribute interpolation
//! - 2x2 supersampling with per-sample depth
//! - Shadow maps with PCSS, PCF or hard filtering
//! - Blinn-Phong shading with optional texture maps

mod math;
mod types;
mod texture;
mod light;
mod shader;
mod camera;
mod render;

pub use math::*;
pub use types::*;
pub use texture::*;
pub use light::*;
pub use shader::*;
pub use camera::*;
pub use render::*;
