//! Core types for the rasterizer: colors, geometry and render settings

use std::sync::Arc;
use serde::{Serialize, Deserialize};

use super::light::ShadowMode;
use super::math::{Mat4, Vec3};
use super::texture::RgbTexture;

/// Linear RGB color, channels in [0, 1]
pub type RgbColor = Vec3;

/// Default vertex tint (a warm clay brown)
pub const CLAY: RgbColor = Vec3::new(148.0 / 255.0, 121.0 / 255.0, 92.0 / 255.0);

/// RGBA color (0-255 per channel), the encoded form of a pixel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Quantize a linear color, clamping each channel to [0, 1] first
    pub fn from_rgb(c: RgbColor) -> Self {
        let c = c.saturate() * 255.0;
        Self::new(c.x as u8, c.y as u8, c.z as u8)
    }

    pub fn to_rgb(self) -> RgbColor {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32).rgb_normalized()
    }

    /// Convert to [u8; 4] for framebuffer upload
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A vertex with position, color, normal and texture coordinate.
/// `texture_coord.z` is unused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub coord: Vec3,
    pub color: RgbColor,
    pub normal: Vec3,
    pub texture_coord: Vec3,
}

impl Vertex {
    pub fn new(coord: Vec3, normal: Vec3, texture_coord: Vec3) -> Self {
        Self {
            coord,
            color: CLAY,
            normal,
            texture_coord,
        }
    }

    pub fn from_pos(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, y, z), Vec3::ZERO, Vec3::ZERO)
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO)
    }
}

/// Exactly three vertices. The same type carries object-space triangles and
/// their screen-space projections.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Triangle {
    pub v: [Vertex; 3],
}

impl Triangle {
    pub fn new(v: [Vertex; 3]) -> Self {
        Self { v }
    }

    /// 2D point-in-triangle test on x/y. Inside when the point lies on the
    /// same side of all three edges; points on an edge count as inside.
    pub fn inside(&self, p: Vec3) -> bool {
        let [a, b, c] = [self.v[0].coord, self.v[1].coord, self.v[2].coord];
        let d1 = edge_function(a, b, p);
        let d2 = edge_function(b, c, p);
        let d3 = edge_function(c, a, p);
        (d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0) || (d1 <= 0.0 && d2 <= 0.0 && d3 <= 0.0)
    }

    /// Barycentric weights `(alpha, beta, gamma)` of `(x, y)` against the
    /// x/y projection. Zero-area triangles divide by zero and yield
    /// non-finite weights.
    pub fn barycentric_2d(&self, x: f32, y: f32) -> (f32, f32, f32) {
        let [a, b, c] = [self.v[0].coord, self.v[1].coord, self.v[2].coord];
        let alpha = (x * (b.y - c.y) + (c.x - b.x) * y + b.x * c.y - c.x * b.y)
            / (a.x * (b.y - c.y) + (c.x - b.x) * a.y + b.x * c.y - c.x * b.y);
        let beta = (x * (c.y - a.y) + (a.x - c.x) * y + c.x * a.y - a.x * c.y)
            / (b.x * (c.y - a.y) + (a.x - c.x) * b.y + c.x * a.y - a.x * c.y);
        (alpha, beta, 1.0 - alpha - beta)
    }

    /// z of `(b - a) x (c - a)`: twice the signed x/y area
    pub fn signed_area(&self) -> f32 {
        let [a, b, c] = [self.v[0].coord, self.v[1].coord, self.v[2].coord];
        (b - a).cross(c - a).z
    }

    /// Object-space face normal from the winding order
    pub fn face_normal(&self) -> Option<Vec3> {
        let [a, b, c] = [self.v[0].coord, self.v[1].coord, self.v[2].coord];
        (b - a).cross(c - a).try_normalized()
    }
}

/// `(b - a) x (p - a)`, z component only
fn edge_function(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Reflectance properties of a surface (MTL style)
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// Ambient reflectance
    pub ka: RgbColor,
    /// Diffuse reflectance
    pub kd: RgbColor,
    /// Specular reflectance
    pub ks: RgbColor,
    /// Specular exponent
    pub ns: f32,
    /// Optical density
    pub ni: f32,
    /// Dissolve
    pub d: f32,
    pub illum: u8,
    pub ka_texture: Option<Arc<RgbTexture>>,
    pub kd_texture: Option<Arc<RgbTexture>>,
    pub ks_texture: Option<Arc<RgbTexture>>,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Flat colored material, no textures
    pub fn with_diffuse(name: &str, kd: RgbColor) -> Self {
        Self {
            name: name.to_string(),
            ka: kd,
            kd,
            ..Self::default()
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            ka: Vec3::splat(1.0),
            kd: Vec3::splat(0.7),
            ks: Vec3::splat(0.5),
            ns: 32.0,
            ni: 1.0,
            d: 1.0,
            illum: 2,
            ka_texture: None,
            kd_texture: None,
            ks_texture: None,
        }
    }
}

/// Triangles sharing one material. Materials may be shared between meshes.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub triangles: Vec<Triangle>,
    pub material: Arc<Material>,
}

impl Mesh {
    pub fn new(name: &str, material: Arc<Material>) -> Self {
        Self {
            name: name.to_string(),
            triangles: Vec::new(),
            material,
        }
    }
}

/// Meshes plus a model-to-world transform
#[derive(Debug, Clone)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub transform: Mat4,
}

impl Model {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            transform: Mat4::identity(),
        }
    }

    pub fn from_meshes(meshes: Vec<Mesh>) -> Self {
        Self {
            meshes,
            transform: Mat4::identity(),
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.transform
    }

    /// Post-multiply a uniform scale (applied in model space)
    pub fn scale(&mut self, ratio: f32) {
        self.transform = self.transform * Mat4::scale(ratio);
    }

    /// Pre-multiply a world-space transform
    pub fn apply(&mut self, m: Mat4) {
        self.transform = m * self.transform;
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

/// Rasterizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// 2x2 supersampling per pixel
    pub antialias: bool,
    /// Reject triangles whose screen winding is clockwise-from-viewer
    pub backface_cull: bool,
    /// Shadow filter used for every light
    pub shadow_mode: ShadowMode,
    /// Edge length of each light's square depth texture
    pub shadow_map_resolution: usize,
    /// Ambient light intensity fed to the shaders
    pub ambient_intensity: f32,
    /// Rows per parallel framebuffer band
    pub band_rows: usize,
    /// Clear color
    pub background: RgbColor,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            antialias: true,
            backface_cull: true,
            shadow_mode: ShadowMode::Pcss,
            shadow_map_resolution: 2048,
            ambient_intensity: 0.01,
            band_rows: 16,
            background: Vec3::ZERO,
        }
    }
}
