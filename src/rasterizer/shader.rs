//! Fragment shaders
//!
//! A shader is a plain function from an interpolated fragment to a color.
//! Lighting runs in view space: the rasterizer hands over view-space
//! positions and normals, and light positions already moved into view space.

use std::sync::Arc;
use serde::{Serialize, Deserialize};

use super::math::Vec3;
use super::texture::{RgbTexture, WrapMode};
use super::types::{Material, RgbColor};

/// A light as seen by the shaders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingLight {
    /// View-space position
    pub position: Vec3,
    pub intensity: Vec3,
}

/// Everything a shader may read about one fragment
#[derive(Debug, Clone, Copy)]
pub struct FragmentPayload<'a> {
    /// Unit view-space normal
    pub normal: Vec3,
    pub view_position: Vec3,
    /// Sample position in pixels
    pub screen_position: Vec3,
    pub texture_coord: Vec3,
    /// Interpolated vertex color
    pub color: RgbColor,
    pub material: &'a Material,
    /// View-space eye position (the origin)
    pub eye_pos: Vec3,
    pub lights: &'a [ShadingLight],
    pub ambient_intensity: f32,
}

pub type Shader = fn(&FragmentPayload) -> RgbColor;

/// Shader selection for scene files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShaderKind {
    /// Normals as colors
    Normal,
    /// Blinn-Phong with the mesh material and its texture maps
    #[default]
    Texture,
    /// Blinn-Phong with fixed coefficients, capped at white
    BlinnPhong,
    /// Diffuse color only, no lighting
    Unlit,
}

impl ShaderKind {
    pub fn shader(self) -> Shader {
        match self {
            ShaderKind::Normal => normal_shader,
            ShaderKind::Texture => texture_shader,
            ShaderKind::BlinnPhong => blinn_phong_shader,
            ShaderKind::Unlit => unlit_shader,
        }
    }
}

/// Maps the normal from [-1, 1] to [0, 1]
pub fn normal_shader(payload: &FragmentPayload) -> RgbColor {
    (payload.normal + Vec3::ONE) / 2.0
}

/// Ambient, diffuse and specular reflectance after texture modulation
struct Coefficients {
    ka: RgbColor,
    kd: RgbColor,
    ks: RgbColor,
    shininess: f32,
}

/// Accumulate Blinn-Phong over every light
fn blinn_phong(payload: &FragmentPayload, k: &Coefficients, ambient_light: Vec3) -> RgbColor {
    let eye_vec = (payload.eye_pos - payload.view_position).normalized();

    let mut color = Vec3::ZERO;
    for light in payload.lights {
        let to_light = light.position - payload.view_position;
        let intensity = light.intensity / to_light.norm2();
        let light_vec = to_light.normalized();
        let half_vec = (light_vec + eye_vec).normalized();

        let ambient = ambient_light.cwise_product(k.ka);
        let diffuse = k.kd.cwise_product(intensity) * payload.normal.dot(light_vec).max(0.0);
        let specular = k.ks.cwise_product(intensity)
            * payload.normal.dot(half_vec).max(0.0).powf(k.shininess);
        color += ambient + diffuse + specular;
    }
    color
}

/// Blinn-Phong driven by the material, each coefficient optionally
/// modulated by its bilinearly sampled texture map
pub fn texture_shader(payload: &FragmentPayload) -> RgbColor {
    let m = payload.material;
    let (u, v) = (payload.texture_coord.x, payload.texture_coord.y);
    let modulate = |base: RgbColor, tex: &Option<Arc<RgbTexture>>| match tex {
        Some(t) => t.get_bilinear(u, v, WrapMode::Repeat).cwise_product(base),
        None => base,
    };

    let k = Coefficients {
        ka: modulate(m.ka, &m.ka_texture),
        kd: modulate(m.kd, &m.kd_texture),
        ks: modulate(m.ks, &m.ks_texture),
        shininess: m.ns,
    };
    blinn_phong(payload, &k, Vec3::splat(payload.ambient_intensity)).min(Vec3::ONE)
}

/// Fixed glossy-white Blinn-Phong, clamped to the unlit surface color
pub fn blinn_phong_shader(payload: &FragmentPayload) -> RgbColor {
    let texture_color = Vec3::ONE;
    let k = Coefficients {
        ka: Vec3::splat(0.005),
        kd: texture_color,
        ks: Vec3::splat(0.7937),
        shininess: 150.0,
    };
    blinn_phong(payload, &k, Vec3::splat(10.0)).min(texture_color)
}

/// Diffuse color straight from the material, nearest-sampled
pub fn unlit_shader(payload: &FragmentPayload) -> RgbColor {
    let m = payload.material;
    match &m.kd_texture {
        Some(t) => t
            .get(payload.texture_coord.x, payload.texture_coord.y, WrapMode::Repeat)
            .cwise_product(m.kd),
        None => m.kd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::texture::Texture;

    fn payload<'a>(material: &'a Material, lights: &'a [ShadingLight]) -> FragmentPayload<'a> {
        FragmentPayload {
            normal: Vec3::new(0.0, 0.0, 1.0),
            view_position: Vec3::new(0.0, 0.0, -5.0),
            screen_position: Vec3::ZERO,
            texture_coord: Vec3::new(0.5, 0.5, 0.0),
            color: Vec3::ONE,
            material,
            eye_pos: Vec3::ZERO,
            lights,
            ambient_intensity: 0.01,
        }
    }

    #[test]
    fn test_normal_shader_maps_unit_range() {
        let m = Material::default();
        let c = normal_shader(&payload(&m, &[]));
        assert_eq!(c, Vec3::new(0.5, 0.5, 1.0));
    }

    #[test]
    fn test_no_lights_is_black() {
        let m = Material::default();
        assert_eq!(texture_shader(&payload(&m, &[])), Vec3::ZERO);
    }

    #[test]
    fn test_head_on_light() {
        let m = Material {
            ka: Vec3::ZERO,
            kd: Vec3::new(0.5, 0.25, 0.0),
            ks: Vec3::ZERO,
            ..Material::default()
        };
        // 2 units in front of the surface, straight along the normal
        let lights = [ShadingLight { position: Vec3::new(0.0, 0.0, -3.0), intensity: Vec3::splat(2.0) }];
        let c = texture_shader(&payload(&m, &lights));
        assert!((c.x - 0.25).abs() < 1e-5);
        assert!((c.y - 0.125).abs() < 1e-5);
        assert_eq!(c.z, 0.0);
    }

    #[test]
    fn test_light_behind_surface_only_ambient() {
        let m = Material::default();
        let lights = [ShadingLight { position: Vec3::new(0.0, 0.0, -9.0), intensity: Vec3::splat(50.0) }];
        let c = texture_shader(&payload(&m, &lights));
        let ambient = 0.01 * m.ka.x;
        assert!((c.x - ambient).abs() < 1e-6);
    }

    #[test]
    fn test_output_never_exceeds_one() {
        let m = Material {
            ka: Vec3::ONE,
            kd: Vec3::ONE,
            ks: Vec3::ONE,
            ..Material::default()
        };
        let lights: Vec<ShadingLight> = (0..4)
            .map(|i| ShadingLight { position: Vec3::new(i as f32, 1.0, -4.0), intensity: Vec3::splat(1000.0) })
            .collect();
        for shader in [texture_shader as Shader, blinn_phong_shader] {
            let c = shader(&payload(&m, &lights));
            assert!(c.x <= 1.0 && c.y <= 1.0 && c.z <= 1.0);
        }
    }

    #[test]
    fn test_texture_modulates_diffuse() {
        let tex = Texture::filled(2, 2, Vec3::new(0.0, 1.0, 0.0));
        let m = Material {
            kd: Vec3::ONE,
            kd_texture: Some(Arc::new(tex)),
            ..Material::default()
        };
        assert_eq!(unlit_shader(&payload(&m, &[])), Vec3::new(0.0, 1.0, 0.0));
        let plain = Material::with_diffuse("red", Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(unlit_shader(&payload(&plain, &[])), Vec3::new(1.0, 0.0, 0.0));
    }
}
