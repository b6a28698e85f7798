//! Point lights with shadow maps
//!
//! Depth convention shared by the shadow pass and every lookup: after the
//! correction matrix a texel stores a value in [0, 1] where LARGER is NEARER
//! to the light (the orthographic light projection maps its near plane to 1
//! and far plane to 0). Cleared texels hold [`SHADOW_DEPTH_CLEAR`].

use serde::{Serialize, Deserialize};

use super::math::{poisson_disk_samples, Mat4, Vec3};
use super::texture::{DepthTexture, WrapMode};

pub const LIGHT_NEAR: f32 = 1e-2;
pub const LIGHT_FAR: f32 = 50.0;
/// Half extent of the light's square orthographic window
pub const LIGHT_LRTB: f32 = 8.0;
/// Light size driving the penumbra width
pub const LIGHT_WIDTH: f32 = 1.0;
pub const NUM_SAMPLES: usize = 16;
pub const NUM_RINGS: usize = 10;
/// Depth bias against self-shadowing
pub const SHADOW_EPSILON: f32 = 0.001;
/// "Nothing seen" texel value. Far below any receiver depth but finite, so
/// bilinear blends against it stay finite.
pub const SHADOW_DEPTH_CLEAR: f32 = -1.0e9;

const PCF_FILTER_SCALE: f32 = 0.00125;
const BLOCKER_SEARCH_SCALE: f32 = 0.001;
const PCSS_FILTER_SCALE: f32 = 0.125;

/// Shadow filtering strategy, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadowMode {
    /// No shadows; every fragment is fully visible
    Off,
    /// Single hard depth comparison
    Plain,
    /// Fixed-radius percentage-closer filtering
    Pcf,
    /// Percentage-closer soft shadows
    #[default]
    Pcss,
}

#[derive(Debug, Clone)]
pub struct Light {
    pub position: Vec3,
    /// Radiant intensity per channel, falls off with squared distance
    pub intensity: Vec3,
    pub up: Vec3,
    /// Point the shadow camera looks at
    pub focal: Vec3,
    /// Square shadow map, rewritten in place every frame
    pub depth: DepthTexture,
}

impl Light {
    pub fn new(position: Vec3, intensity: Vec3, resolution: usize) -> Self {
        Self::with_target(position, intensity, Vec3::UP, Vec3::ZERO, resolution)
    }

    pub fn with_target(position: Vec3, intensity: Vec3, up: Vec3, focal: Vec3, resolution: usize) -> Self {
        let resolution = resolution.max(1);
        Self {
            position,
            intensity,
            up,
            focal,
            depth: DepthTexture::filled(resolution, resolution, SHADOW_DEPTH_CLEAR),
        }
    }

    pub fn resolution(&self) -> usize {
        self.depth.width
    }

    /// Back to "nothing seen yet"
    pub fn reset_depth_texture(&mut self) {
        self.depth.fill(SHADOW_DEPTH_CLEAR);
    }

    /// Maps NDC [-1, 1] to texture space [0, 1] on all three axes
    pub fn correction_matrix() -> Mat4 {
        Mat4::from_rows([
            0.5, 0.0, 0.0, 0.5,
            0.0, 0.5, 0.0, 0.5,
            0.0, 0.0, 0.5, 0.5,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// True when `up` is parallel to the light's view direction, which
    /// leaves the shadow camera without a horizontal axis
    pub fn has_parallel_up(&self) -> bool {
        self.up.cross(self.position - self.focal).norm2() <= f32::EPSILON * self.up.norm2()
    }

    /// `up` unless it is parallel to the view direction, then -Z (or X when
    /// the light looks along Z)
    pub fn shadow_up(&self) -> Vec3 {
        if !self.has_parallel_up() {
            return self.up;
        }
        let dir = self.position - self.focal;
        let fallback = Vec3::new(0.0, 0.0, -1.0);
        if fallback.cross(dir).norm2() > f32::EPSILON * dir.norm2() {
            fallback
        } else {
            Vec3::new(1.0, 0.0, 0.0)
        }
    }

    /// Orthographic view-projection of the shadow camera
    pub fn view_projection(&self) -> Mat4 {
        Mat4::ortho(LIGHT_NEAR, LIGHT_FAR, LIGHT_LRTB) * Mat4::look_at(self.position, self.focal, self.shadow_up())
    }

    /// World position to `(u, v, depth)` in shadow-map space
    pub fn shadow_coord(&self, world: Vec3) -> Vec3 {
        (Self::correction_matrix() * self.view_projection()).transform_point(world)
    }

    /// Fraction of the light reaching `world`, in [0, 1].
    ///
    /// Positions projecting outside the shadow map return 0: the edge of the
    /// light's frustum is treated as shadow.
    pub fn compute_visibility(&self, world: Vec3, mode: ShadowMode) -> f32 {
        self.visibility_at(self.shadow_coord(world), mode)
    }

    /// Same as [`Light::compute_visibility`] for a precomputed shadow coord
    pub fn visibility_at(&self, coord: Vec3, mode: ShadowMode) -> f32 {
        match mode {
            ShadowMode::Off => 1.0,
            _ if !in_unit_square(coord.x, coord.y) => 0.0,
            ShadowMode::Plain => self.plain_shadow(coord),
            ShadowMode::Pcf => self.pcf_shadow(coord),
            ShadowMode::Pcss => self.pcss_shadow(coord),
        }
    }

    /// Stored nearest depth, `None` outside the map
    fn nearest_depth(&self, u: f32, v: f32) -> Option<f32> {
        if in_unit_square(u, v) {
            Some(self.depth.get_bilinear(u, v, WrapMode::Clamp))
        } else {
            None
        }
    }

    /// Lit when nothing stored is nearer than the receiver
    fn is_lit(&self, receiver: f32, u: f32, v: f32) -> bool {
        match self.nearest_depth(u, v) {
            Some(nearest) => receiver + SHADOW_EPSILON > nearest,
            None => false,
        }
    }

    fn plain_shadow(&self, coord: Vec3) -> f32 {
        if self.is_lit(coord.z, coord.x, coord.y) { 1.0 } else { 0.0 }
    }

    /// Percentage of lit samples on a disk of `radius` around `coord`
    fn filtered(&self, coord: Vec3, disk: &[Vec3; NUM_SAMPLES], radius: f32) -> f32 {
        let lit = disk
            .iter()
            .filter(|s| self.is_lit(coord.z, coord.x + s.x * radius, coord.y + s.y * radius))
            .count();
        lit as f32 / NUM_SAMPLES as f32
    }

    fn pcf_shadow(&self, coord: Vec3) -> f32 {
        let disk = poisson_disk_samples::<NUM_SAMPLES>(coord, NUM_RINGS);
        self.filtered(coord, &disk, PCF_FILTER_SCALE)
    }

    fn pcss_shadow(&self, coord: Vec3) -> f32 {
        let disk = poisson_disk_samples::<NUM_SAMPLES>(coord, NUM_RINGS);
        let receiver = coord.z;
        let blocker = match self.average_blocker_depth(coord, &disk) {
            Some(b) if b >= receiver => b,
            _ => return 1.0,
        };

        let penumbra = (blocker - receiver) * LIGHT_WIDTH / (1.0 - blocker);
        self.filtered(coord, &disk, PCSS_FILTER_SCALE * penumbra)
    }

    /// Mean depth of the samples nearer to the light than the receiver
    fn average_blocker_depth(&self, coord: Vec3, disk: &[Vec3; NUM_SAMPLES]) -> Option<f32> {
        let (sum, count) = disk
            .iter()
            .filter_map(|s| {
                self.nearest_depth(
                    coord.x + s.x * BLOCKER_SEARCH_SCALE,
                    coord.y + s.y * BLOCKER_SEARCH_SCALE,
                )
            })
            .filter(|&nearest| coord.z + SHADOW_EPSILON <= nearest)
            .fold((0.0, 0usize), |(sum, n), d| (sum + d, n + 1));

        if count == 0 {
            None
        } else {
            Some(sum / count as f32)
        }
    }
}

fn in_unit_square(u: f32, v: f32) -> bool {
    (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overhead_light() -> Light {
        Light::with_target(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::splat(100.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::ZERO,
            64,
        )
    }

    #[test]
    fn test_shadow_coord_depth_ordering() {
        let light = overhead_light();
        let near = light.shadow_coord(Vec3::new(0.0, 5.0, 0.0));
        let far = light.shadow_coord(Vec3::new(0.0, 0.0, 0.0));
        assert!((near.x - 0.5).abs() < 1e-5 && (near.y - 0.5).abs() < 1e-5);
        assert!(near.z > far.z);
        assert!(near.z <= 1.0 && far.z >= 0.0);
    }

    #[test]
    fn test_cleared_map_is_fully_lit() {
        let light = overhead_light();
        for mode in [ShadowMode::Plain, ShadowMode::Pcf, ShadowMode::Pcss] {
            assert_eq!(light.compute_visibility(Vec3::ZERO, mode), 1.0);
        }
    }

    #[test]
    fn test_outside_frustum_is_shadowed() {
        let light = overhead_light();
        let outside = Vec3::new(LIGHT_LRTB * 2.0, 0.0, 0.0);
        assert_eq!(light.compute_visibility(outside, ShadowMode::Pcss), 0.0);
        assert_eq!(light.compute_visibility(outside, ShadowMode::Plain), 0.0);
        assert_eq!(light.compute_visibility(outside, ShadowMode::Off), 1.0);
    }

    #[test]
    fn test_fully_blocked_receiver() {
        let mut light = overhead_light();
        let occluder = light.shadow_coord(Vec3::new(0.0, 5.0, 0.0)).z;
        light.depth.fill(occluder);
        for mode in [ShadowMode::Plain, ShadowMode::Pcf, ShadowMode::Pcss] {
            assert_eq!(light.compute_visibility(Vec3::ZERO, mode), 0.0);
        }
        // the occluder itself is lit thanks to the bias
        assert_eq!(light.compute_visibility(Vec3::new(0.0, 5.0, 0.0), ShadowMode::Plain), 1.0);
    }

    #[test]
    fn test_pcss_penumbra_near_shadow_edge() {
        let mut light = overhead_light();
        let occluder = light.shadow_coord(Vec3::new(0.0, 1.0, 0.0)).z;
        let res = light.resolution();
        // left half of the map blocked
        for y in 0..res {
            for x in 0..res / 2 {
                light.depth.set(x, y, occluder);
            }
        }
        let inside = light.compute_visibility(Vec3::new(-4.0, 0.0, 0.0), ShadowMode::Pcss);
        let edge = light.compute_visibility(Vec3::new(-0.16, 0.0, 0.0), ShadowMode::Pcss);
        let lit = light.compute_visibility(Vec3::new(4.0, 0.0, 0.0), ShadowMode::Pcss);
        assert_eq!(inside, 0.0);
        assert!(edge > 0.0 && edge < 1.0, "edge visibility {edge}");
        assert_eq!(lit, 1.0);
    }

    #[test]
    fn test_overhead_light_with_default_up() {
        let light = Light::new(Vec3::new(0.0, 8.0, 0.0), Vec3::splat(120.0), 64);
        assert!(light.has_parallel_up());
        let coord = light.shadow_coord(Vec3::ZERO);
        assert!(coord.x.is_finite() && coord.y.is_finite() && coord.z.is_finite());
        assert!((coord.x - 0.5).abs() < 1e-5 && (coord.y - 0.5).abs() < 1e-5);
        for mode in [ShadowMode::Plain, ShadowMode::Pcf, ShadowMode::Pcss] {
            assert_eq!(light.compute_visibility(Vec3::ZERO, mode), 1.0);
        }
    }

    #[test]
    fn test_shadow_up_fallback_along_z() {
        let light = Light::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ONE, 8);
        assert!(!light.has_parallel_up());
        let mut along_z = light.clone();
        along_z.up = Vec3::new(0.0, 0.0, 1.0);
        assert!(along_z.has_parallel_up());
        assert_eq!(along_z.shadow_up(), Vec3::new(1.0, 0.0, 0.0));
        assert!(along_z.shadow_coord(Vec3::ZERO).x.is_finite());
    }

    #[test]
    fn test_reset_restores_sentinel() {
        let mut light = overhead_light();
        light.depth.fill(0.3);
        light.reset_depth_texture();
        assert_eq!(light.resolution(), 64);
        assert!(light.depth.data.iter().all(|d| *d == SHADOW_DEPTH_CLEAR));
    }
}
