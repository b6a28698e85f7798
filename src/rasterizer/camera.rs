//! Look-at perspective camera

use super::math::{Mat4, Vec3};

/// Closest the eye may get to the center when dollying
pub const MIN_DOLLY_DISTANCE: f32 = 0.1;

/// Camera state
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect_ratio: f32,
    pub eye_pos: Vec3,
    pub up: Vec3,
    /// Point the camera looks at
    pub center: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(fov: f32, aspect_ratio: f32, eye_pos: Vec3, up: Vec3, center: Vec3, near: f32, far: f32) -> Self {
        Self { fov, aspect_ratio, eye_pos, up, center, near, far }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::persp(self.near, self.far, self.fov.to_radians(), self.aspect_ratio)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.eye_pos, self.center, self.up)
    }

    /// Unit vector from the eye toward the center
    pub fn forward(&self) -> Vec3 {
        (self.center - self.eye_pos).normalized()
    }

    /// Move the eye along the view direction; positive moves closer.
    /// The eye stops [`MIN_DOLLY_DISTANCE`] short of the center.
    pub fn dolly(&mut self, offset: f32) {
        let to_center = self.center - self.eye_pos;
        let Some(forward) = to_center.try_normalized() else {
            return;
        };
        let offset = offset.min(to_center.norm() - MIN_DOLLY_DISTANCE);
        self.eye_pos = self.eye_pos + forward * offset;
    }
}

impl Default for Camera {
    /// Looks from (0, 0, 5) down the negative Z axis
    fn default() -> Self {
        Self::new(45.0, 4.0 / 3.0, Vec3::new(0.0, 0.0, 5.0), Vec3::UP, Vec3::ZERO, 0.1, 50.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::math::Vec4;

    #[test]
    fn test_center_projects_to_ndc_origin() {
        let cam = Camera::new(60.0, 1.0, Vec3::new(0.0, 6.0, 6.0), Vec3::UP, Vec3::ZERO, 0.1, 30.0);
        let clip = cam.projection_matrix() * cam.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
        assert!(clip.w > 0.0);
        let ndc_z = clip.z / clip.w;
        assert!(ndc_z > -1.0 && ndc_z < 1.0);
    }

    #[test]
    fn test_dolly_moves_toward_center() {
        let mut cam = Camera::default();
        cam.dolly(1.0);
        assert!((cam.eye_pos.z - 4.0).abs() < 1e-6);
        cam.dolly(-2.0);
        assert!((cam.eye_pos.z - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_dolly_stops_short_of_center() {
        let mut cam = Camera::default();
        for _ in 0..40 {
            cam.dolly(0.25);
        }
        assert!((cam.eye_pos.z - MIN_DOLLY_DISTANCE).abs() < 1e-5);
        assert!(cam.forward().z < 0.0);

        cam.dolly(-0.25);
        assert!((cam.eye_pos.z - MIN_DOLLY_DISTANCE - 0.25).abs() < 1e-5);
        assert!(cam.eye_pos.x == 0.0 && cam.eye_pos.y == 0.0);
    }

    #[test]
    fn test_dolly_with_eye_on_center_is_ignored() {
        let mut cam = Camera::default();
        cam.eye_pos = cam.center;
        cam.dolly(1.0);
        assert_eq!(cam.eye_pos, cam.center);
    }
}
