//! Vector and matrix math for the transform pipeline
//!
//! Single precision throughout. Matrices are row-major and multiply column
//! vectors (`m * v`), so a transform chain reads right to left.

use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

/// 3D Vector, also used as a linear RGB color with channels in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// All three components set to `v`
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Squared length
    pub fn norm2(self) -> f32 {
        self.dot(self)
    }

    pub fn norm(self) -> f32 {
        self.norm2().sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// There is no zero-length guard: normalizing a zero vector divides by
    /// zero and yields NaN components. Use [`Vec3::try_normalized`] where the
    /// input may be degenerate.
    pub fn normalized(self) -> Vec3 {
        self / self.norm()
    }

    /// In-place [`Vec3::normalized`], same NaN behavior for zero vectors
    pub fn normalize(&mut self) -> &mut Self {
        let n = self.norm();
        self.x /= n;
        self.y /= n;
        self.z /= n;
        self
    }

    /// `None` for zero-length (or non-finite) vectors
    pub fn try_normalized(self) -> Option<Vec3> {
        let n = self.norm();
        if n > 0.0 && n.is_finite() {
            Some(self / n)
        } else {
            None
        }
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Componentwise product (color modulation)
    pub fn cwise_product(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn sin(self) -> Vec3 {
        Vec3::new(self.x.sin(), self.y.sin(), self.z.sin())
    }

    pub fn cos(self) -> Vec3 {
        Vec3::new(self.x.cos(), self.y.cos(), self.z.cos())
    }

    /// Homogeneous extension: `w = 1` for points, `w = 0` for directions
    pub fn to_vec4(self, w: f32) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, w)
    }

    /// Clamp every channel to [0, 1]
    pub fn saturate(self) -> Vec3 {
        Vec3::new(
            clamp(self.x, 0.0, 1.0),
            clamp(self.y, 0.0, 1.0),
            clamp(self.z, 0.0, 1.0),
        )
    }

    /// Map 0-255 channels to [0, 1]
    pub fn rgb_normalized(self) -> Vec3 {
        self / 255.0
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Vec3) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;
    fn mul(self, v: Vec3) -> Vec3 {
        v.scale(self)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;
    fn div(self, s: f32) -> Vec3 {
        let inv = 1.0 / s;
        self.scale(inv)
    }
}

impl From<Vec4> for Vec3 {
    /// Drops `w` without dividing
    fn from(v: Vec4) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Homogeneous 4D vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl Div<f32> for Vec4 {
    type Output = Vec4;
    fn div(self, s: f32) -> Vec4 {
        Vec4::new(self.x / s, self.y / s, self.z / s, self.w / s)
    }
}

/// Row-major 4x4 matrix
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Mat4 {
    pub const fn zero() -> Self {
        Self { m: [[0.0; 4]; 4] }
    }

    pub const fn identity() -> Self {
        Self::from_rows([
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Build from 16 values in row order
    pub const fn from_rows(v: [f32; 16]) -> Self {
        Self {
            m: [
                [v[0], v[1], v[2], v[3]],
                [v[4], v[5], v[6], v[7]],
                [v[8], v[9], v[10], v[11]],
                [v[12], v[13], v[14], v[15]],
            ],
        }
    }

    /// Uniform scale
    pub fn scale(ratio: f32) -> Self {
        Self::from_rows([
            ratio, 0.0, 0.0, 0.0,
            0.0, ratio, 0.0, 0.0,
            0.0, 0.0, ratio, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn translation(t: Vec3) -> Self {
        Self::from_rows([
            1.0, 0.0, 0.0, t.x,
            0.0, 1.0, 0.0, t.y,
            0.0, 0.0, 1.0, t.z,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation about the X axis, angle in radians
    pub fn rotation_x(a: f32) -> Self {
        let (s, c) = a.sin_cos();
        Self::from_rows([
            1.0, 0.0, 0.0, 0.0,
            0.0, c, -s, 0.0,
            0.0, s, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation about the Y axis, angle in radians
    pub fn rotation_y(a: f32) -> Self {
        let (s, c) = a.sin_cos();
        Self::from_rows([
            c, 0.0, s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            -s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn transpose(&self) -> Mat4 {
        let mut out = Mat4::zero();
        for i in 0..4 {
            for j in 0..4 {
                out.m[i][j] = self.m[j][i];
            }
        }
        out
    }

    /// Minor matrix with row `p` and column `q` removed, packed into the
    /// top-left `(n-1)x(n-1)` block of the result
    fn cofactor(&self, p: usize, q: usize, n: usize) -> Mat4 {
        let mut out = Mat4::zero();
        let (mut i, mut j) = (0, 0);
        for r in 0..n {
            for c in 0..n {
                if r != p && c != q {
                    out.m[i][j] = self.m[r][c];
                    j += 1;
                    if j == n - 1 {
                        j = 0;
                        i += 1;
                    }
                }
            }
        }
        out
    }

    /// Determinant of the top-left `n x n` block by cofactor expansion
    fn determinant_n(&self, n: usize) -> f32 {
        if n == 1 {
            return self.m[0][0];
        }
        let mut d = 0.0;
        let mut sign = 1.0;
        for f in 0..n {
            let minor = self.cofactor(0, f, n);
            d += sign * self.m[0][f] * minor.determinant_n(n - 1);
            sign = -sign;
        }
        d
    }

    pub fn determinant(&self) -> f32 {
        self.determinant_n(4)
    }

    /// Adjugate: transpose of the cofactor matrix
    pub fn adjoint(&self) -> Mat4 {
        let mut out = Mat4::zero();
        for i in 0..4 {
            for j in 0..4 {
                let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                out.m[j][i] = sign * self.cofactor(i, j, 4).determinant_n(3);
            }
        }
        out
    }

    /// Inverse via adjugate / determinant.
    ///
    /// A determinant of exactly zero returns the identity instead of an
    /// error. No epsilon is applied, so nearly singular matrices invert to
    /// very large entries.
    pub fn inverse(&self) -> Mat4 {
        let det = self.determinant();
        if det == 0.0 {
            return Mat4::identity();
        }
        self.adjoint() / det
    }

    /// Orthographic projection onto a square `[-lrtb, lrtb]` window.
    /// `near`/`far` are positive distances along -Z; near maps to NDC z = +1
    /// and far to -1.
    pub fn ortho(near: f32, far: f32, lrtb: f32) -> Mat4 {
        let (n, f) = (-near, -far);
        let mut out = Mat4::identity();
        out.m[0][0] = 1.0 / lrtb;
        out.m[1][1] = 1.0 / lrtb;
        out.m[2][2] = 2.0 / (n - f);
        out.m[2][3] = -(n + f) / (n - f);
        out
    }

    /// OpenGL-style perspective projection. `fov` is the vertical field of
    /// view in radians. Clip-space `w` equals `-z_view`; the near plane maps
    /// to NDC z = -1 and the far plane to +1.
    pub fn persp(near: f32, far: f32, fov: f32, aspect_ratio: f32) -> Mat4 {
        let tan_half = (fov / 2.0).tan();
        Self::from_rows([
            1.0 / (aspect_ratio * tan_half), 0.0, 0.0, 0.0,
            0.0, 1.0 / tan_half, 0.0, 0.0,
            0.0, 0.0, -(far + near) / (far - near), -2.0 * far * near / (far - near),
            0.0, 0.0, -1.0, 0.0,
        ])
    }

    /// Right-handed view matrix looking from `eye` toward `target`
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let z_axis = (eye - target).normalized();
        let x_axis = up.cross(z_axis).normalized();
        let y_axis = z_axis.cross(x_axis);

        Self::from_rows([
            x_axis.x, x_axis.y, x_axis.z, -x_axis.dot(eye),
            y_axis.x, y_axis.y, y_axis.z, -y_axis.dot(eye),
            z_axis.x, z_axis.y, z_axis.z, -z_axis.dot(eye),
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Transform a point (`w = 1`) and drop `w` without dividing
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        (*self * p.to_vec4(1.0)).xyz()
    }

    /// Transform a direction (`w = 0`)
    pub fn transform_dir(&self, d: Vec3) -> Vec3 {
        (*self * d.to_vec4(0.0)).xyz()
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    fn mul(self, v: Vec4) -> Vec4 {
        let m = &self.m;
        Vec4 {
            x: m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z + m[0][3] * v.w,
            y: m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z + m[1][3] * v.w,
            z: m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z + m[2][3] * v.w,
            w: m[3][0] * v.x + m[3][1] * v.y + m[3][2] * v.z + m[3][3] * v.w,
        }
    }
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, other: Mat4) -> Mat4 {
        mat4_mul(&self, &other)
    }
}

impl Div<f32> for Mat4 {
    type Output = Mat4;
    fn div(self, s: f32) -> Mat4 {
        let mut out = self;
        for row in out.m.iter_mut() {
            for v in row.iter_mut() {
                *v /= s;
            }
        }
        out
    }
}

/// Portable row-by-column product
pub fn mat4_mul_scalar(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = Mat4::zero();
    for i in 0..4 {
        for j in 0..4 {
            out.m[i][j] = a.m[i][0] * b.m[0][j]
                + a.m[i][1] * b.m[1][j]
                + a.m[i][2] * b.m[2][j]
                + a.m[i][3] * b.m[3][j];
        }
    }
    out
}

/// SSE product: each output row is a broadcast-multiply-accumulate of the
/// rows of `b`. Same summation order as the scalar path.
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
pub fn mat4_mul_sse(a: &Mat4, b: &Mat4) -> Mat4 {
    use std::arch::x86_64::{_mm_add_ps, _mm_loadu_ps, _mm_mul_ps, _mm_set1_ps, _mm_storeu_ps};

    let mut out = Mat4::zero();
    // SAFETY: SSE is part of the x86_64 baseline and every pointer covers
    // exactly four f32 lanes of a [f32; 4] row.
    unsafe {
        let b0 = _mm_loadu_ps(b.m[0].as_ptr());
        let b1 = _mm_loadu_ps(b.m[1].as_ptr());
        let b2 = _mm_loadu_ps(b.m[2].as_ptr());
        let b3 = _mm_loadu_ps(b.m[3].as_ptr());
        for (row, dst) in a.m.iter().zip(out.m.iter_mut()) {
            let mut acc = _mm_mul_ps(_mm_set1_ps(row[0]), b0);
            acc = _mm_add_ps(acc, _mm_mul_ps(_mm_set1_ps(row[1]), b1));
            acc = _mm_add_ps(acc, _mm_mul_ps(_mm_set1_ps(row[2]), b2));
            acc = _mm_add_ps(acc, _mm_mul_ps(_mm_set1_ps(row[3]), b3));
            _mm_storeu_ps(dst.as_mut_ptr(), acc);
        }
    }
    out
}

/// Matrix product used by `Mat4 * Mat4`, picked at build configuration time
#[inline]
pub fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        mat4_mul_sse(a, b)
    }
    #[cfg(not(all(feature = "simd", target_arch = "x86_64")))]
    {
        mat4_mul_scalar(a, b)
    }
}

pub fn clamp(val: f32, lo: f32, hi: f32) -> f32 {
    lo.max(val.min(hi))
}

/// Linear blend: `t = 0` gives `v0`, `t = 1` gives `v1`
pub fn lerp<T>(t: f32, v0: T, v1: T) -> T
where
    T: Add<Output = T> + Mul<f32, Output = T>,
{
    v0 * (1.0 - t) + v1 * t
}

/// Barycentric combination of three attributes
pub fn interpolate<T>(values: &[T; 3], alpha: f32, beta: f32, gamma: f32) -> T
where
    T: Copy + Add<Output = T> + Mul<f32, Output = T>,
{
    values[0] * alpha + values[1] * beta + values[2] * gamma
}

/// Cheap hash of a 2D coordinate into (-1, 1). Stable for a given input,
/// used only to rotate sampling patterns.
pub fn rand_2to1(uv: Vec3) -> f32 {
    const A: f32 = 12.9898;
    const B: f32 = 78.233;
    const C: f32 = 43758.5453;
    let dt = uv.x * A + uv.y * B;
    let sn = dt % PI;
    (sn.sin() * C).fract()
}

/// Spiral Poisson-like disk of `N` offsets within the unit circle, rotated by
/// a hash of `seed`. `rings` is how many full turns the spiral makes.
pub fn poisson_disk_samples<const N: usize>(seed: Vec3, rings: usize) -> [Vec3; N] {
    let angle_step = 2.0 * PI * rings as f32 / N as f32;
    let inv_num_samples = 1.0 / N as f32;

    let mut angle = rand_2to1(seed) * 2.0 * PI;
    let mut radius = inv_num_samples;

    let mut disk = [Vec3::ZERO; N];
    for sample in disk.iter_mut() {
        *sample = Vec3::new(angle.cos(), angle.sin(), 0.0) * radius.powf(0.75);
        radius += inv_num_samples;
        angle += angle_step;
    }
    disk
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &Mat4, b: &Mat4, eps: f32) -> bool {
        (0..4).all(|i| (0..4).all(|j| (a.m[i][j] - b.m[i][j]).abs() < eps))
    }

    fn sample_matrix() -> Mat4 {
        Mat4::from_rows([
            2.0, 0.5, 1.0, 3.0,
            1.0, 4.0, -2.0, 0.0,
            0.0, 1.5, 3.0, -1.0,
            0.5, 0.0, 1.0, 2.0,
        ])
    }

    #[test]
    fn test_vec3_dot() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert!((a.dot(b) - 32.0).abs() < 0.001);
    }

    #[test]
    fn test_vec3_cross() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = a.cross(b);
        assert!((c.z - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_normalize_zero_is_nan() {
        assert!(Vec3::ZERO.normalized().x.is_nan());
        assert!(Vec3::ZERO.try_normalized().is_none());
        let mut v = Vec3::new(0.0, 3.0, 4.0);
        v.normalize();
        assert!((v.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let a = sample_matrix();
        assert!(a.determinant().abs() > 1e-3);
        let prod = a * a.inverse();
        assert!(approx_eq(&prod, &Mat4::identity(), 1e-4));
    }

    #[test]
    fn test_inverse_of_projection_chain() {
        let a = Mat4::persp(0.1, 50.0, 45f32.to_radians(), 1.0)
            * Mat4::look_at(Vec3::new(0.0, 5.0, 5.0), Vec3::ZERO, Vec3::UP)
            * Mat4::scale(0.2);
        let prod = a * a.inverse();
        assert!(approx_eq(&prod, &Mat4::identity(), 1e-4));
    }

    #[test]
    fn test_singular_inverse_is_identity() {
        let singular = Mat4::from_rows([
            1.0, 2.0, 3.0, 4.0,
            2.0, 4.0, 6.0, 8.0,
            0.0, 1.0, 0.0, 1.0,
            1.0, 0.0, 1.0, 0.0,
        ]);
        assert_eq!(singular.determinant(), 0.0);
        assert_eq!(singular.inverse(), Mat4::identity());
    }

    #[test]
    fn test_transpose_involution() {
        let a = sample_matrix();
        assert_eq!(a.transpose().transpose(), a);
        assert_eq!(a.transpose().m[0][3], a.m[3][0]);
    }

    #[test]
    fn test_determinant_of_scale() {
        assert!((Mat4::scale(2.0).determinant() - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_simd_matches_scalar() {
        let a = sample_matrix();
        let b = Mat4::rotation_y(0.3) * Mat4::translation(Vec3::new(1.0, -2.0, 0.5));
        assert!(approx_eq(&mat4_mul(&a, &b), &mat4_mul_scalar(&a, &b), 1e-6));
    }

    #[test]
    fn test_persp_near_far_planes() {
        let (near, far) = (0.1, 30.0);
        let p = Mat4::persp(near, far, 45f32.to_radians(), 4.0 / 3.0);

        let n = p * Vec4::new(0.0, 0.0, -near, 1.0);
        assert!((n.w - near).abs() < 1e-6);
        assert!((n.z / n.w + 1.0).abs() < 1e-4);

        let f = p * Vec4::new(0.0, 0.0, -far, 1.0);
        assert!((f.z / f.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_ortho_maps_near_to_one() {
        let o = Mat4::ortho(0.01, 50.0, 8.0);
        let n = o * Vec4::new(8.0, -8.0, -0.01, 1.0);
        assert!((n.z - 1.0).abs() < 1e-4);
        assert!((n.x - 1.0).abs() < 1e-6 && (n.y + 1.0).abs() < 1e-6);
        let f = o * Vec4::new(0.0, 0.0, -50.0, 1.0);
        assert!((f.z + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_look_at_moves_target_onto_negative_z() {
        let eye = Vec3::new(0.0, 6.0, 6.0);
        let view = Mat4::look_at(eye, Vec3::ZERO, Vec3::UP);
        let t = view.transform_point(Vec3::ZERO);
        assert!(t.x.abs() < 1e-5 && t.y.abs() < 1e-5);
        assert!((t.z + eye.norm()).abs() < 1e-4);
        assert!(view.transform_point(eye).norm() < 1e-5);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(0.0, 2.0f32, 6.0), 2.0);
        assert_eq!(lerp(1.0, 2.0f32, 6.0), 6.0);
        assert_eq!(lerp(0.5, 2.0f32, 6.0), 4.0);
    }

    #[test]
    fn test_poisson_disk_is_stable_and_bounded() {
        let seed = Vec3::new(0.31, 0.72, 0.5);
        let a: [Vec3; 16] = poisson_disk_samples(seed, 10);
        let b: [Vec3; 16] = poisson_disk_samples(seed, 10);
        assert_eq!(a, b);
        assert!(a.iter().all(|s| s.norm() <= 1.0 + 1e-5 && s.z == 0.0));
        assert!((a[15].norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rand_2to1_range() {
        for i in 0..50 {
            let r = rand_2to1(Vec3::new(i as f32 * 0.37, i as f32 * 1.3, 0.0));
            assert!(r > -1.0 && r < 1.0);
        }
    }
}
