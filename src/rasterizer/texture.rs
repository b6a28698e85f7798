//! 2D texel grids with nearest and bilinear sampling
//!
//! UV space is bottom-left origin, images are stored top row first, so the
//! V axis is flipped on lookup: `v_img = (1 - v) * (height - 1)`.

use std::ops::{Add, Mul};
use std::path::Path;

use serde::{Serialize, Deserialize};

use super::math::{clamp, lerp, Vec3};
use super::types::RgbColor;

/// How UVs outside [0, 1] are folded back in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WrapMode {
    /// Keep the fractional part
    #[default]
    Repeat,
    /// Saturate to [0, 1]
    Clamp,
}

/// Anything that can be stored in a texture and blended
pub trait Texel: Copy + Default + Send + Sync + Add<Output = Self> + Mul<f32, Output = Self> {}

impl<T> Texel for T where T: Copy + Default + Send + Sync + Add<Output = T> + Mul<f32, Output = T> {}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to load texture {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to decode texture {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

/// Row-major grid of texels
#[derive(Debug, Clone)]
pub struct Texture<T> {
    pub width: usize,
    pub height: usize,
    pub data: Vec<T>,
    pub name: String,
}

/// Surface color texture
pub type RgbTexture = Texture<RgbColor>;

/// Per-light shadow map
pub type DepthTexture = Texture<f32>;

impl<T: Texel> Texture<T> {
    /// Zero dimensions are raised to 1 so lookups always have a texel
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    pub fn filled(width: usize, height: usize, value: T) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            data: vec![value; width * height],
            name: String::new(),
        }
    }

    /// Build from `f(x, y)`, `y = 0` being the top row. Like
    /// [`Texture::new`], never smaller than 1x1.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data, name: String::new() }
    }

    /// Overwrite every texel, keeping the allocation
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|t| *t = value);
    }

    /// Texel at image coordinates (top-left origin)
    pub fn at(&self, x: usize, y: usize) -> T {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[y * self.width + x] = value;
    }

    /// Nearest-texel lookup
    pub fn get(&self, u: f32, v: f32, mode: WrapMode) -> T {
        let (u, v) = wrap(u, v, mode);
        let u_img = u * (self.width - 1) as f32;
        let v_img = (1.0 - v) * (self.height - 1) as f32;
        let x = (u_img.floor() as usize).min(self.width - 1);
        let y = (v_img.floor() as usize).min(self.height - 1);
        self.at(x, y)
    }

    /// 4-tap bilinear lookup
    pub fn get_bilinear(&self, u: f32, v: f32, mode: WrapMode) -> T {
        let (u, v) = wrap(u, v, mode);
        let u_img = u * (self.width - 1) as f32;
        let v_img = (1.0 - v) * (self.height - 1) as f32;

        let (u_f, v_f) = (u_img.floor(), v_img.floor());
        // floor and ceil only coincide on exact integers; keep the upper tap
        // inside the grid at u or v == 1
        let x0 = (u_f as usize).min(self.width - 1);
        let y0 = (v_f as usize).min(self.height - 1);
        let x1 = (u_img.ceil() as usize).min(self.width - 1);
        let y1 = (v_img.ceil() as usize).min(self.height - 1);

        let (tu, tv) = (u_img - u_f, v_img - v_f);
        let top = lerp(tu, self.at(x0, y0), self.at(x1, y0));
        let bottom = lerp(tu, self.at(x0, y1), self.at(x1, y1));
        lerp(tv, top, bottom)
    }
}

fn wrap(u: f32, v: f32, mode: WrapMode) -> (f32, f32) {
    match mode {
        WrapMode::Clamp => (clamp(u, 0.0, 1.0), clamp(v, 0.0, 1.0)),
        WrapMode::Repeat => (repeat(u), repeat(v)),
    }
}

/// Fractional part folded into [0, 1), negative inputs included
fn repeat(t: f32) -> f32 {
    let f = t - t.floor();
    if f >= 1.0 { 0.0 } else { f }
}

impl Texture<RgbColor> {
    /// Load an image file; channels are normalized to [0, 1], alpha dropped
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TextureError::Image {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let tex = Self::from_rgba(img.to_rgba8(), name);
        log::info!("Loaded texture {} ({}x{})", path.display(), tex.width, tex.height);
        Ok(tex)
    }

    /// Decode an in-memory image
    pub fn from_bytes(bytes: &[u8], name: String) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes).map_err(|source| TextureError::Decode {
            name: name.clone(),
            source,
        })?;
        Ok(Self::from_rgba(img.to_rgba8(), name))
    }

    fn from_rgba(rgba: image::RgbaImage, name: String) -> Self {
        let (width, height) = rgba.dimensions();
        let data = rgba
            .pixels()
            .map(|p| Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32).rgb_normalized())
            .collect();

        Self {
            width: width as usize,
            height: height as usize,
            data,
            name,
        }
    }

    /// Create a checkerboard test texture with `cell`-texel squares
    pub fn checkerboard(width: usize, height: usize, cell: usize, color1: RgbColor, color2: RgbColor) -> Self {
        let cell = cell.max(1);
        let mut tex = Self::from_fn(width, height, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 { color1 } else { color2 }
        });
        tex.name = "checkerboard".to_string();
        tex
    }
}
