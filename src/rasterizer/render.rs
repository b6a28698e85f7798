//! Frame rendering: shadow pass, main pass and supersample resolve
//!
//! Both passes run in two stages. Triangle setup (transform, cull, bounds)
//! is parallel over triangles. Pixel work is parallel over disjoint bands of
//! rows, and every band walks the set-up triangles in submission order, so
//! each pixel sees the same compare-and-write sequence as a serial render.

use rayon::prelude::*;

use super::camera::Camera;
use super::light::{Light, ShadowMode};
use super::math::{interpolate, Mat4, Vec3};
use super::shader::{FragmentPayload, Shader, ShadingLight};
use super::types::{Color, Material, Mesh, Model, RenderSettings, RgbColor, Triangle, Vertex};

/// Samples per pixel along each axis when antialiasing
pub const AA_SAMPLE_RATIO: usize = 2;
const AA_SAMPLE_STEP: f32 = 1.0 / AA_SAMPLE_RATIO as f32;
const AA_SAMPLE_OFFSET: f32 = AA_SAMPLE_STEP / 2.0;

/// Depth of an untouched sample. Stored depths are view-space z, so nearer
/// is larger.
pub const DEPTH_CLEAR: f32 = f32::NEG_INFINITY;

/// Resolved pixels plus per-sample color and depth
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
    /// Final colors, row-major, top row first
    pub pixels: Vec<RgbColor>,
    /// `samples_per_pixel` entries per pixel
    pub color_samples: Vec<RgbColor>,
    pub depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize, antialias: bool) -> Self {
        let samples_per_pixel = if antialias { AA_SAMPLE_RATIO * AA_SAMPLE_RATIO } else { 1 };
        let samples = width * height * samples_per_pixel;
        Self {
            width,
            height,
            samples_per_pixel,
            pixels: vec![Vec3::ZERO; width * height],
            color_samples: vec![Vec3::ZERO; samples],
            depth: vec![DEPTH_CLEAR; samples],
        }
    }

    pub fn clear(&mut self, background: RgbColor) {
        self.pixels.fill(background);
        self.color_samples.fill(background);
        self.depth.fill(DEPTH_CLEAR);
    }

    pub fn pixel(&self, x: usize, y: usize) -> RgbColor {
        self.pixels[y * self.width + x]
    }

    /// Quantized RGBA bytes, 4 per pixel
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| Color::from_rgb(*c).to_bytes())
            .collect()
    }

    /// Quantized RGB bytes, 3 per pixel
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| {
                let c = Color::from_rgb(*c);
                [c.r, c.g, c.b]
            })
            .collect()
    }
}

/// Sample position inside pixel `(x, y)`
fn sample_position(x: usize, y: usize, sample: usize, samples_per_pixel: usize) -> (f32, f32) {
    if samples_per_pixel == 1 {
        return (x as f32 + 0.5, y as f32 + 0.5);
    }
    (
        x as f32 + AA_SAMPLE_OFFSET + AA_SAMPLE_STEP * (sample % AA_SAMPLE_RATIO) as f32,
        y as f32 + AA_SAMPLE_OFFSET + AA_SAMPLE_STEP * (sample / AA_SAMPLE_RATIO) as f32,
    )
}

/// Half-open pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
}

impl Bounds {
    /// Bounding box of the x/y projection clipped to `width` x `height`.
    /// `None` when empty or when a coordinate is not finite.
    fn of(tri: &Triangle, width: usize, height: usize) -> Option<Self> {
        let coords = tri.v.map(|v| v.coord);
        if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return None;
        }
        let min_x = coords.iter().map(|c| c.x).fold(f32::INFINITY, f32::min).floor().max(0.0);
        let min_y = coords.iter().map(|c| c.y).fold(f32::INFINITY, f32::min).floor().max(0.0);
        let max_x = coords.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max).ceil().min(width as f32);
        let max_y = coords.iter().map(|c| c.y).fold(f32::NEG_INFINITY, f32::max).ceil().min(height as f32);
        if min_x >= max_x || min_y >= max_y {
            return None;
        }
        Some(Self {
            x0: min_x as usize,
            x1: max_x as usize,
            y0: min_y as usize,
            y1: max_y as usize,
        })
    }

    /// Rows of this box inside band `[band_y0, band_y1)`
    fn rows_in(&self, band_y0: usize, band_y1: usize) -> std::ops::Range<usize> {
        self.y0.max(band_y0)..self.y1.min(band_y1)
    }
}

/// A triangle ready for the main pass
struct ScreenTriangle<'a> {
    /// Pixel-space coords, view-space normals
    tri: Triangle,
    view_pos: [Vec3; 3],
    world_pos: [Vec3; 3],
    /// Sign-adjusted clip w per vertex
    ws: [f32; 3],
    bounds: Bounds,
    material: &'a Material,
}

enum Setup<'a> {
    Visible(ScreenTriangle<'a>),
    Culled,
    Degenerate,
}

/// Per-model transforms, computed once per frame
struct ModelTransforms {
    model: Mat4,
    view_model: Mat4,
    normal: Mat4,
    mvp: Mat4,
}

/// Counters from the last `render` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Triangles that reached the rasterizer
    pub triangles: usize,
    pub culled: usize,
    /// Skipped for `w == 0` or zero screen area
    pub skipped_degenerate: usize,
}

/// Camera, models, lights and the target buffers
pub struct Scene {
    pub camera: Camera,
    pub models: Vec<Model>,
    pub lights: Vec<Light>,
    pub shader: Shader,
    pub settings: RenderSettings,
    framebuffer: Framebuffer,
}

impl Scene {
    /// Empty scene with a default camera matching the target aspect ratio
    pub fn new(width: usize, height: usize, shader: Shader, settings: RenderSettings) -> Self {
        let camera = Camera {
            aspect_ratio: width as f32 / height.max(1) as f32,
            ..Camera::default()
        };
        let mut framebuffer = Framebuffer::new(width, height, settings.antialias);
        framebuffer.clear(settings.background);
        Self {
            camera,
            models: Vec::new(),
            lights: Vec::new(),
            shader,
            settings,
            framebuffer,
        }
    }

    pub fn width(&self) -> usize {
        self.framebuffer.width
    }

    pub fn height(&self) -> usize {
        self.framebuffer.height
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn add_model(&mut self, model: Model) {
        self.models.push(model);
    }

    /// Add a light, resizing its shadow map to the scene's resolution
    pub fn add_light(&mut self, mut light: Light) {
        let res = self.settings.shadow_map_resolution.max(1);
        if light.resolution() != res {
            light = Light::with_target(light.position, light.intensity, light.up, light.focal, res);
        }
        self.lights.push(light);
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Reset colors to the background and depths to [`DEPTH_CLEAR`]
    pub fn clear(&mut self) {
        let spp = if self.settings.antialias { AA_SAMPLE_RATIO * AA_SAMPLE_RATIO } else { 1 };
        if self.framebuffer.samples_per_pixel != spp {
            self.framebuffer = Framebuffer::new(self.framebuffer.width, self.framebuffer.height, self.settings.antialias);
        }
        self.framebuffer.clear(self.settings.background);
    }

    /// Shadow pass then main pass into the current buffers
    pub fn render(&mut self) -> FrameStats {
        if self.settings.shadow_mode != ShadowMode::Off && !self.lights.is_empty() {
            self.compute_depth_textures();
        }
        let stats = self.rasterize_triangles();
        log::debug!(
            "Frame: {} triangles drawn, {} culled, {} degenerate",
            stats.triangles, stats.culled, stats.skipped_degenerate
        );
        stats
    }

    /// Rebuild every light's depth texture from the current models
    pub fn compute_depth_textures(&mut self) {
        let Scene { models, lights, settings, .. } = self;
        let band_rows = settings.band_rows.max(1);

        for light in lights.iter_mut() {
            light.reset_depth_texture();
            let res = light.resolution();
            let vp = Light::correction_matrix() * light.view_projection();

            let mut triangles = Vec::new();
            for model in models.iter() {
                let cmvp = vp * model.model_matrix();
                for mesh in &model.meshes {
                    triangles.par_extend(
                        mesh.triangles
                            .par_iter()
                            .filter_map(|t| setup_depth_triangle(t, &cmvp, res)),
                    );
                }
            }

            let written: usize = light
                .depth
                .data
                .par_chunks_mut(res * band_rows)
                .enumerate()
                .map(|(band, texels)| {
                    let band_y0 = band * band_rows;
                    let band_y1 = band_y0 + texels.len() / res;
                    triangles
                        .iter()
                        .map(|(tri, bounds)| draw_depth(tri, bounds, band_y0, band_y1, res, texels))
                        .sum::<usize>()
                })
                .sum();
            log::debug!(
                "Shadow map {}x{}: {} triangles, {} texel writes",
                res, res, triangles.len(), written
            );
        }
    }

    fn rasterize_triangles(&mut self) -> FrameStats {
        let Scene { camera, models, lights, shader, settings, framebuffer } = self;
        let (width, height) = (framebuffer.width, framebuffer.height);
        let mut stats = FrameStats::default();
        if width == 0 || height == 0 {
            return stats;
        }

        let view = camera.view_matrix();
        let proj = camera.projection_matrix();
        let depth_range = ((camera.far - camera.near) / 2.0, (camera.far + camera.near) / 2.0);

        let backface_cull = settings.backface_cull;
        let mut triangles = Vec::new();
        for model in models.iter() {
            let model_mat = model.model_matrix();
            let view_model = view * model_mat;
            let transforms = ModelTransforms {
                model: model_mat,
                view_model,
                normal: view_model.inverse().transpose(),
                mvp: proj * view_model,
            };
            for mesh in &model.meshes {
                let setups: Vec<Setup> = mesh
                    .triangles
                    .par_iter()
                    .map(|t| setup_triangle(t, mesh, &transforms, width, height, depth_range, backface_cull))
                    .collect();
                for setup in setups {
                    match setup {
                        Setup::Visible(t) => triangles.push(t),
                        Setup::Culled => stats.culled += 1,
                        Setup::Degenerate => stats.skipped_degenerate += 1,
                    }
                }
            }
        }
        stats.triangles = triangles.len();

        let shading_lights: Vec<ShadingLight> = lights
            .iter()
            .map(|l| ShadingLight { position: view.transform_point(l.position), intensity: l.intensity })
            .collect();
        let frame = FrameContext {
            lights: lights.as_slice(),
            shading_lights: &shading_lights,
            shader: *shader,
            shadow_mode: settings.shadow_mode,
            ambient_intensity: settings.ambient_intensity,
            width,
            spp: framebuffer.samples_per_pixel,
        };

        let band_rows = settings.band_rows.max(1);
        let spp = framebuffer.samples_per_pixel;
        let Framebuffer { pixels, color_samples, depth, .. } = framebuffer;
        pixels
            .par_chunks_mut(width * band_rows)
            .zip(color_samples.par_chunks_mut(width * band_rows * spp))
            .zip(depth.par_chunks_mut(width * band_rows * spp))
            .enumerate()
            .for_each(|(band, ((pixels, colors), depths))| {
                let band_y0 = band * band_rows;
                let mut target = Band {
                    y0: band_y0,
                    y1: band_y0 + pixels.len() / width,
                    pixels,
                    colors,
                    depths,
                };
                for tri in &triangles {
                    frame.draw(tri, &mut target);
                }
            });

        stats
    }
}

/// Project a triangle for the main pass
fn setup_triangle<'a>(
    triangle: &Triangle,
    mesh: &'a Mesh,
    transforms: &ModelTransforms,
    width: usize,
    height: usize,
    (f1, f2): (f32, f32),
    backface_cull: bool,
) -> Setup<'a> {
    let mut screen = [Vertex::default(); 3];
    let mut ws = [0.0; 3];
    let mut view_pos = [Vec3::ZERO; 3];
    let mut world_pos = [Vec3::ZERO; 3];

    for (i, vertex) in triangle.v.iter().enumerate() {
        let clip = transforms.mvp * vertex.coord.to_vec4(1.0);
        if clip.w == 0.0 {
            return Setup::Degenerate;
        }
        let mut ndc = clip.xyz() / clip.w;
        if clip.w < 0.0 {
            ndc.x = -ndc.x;
            ndc.y = -ndc.y;
            ws[i] = clip.w;
        } else {
            ws[i] = -clip.w;
        }

        let normal = transforms.normal.transform_dir(vertex.normal);
        screen[i] = Vertex {
            coord: Vec3::new(
                0.5 * width as f32 * (ndc.x + 1.0),
                0.5 * height as f32 * (1.0 - ndc.y),
                ndc.z * f1 + f2,
            ),
            color: vertex.color,
            normal: normal.try_normalized().unwrap_or(normal),
            texture_coord: vertex.texture_coord,
        };
        view_pos[i] = transforms.view_model.transform_point(vertex.coord);
        world_pos[i] = transforms.model.transform_point(vertex.coord);
    }

    let tri = Triangle::new(screen);
    let area = tri.signed_area();
    if area == 0.0 || !area.is_finite() {
        return Setup::Degenerate;
    }
    if backface_cull && area > 0.0 {
        return Setup::Culled;
    }
    match Bounds::of(&tri, width, height) {
        Some(bounds) => Setup::Visible(ScreenTriangle {
            tri,
            view_pos,
            world_pos,
            ws,
            bounds,
            material: &mesh.material,
        }),
        // entirely off screen
        None => Setup::Culled,
    }
}

/// Project a triangle into texel space of a depth texture
fn setup_depth_triangle(triangle: &Triangle, cmvp: &Mat4, res: usize) -> Option<(Triangle, Bounds)> {
    let size = res as f32;
    let tri = Triangle::new(triangle.v.map(|v| {
        let p = cmvp.transform_point(v.coord);
        Vertex::from_pos(size * p.x, size * (1.0 - p.y), p.z)
    }));
    if tri.signed_area() == 0.0 {
        return None;
    }
    Bounds::of(&tri, res, res).map(|b| (tri, b))
}

/// Write the max depth of `tri` into the rows of one band, returning the
/// number of texels updated
fn draw_depth(tri: &Triangle, bounds: &Bounds, band_y0: usize, band_y1: usize, res: usize, texels: &mut [f32]) -> usize {
    let z = [tri.v[0].coord.z, tri.v[1].coord.z, tri.v[2].coord.z];
    let mut written = 0;
    for y in bounds.rows_in(band_y0, band_y1) {
        let row = (y - band_y0) * res;
        for x in bounds.x0..bounds.x1 {
            let (xf, yf) = (x as f32 + 0.5, y as f32 + 0.5);
            if !tri.inside(Vec3::new(xf, yf, 0.0)) {
                continue;
            }
            // orthographic light: depth is affine in screen space
            let (alpha, beta, gamma) = tri.barycentric_2d(xf, yf);
            let depth = interpolate(&z, alpha, beta, gamma);
            let texel = &mut texels[row + x];
            if depth > *texel {
                *texel = depth;
                written += 1;
            }
        }
    }
    written
}

/// Rows `[y0, y1)` of the framebuffer owned by one worker
struct Band<'a> {
    y0: usize,
    y1: usize,
    pixels: &'a mut [RgbColor],
    colors: &'a mut [RgbColor],
    depths: &'a mut [f32],
}

/// Read-only state shared by every band
struct FrameContext<'a> {
    lights: &'a [Light],
    shading_lights: &'a [ShadingLight],
    shader: Shader,
    shadow_mode: ShadowMode,
    ambient_intensity: f32,
    width: usize,
    spp: usize,
}

impl FrameContext<'_> {
    /// Summed light visibility, 1 with no lights
    fn visibility(&self, world: Vec3) -> f32 {
        if self.lights.is_empty() {
            return 1.0;
        }
        self.lights
            .iter()
            .map(|l| l.compute_visibility(world, self.shadow_mode))
            .sum::<f32>()
            .min(1.0)
    }

    fn draw(&self, st: &ScreenTriangle, band: &mut Band) {
        let tri = &st.tri;
        let [w0, w1, w2] = st.ws;

        for y in st.bounds.rows_in(band.y0, band.y1) {
            for x in st.bounds.x0..st.bounds.x1 {
                let pixel = (y - band.y0) * self.width + x;
                let mut written = false;

                for i in 0..self.spp {
                    let (xf, yf) = sample_position(x, y, i, self.spp);
                    if !tri.inside(Vec3::new(xf, yf, 0.0)) {
                        continue;
                    }
                    let (alpha, beta, gamma) = tri.barycentric_2d(xf, yf);
                    let (a, b, g) = (alpha / w0, beta / w1, gamma / w2);
                    let z = 1.0 / (a + b + g);

                    let sample = pixel * self.spp + i;
                    // NaN depths never pass
                    if !(z > band.depths[sample]) {
                        continue;
                    }

                    let corrected = |values: [Vec3; 3]| interpolate(&values, a, b, g) * z;
                    let normal = corrected(tri.v.map(|v| v.normal));
                    let screen_z = corrected(tri.v.map(|v| Vec3::splat(v.coord.z))).x;
                    let payload = FragmentPayload {
                        normal: normal.try_normalized().unwrap_or(Vec3::ZERO),
                        view_position: corrected(st.view_pos),
                        screen_position: Vec3::new(xf, yf, screen_z),
                        texture_coord: corrected(tri.v.map(|v| v.texture_coord)),
                        color: corrected(tri.v.map(|v| v.color)),
                        material: st.material,
                        eye_pos: Vec3::ZERO,
                        lights: self.shading_lights,
                        ambient_intensity: self.ambient_intensity,
                    };
                    let visibility = self.visibility(corrected(st.world_pos));

                    band.colors[sample] = (self.shader)(&payload) * visibility;
                    band.depths[sample] = z;
                    written = true;
                }

                if written {
                    let start = pixel * self.spp;
                    let sum = band.colors[start..start + self.spp]
                        .iter()
                        .fold(Vec3::ZERO, |acc, c| acc + *c);
                    band.pixels[pixel] = sum / self.spp as f32;
                }
            }
        }
    }
}
