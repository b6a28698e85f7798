//! Scene descriptions: serializable camera, models, lights and settings
//!
//! Stored as RON. A description is turned into a renderable
//! [`Scene`] by [`SceneDescription::build`], which loads every asset up front
//! so rendering itself cannot fail.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::rasterizer::{
    Camera, Light, Mat4, Material, Model, RenderSettings, RgbColor, Scene, ShaderKind, Vec3,
};
use super::obj::{load_obj, LoadError};
use super::primitives;

/// Error type for scene loading
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("scene {0} is not pre-defined")]
    UnknownScene(String),
    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub fov_degrees: f32,
    /// Defaults to the image's width / height
    pub aspect_ratio: Option<f32>,
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        let cam = Camera::default();
        Self {
            fov_degrees: cam.fov,
            aspect_ratio: None,
            eye: cam.eye_pos,
            center: cam.center,
            up: cam.up,
            near: cam.near,
            far: cam.far,
        }
    }
}

/// Where a model's geometry comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSource {
    /// OBJ file, relative paths resolve against the scene file's directory
    Obj(PathBuf),
    Cube,
    Plane { half_extent: f32 },
    Triangle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub source: ModelSource,
    #[serde(default = "unit_scale")]
    pub scale: f32,
    /// Degrees about X, applied after Y
    #[serde(default)]
    pub rotate_x: f32,
    /// Degrees about Y
    #[serde(default)]
    pub rotate_y: f32,
    #[serde(default)]
    pub translation: Vec3,
    /// Diffuse color for procedural sources; OBJ models use their MTL
    #[serde(default)]
    pub color: Option<RgbColor>,
}

fn unit_scale() -> f32 {
    1.0
}

impl ModelDescription {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            scale: 1.0,
            rotate_x: 0.0,
            rotate_y: 0.0,
            translation: Vec3::ZERO,
            color: None,
        }
    }

    /// Load geometry and apply scale, rotation and translation in that order
    pub fn build(&self, base_dir: &Path) -> Result<Model, LoadError> {
        let material = || {
            Arc::new(match self.color {
                Some(c) => Material::with_diffuse("color", c),
                None => Material::default(),
            })
        };
        let mut model = match &self.source {
            ModelSource::Obj(path) => load_obj(base_dir.join(path))?,
            ModelSource::Cube => Model::from_meshes(vec![primitives::cube(material())]),
            ModelSource::Plane { half_extent } => {
                Model::from_meshes(vec![primitives::plane(*half_extent, material())])
            }
            ModelSource::Triangle => Model::from_meshes(vec![primitives::triangle(material())]),
        };
        model.scale(self.scale);
        model.apply(Mat4::rotation_y(self.rotate_y.to_radians()));
        model.apply(Mat4::rotation_x(self.rotate_x.to_radians()));
        model.apply(Mat4::translation(self.translation));
        Ok(model)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDescription {
    pub position: Vec3,
    pub intensity: Vec3,
    #[serde(default = "default_light_up")]
    pub up: Vec3,
    /// Point the shadow camera looks at
    #[serde(default)]
    pub focal: Vec3,
}

fn default_light_up() -> Vec3 {
    Vec3::UP
}

impl LightDescription {
    pub fn new(position: Vec3, intensity: Vec3) -> Self {
        Self {
            position,
            intensity,
            up: Vec3::UP,
            focal: Vec3::ZERO,
        }
    }
}

/// Everything needed to render one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub shader: ShaderKind,
    #[serde(default)]
    pub camera: CameraDescription,
    #[serde(default)]
    pub models: Vec<ModelDescription>,
    #[serde(default)]
    pub lights: Vec<LightDescription>,
    #[serde(default)]
    pub settings: RenderSettings,
}

impl SceneDescription {
    pub fn new(width: usize, height: usize, shader: ShaderKind) -> Self {
        Self {
            width,
            height,
            shader,
            camera: CameraDescription::default(),
            models: Vec::new(),
            lights: Vec::new(),
            settings: RenderSettings::default(),
        }
    }

    pub fn camera(&self) -> Camera {
        let c = &self.camera;
        let aspect = c
            .aspect_ratio
            .unwrap_or(self.width as f32 / self.height.max(1) as f32);
        Camera::new(c.fov_degrees, aspect, c.eye, c.up, c.center, c.near, c.far)
    }

    /// Load every model and texture, then assemble the scene
    pub fn build(&self, base_dir: &Path) -> Result<Scene, SceneError> {
        let mut scene = Scene::new(self.width, self.height, self.shader.shader(), self.settings.clone());
        scene.set_camera(self.camera());

        for desc in &self.models {
            scene.add_model(desc.build(base_dir)?);
        }
        for l in &self.lights {
            let light = Light::with_target(
                l.position,
                l.intensity,
                l.up,
                l.focal,
                self.settings.shadow_map_resolution,
            );
            if light.has_parallel_up() {
                log::warn!(
                    "Light at {:?}: up {:?} is parallel to its view direction, using {:?}",
                    l.position,
                    l.up,
                    light.shadow_up()
                );
            }
            scene.add_light(light);
        }

        log::info!(
            "Scene ready: {}x{}, {} models, {} triangles, {} lights",
            self.width,
            self.height,
            scene.models.len(),
            scene.models.iter().map(Model::triangle_count).sum::<usize>(),
            scene.lights.len()
        );
        Ok(scene)
    }
}

/// Load a scene description from a RON file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneDescription, SceneError> {
    let contents = fs::read_to_string(path)?;
    load_scene_from_str(&contents)
}

/// Save a scene description to a RON file
pub fn save_scene<P: AsRef<Path>>(scene: &SceneDescription, path: P) -> Result<(), SceneError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(scene, config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Load a scene description from a RON string (for embedded scenes or testing)
pub fn load_scene_from_str(s: &str) -> Result<SceneDescription, SceneError> {
    Ok(ron::from_str(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"(
        width: 32,
        height: 16,
        models: [
            (source: Triangle, color: Some((x: 1.0, y: 0.0, z: 0.0))),
        ],
    )"#;

    #[test]
    fn test_minimal_scene_uses_defaults() {
        let desc = load_scene_from_str(MINIMAL).unwrap();
        assert_eq!((desc.width, desc.height), (32, 16));
        assert_eq!(desc.shader, ShaderKind::Texture);
        assert_eq!(desc.settings, RenderSettings::default());
        assert_eq!(desc.models[0].scale, 1.0);
        assert!(desc.lights.is_empty());
        assert!((desc.camera().aspect_ratio - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_save_and_reload() {
        let mut desc = SceneDescription::new(64, 48, ShaderKind::BlinnPhong);
        desc.models.push(ModelDescription::new(ModelSource::Plane { half_extent: 4.0 }));
        desc.models.push(ModelDescription::new(ModelSource::Obj(PathBuf::from("assets/mug/mug.obj"))));
        desc.lights.push(LightDescription::new(Vec3::new(1.0, 5.0, 1.0), Vec3::splat(50.0)));
        desc.settings.shadow_mode = crate::rasterizer::ShadowMode::Pcf;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");
        save_scene(&desc, &path).unwrap();
        assert_eq!(load_scene(&path).unwrap(), desc);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(load_scene_from_str("(width: )"), Err(SceneError::Parse(_))));
        assert!(matches!(load_scene("missing.ron"), Err(SceneError::Io(_))));
    }

    #[test]
    fn test_build_applies_transform_order() {
        let mut desc = ModelDescription::new(ModelSource::Triangle);
        desc.scale = 2.0;
        desc.rotate_y = 90.0;
        desc.translation = Vec3::new(0.0, 0.0, -3.0);
        let model = desc.build(Path::new(".")).unwrap();
        // (1, 0, 0) -> scaled (2, 0, 0) -> rotated onto -Z -> translated
        let p = model.model_matrix().transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5 && (p.z + 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_build_reports_missing_obj() {
        let mut desc = SceneDescription::new(8, 8, ShaderKind::Normal);
        desc.models.push(ModelDescription::new(ModelSource::Obj(PathBuf::from("nope.obj"))));
        assert!(matches!(desc.build(Path::new(".")), Err(SceneError::Load(LoadError::Io { .. }))));
    }
}
