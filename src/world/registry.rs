//! Named built-in scenes

use std::path::{Path, PathBuf};

use crate::rasterizer::{ShaderKind, Vec3};
use super::scene::{
    load_scene, CameraDescription, LightDescription, ModelDescription, ModelSource, SceneDescription,
    SceneError,
};

pub type SceneFactory = fn() -> SceneDescription;

/// Explicit name -> factory table, built once at startup and passed to
/// whoever needs to resolve scene names
#[derive(Debug, Clone, Default)]
pub struct SceneRegistry {
    entries: Vec<(&'static str, SceneFactory)>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing an existing entry
    pub fn register(&mut self, name: &'static str, factory: SceneFactory) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((name, factory)),
        }
    }

    /// Scenes shipped with the renderer
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("shoe", shoe_scene);
        registry.register("rem", rem_scene);
        registry.register("mug", mug_scene);
        registry.register("tree", tree_scene);
        registry.register("cube", cube_scene);
        registry.register("shadow", shadow_scene);
        registry
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn get(&self, name: &str) -> Result<SceneDescription, SceneError> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, factory)| factory())
            .ok_or_else(|| SceneError::UnknownScene(name.to_string()))
    }

    /// A `.ron` path loads from disk with assets relative to that file;
    /// anything else is looked up by name with assets relative to the
    /// working directory.
    pub fn resolve(&self, scene: &str) -> Result<(SceneDescription, PathBuf), SceneError> {
        let path = Path::new(scene);
        if path.extension().is_some_and(|ext| ext == "ron") {
            let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            return Ok((load_scene(path)?, base_dir));
        }
        Ok((self.get(scene)?, PathBuf::new()))
    }
}

/// Up vector perpendicular to the view direction and the X axis
fn up_from_x(eye: Vec3, center: Vec3) -> Vec3 {
    (center - eye).cross(Vec3::new(-1.0, 0.0, 0.0)).normalized()
}

fn obj(path: &str, scale: f32) -> ModelDescription {
    ModelDescription {
        scale,
        ..ModelDescription::new(ModelSource::Obj(PathBuf::from(path)))
    }
}

fn shoe_scene() -> SceneDescription {
    let mut scene = SceneDescription::new(800, 800, ShaderKind::Normal);
    scene.camera = CameraDescription {
        fov_degrees: 45.0,
        aspect_ratio: Some(1.0),
        eye: Vec3::new(0.0, 6.0, 6.0),
        center: Vec3::ZERO,
        up: Vec3::UP,
        near: 0.1,
        far: 30.0,
    };
    scene.models.push(obj("assets/shoe/Black_shoe.obj", 0.2));
    scene
}

fn rem_scene() -> SceneDescription {
    let eye = Vec3::new(0.0, 1.2, 3.0);
    let center = Vec3::new(0.0, 0.5, 0.0);
    let mut scene = SceneDescription::new(800, 800, ShaderKind::Texture);
    scene.camera = CameraDescription {
        fov_degrees: 45.0,
        aspect_ratio: None,
        eye,
        center,
        up: up_from_x(eye, center),
        near: 0.1,
        far: 50.0,
    };
    scene.models.push(obj("assets/rem/Rem.obj", 1.0));
    scene.lights.push(LightDescription::new(Vec3::new(0.0, 5.0, 3.0), Vec3::splat(500.0)));
    scene
}

fn mug_scene() -> SceneDescription {
    let eye = Vec3::new(0.0, 6.0, 6.0);
    let center = Vec3::new(0.0, 0.04, 0.0);
    let mut scene = SceneDescription::new(800, 800, ShaderKind::Texture);
    scene.camera = CameraDescription {
        fov_degrees: 45.0,
        aspect_ratio: Some(1.0),
        eye,
        center,
        up: up_from_x(eye, center),
        near: 0.01,
        far: 50.0,
    };
    scene.models.push(obj("assets/mug/teamugobj.obj", 0.3));
    scene.lights.push(LightDescription::new(Vec3::new(7.0, 7.0, 0.0), Vec3::splat(300.0)));
    scene
}

fn tree_scene() -> SceneDescription {
    let eye = Vec3::new(0.3, -4.05739, 4.46067);
    let center = Vec3::new(0.0, 0.0, 0.5);
    let mut scene = SceneDescription::new(800, 800, ShaderKind::Texture);
    scene.camera = CameraDescription {
        fov_degrees: 45.0,
        aspect_ratio: Some(1.0),
        eye,
        center,
        up: up_from_x(eye, center),
        near: 0.01,
        far: 50.0,
    };
    scene.models.push(obj("assets/tree/12150_Christmas_Tree_V2_L2.obj", 0.017));
    scene.lights.push(LightDescription::new(Vec3::new(0.0, -6.0, 0.6), Vec3::splat(30.0)));
    scene.lights.push(LightDescription::new(Vec3::new(0.0, 3.0, 0.6), Vec3::splat(80.0)));
    scene
}

/// Lit, rotated cube; needs no asset files
fn cube_scene() -> SceneDescription {
    let mut scene = SceneDescription::new(640, 480, ShaderKind::Texture);
    scene.camera.eye = Vec3::new(0.0, 2.5, 6.0);
    scene.models.push(ModelDescription {
        rotate_x: 20.0,
        rotate_y: 30.0,
        color: Some(Vec3::new(0.8, 0.45, 0.25)),
        ..ModelDescription::new(ModelSource::Cube)
    });
    scene.lights.push(LightDescription::new(Vec3::new(4.0, 6.0, 5.0), Vec3::splat(80.0)));
    scene.settings.shadow_map_resolution = 1024;
    scene
}

/// Cube floating over a floor, casting a soft shadow
fn shadow_scene() -> SceneDescription {
    let mut scene = SceneDescription::new(640, 480, ShaderKind::Texture);
    scene.camera.eye = Vec3::new(0.0, 4.0, 8.0);
    scene.models.push(ModelDescription {
        color: Some(Vec3::splat(0.8)),
        ..ModelDescription::new(ModelSource::Plane { half_extent: 6.0 })
    });
    scene.models.push(ModelDescription {
        scale: 0.6,
        rotate_y: 25.0,
        translation: Vec3::new(0.0, 1.5, 0.0),
        color: Some(Vec3::new(0.3, 0.5, 0.9)),
        ..ModelDescription::new(ModelSource::Cube)
    });
    scene.lights.push(LightDescription::new(Vec3::new(1.0, 8.0, 2.0), Vec3::splat(120.0)));
    scene.settings.ambient_intensity = 0.05;
    scene
}
