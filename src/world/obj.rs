//! OBJ model loading

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::rasterizer::{Material, Mesh, Model, RgbTexture, TextureError, Triangle, Vec3, Vertex};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {name}: {message}")]
    Parse { name: String, message: String },
    #[error("{0} contains no triangles")]
    EmptyModel(String),
    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Load an OBJ file and its MTL materials. Texture maps are resolved
/// relative to the OBJ's directory.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Model, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = path.display().to_string();

    let model = load_obj_from_reader(&name, &mut BufReader::new(file), &base_dir)?;
    log::info!(
        "Loaded {}: {} meshes, {} triangles",
        name,
        model.meshes.len(),
        model.triangle_count()
    );
    Ok(model)
}

/// Load an OBJ from a reader. `mtllib` and texture paths resolve against `base_dir`.
pub fn load_obj_from_reader(name: &str, reader: &mut impl BufRead, base_dir: &Path) -> Result<Model, LoadError> {
    let (models, materials) = tobj::load_obj_buf(
        reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |mtl_path| tobj::load_mtl(base_dir.join(mtl_path)),
    )
    .map_err(|e| LoadError::Parse {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    let materials = match materials {
        Ok(m) => m,
        Err(e) => {
            log::warn!("{}: material library not loaded ({}), using defaults", name, e);
            Vec::new()
        }
    };

    let mut textures = TextureCache::new(base_dir);
    let materials = materials
        .iter()
        .map(|m| convert_material(m, &mut textures).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;
    let fallback = Arc::new(Material::default());

    let meshes: Vec<Mesh> = models
        .iter()
        .map(|m| {
            let material = m
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .cloned()
                .unwrap_or_else(|| fallback.clone());
            convert_mesh(&m.name, &m.mesh, material)
        })
        .filter(|m| !m.triangles.is_empty())
        .collect();

    if meshes.is_empty() {
        return Err(LoadError::EmptyModel(name.to_string()));
    }
    Ok(Model::from_meshes(meshes))
}

/// Loaded textures keyed by resolved path, so materials share them
struct TextureCache {
    base_dir: PathBuf,
    loaded: HashMap<PathBuf, Arc<RgbTexture>>,
}

impl TextureCache {
    fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            loaded: HashMap::new(),
        }
    }

    fn get(&mut self, file: &Option<String>) -> Result<Option<Arc<RgbTexture>>, TextureError> {
        let Some(file) = file.as_deref().filter(|f| !f.is_empty()) else {
            return Ok(None);
        };
        let path = self.base_dir.join(file);
        if let Some(tex) = self.loaded.get(&path) {
            return Ok(Some(tex.clone()));
        }
        let tex = Arc::new(RgbTexture::from_file(&path)?);
        self.loaded.insert(path, tex.clone());
        Ok(Some(tex))
    }
}

fn to_vec3(v: Option<[f32; 3]>, default: Vec3) -> Vec3 {
    v.map(|[x, y, z]| Vec3::new(x, y, z)).unwrap_or(default)
}

fn convert_material(m: &tobj::Material, textures: &mut TextureCache) -> Result<Material, TextureError> {
    let defaults = Material::default();
    Ok(Material {
        name: m.name.clone(),
        ka: to_vec3(m.ambient, defaults.ka),
        kd: to_vec3(m.diffuse, defaults.kd),
        ks: to_vec3(m.specular, defaults.ks),
        ns: m.shininess.unwrap_or(defaults.ns),
        ni: m.optical_density.unwrap_or(defaults.ni),
        d: m.dissolve.unwrap_or(defaults.d),
        illum: m.illumination_model.unwrap_or(defaults.illum),
        ka_texture: textures.get(&m.ambient_texture)?,
        kd_texture: textures.get(&m.diffuse_texture)?,
        ks_texture: textures.get(&m.specular_texture)?,
    })
}

/// Flatten an indexed tobj mesh into triangles. Missing normals become
/// per-face normals.
fn convert_mesh(name: &str, mesh: &tobj::Mesh, material: Arc<Material>) -> Mesh {
    let vertex_count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() == mesh.positions.len();
    let has_texcoords = mesh.texcoords.len() / 2 == vertex_count;

    let vertex = |i: usize| {
        let coord = Vec3::new(mesh.positions[3 * i], mesh.positions[3 * i + 1], mesh.positions[3 * i + 2]);
        let normal = if has_normals {
            Vec3::new(mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2])
        } else {
            Vec3::ZERO
        };
        let texture_coord = if has_texcoords {
            Vec3::new(mesh.texcoords[2 * i], mesh.texcoords[2 * i + 1], 0.0)
        } else {
            Vec3::ZERO
        };
        Vertex::new(coord, normal, texture_coord)
    };

    let mut out = Mesh::new(name, material);
    let mut flat = 0;
    for face in mesh.indices.chunks_exact(3) {
        let idx = [face[0] as usize, face[1] as usize, face[2] as usize];
        if idx.iter().any(|&i| i >= vertex_count) {
            continue;
        }
        let mut tri = Triangle::new(idx.map(vertex));
        if !has_normals {
            match tri.face_normal() {
                Some(n) => tri.v.iter_mut().for_each(|v| v.normal = n),
                None => flat += 1,
            }
        }
        out.triangles.push(tri);
    }

    if flat > 0 {
        log::warn!("{}: {} zero-area faces have no normal", name, flat);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";

    #[test]
    fn test_quad_is_triangulated_with_face_normals() {
        let model = load_obj_from_reader("quad", &mut Cursor::new(QUAD), Path::new(".")).unwrap();
        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.material.name, "default");
        for tri in &mesh.triangles {
            for v in &tri.v {
                assert_eq!(v.normal, Vec3::new(0.0, 0.0, 1.0));
                assert_eq!(v.texture_coord.x, v.coord.x);
                assert_eq!(v.texture_coord.y, v.coord.y);
            }
        }
    }

    #[test]
    fn test_explicit_normals_are_kept() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n";
        let model = load_obj_from_reader("tri", &mut Cursor::new(src), Path::new(".")).unwrap();
        let tri = model.meshes[0].triangles[0];
        assert!(tri.v.iter().all(|v| v.normal == Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_no_faces_is_empty_model() {
        let err = load_obj_from_reader("points", &mut Cursor::new("v 0 0 0\n"), Path::new(".")).unwrap_err();
        assert!(matches!(err, LoadError::EmptyModel(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_obj("does/not/exist.obj").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_materials_and_textures_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 0]));
        img.save(dir.path().join("red.png")).unwrap();
        std::fs::write(
            dir.path().join("scene.mtl"),
            "newmtl shiny\nKa 0.1 0.1 0.1\nKd 0.5 0.5 0.5\nKs 1 1 1\nNs 64\nmap_Kd red.png\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("scene.obj"),
            "mtllib scene.mtl\no a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl shiny\nf 1 2 3\n\
             o b\nv 0 0 1\nv 1 0 1\nv 0 1 1\nusemtl shiny\nf 4 5 6\n",
        )
        .unwrap();

        let model = load_obj(dir.path().join("scene.obj")).unwrap();
        assert_eq!(model.meshes.len(), 2);
        let (a, b) = (&model.meshes[0].material, &model.meshes[1].material);
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(a.name, "shiny");
        assert_eq!(a.ns, 64.0);
        assert_eq!(a.kd, Vec3::splat(0.5));
        let tex = a.kd_texture.as_ref().unwrap();
        assert_eq!((tex.width, tex.height), (2, 2));
        assert_eq!(tex.at(0, 0), Vec3::new(1.0, 0.0, 0.0));
        assert!(a.ka_texture.is_none());
    }

    #[test]
    fn test_missing_texture_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.mtl"), "newmtl m\nmap_Kd nowhere.png\n").unwrap();
        std::fs::write(dir.path().join("m.obj"), "mtllib m.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl m\nf 1 2 3\n").unwrap();
        let err = load_obj(dir.path().join("m.obj")).unwrap_err();
        assert!(matches!(err, LoadError::Texture(_)));
    }
}
