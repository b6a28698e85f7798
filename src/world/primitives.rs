//! Procedural meshes for asset-free scenes

use std::sync::Arc;

use crate::rasterizer::{Material, Mesh, Triangle, Vec3, Vertex};

/// Corner UVs shared by every quad
const QUAD_UVS: [Vec3; 4] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
];

/// Two triangles over four counter-clockwise corners
fn push_quad(mesh: &mut Mesh, corners: [Vec3; 4], normal: Vec3) {
    let v = |i: usize| Vertex::new(corners[i], normal, QUAD_UVS[i]);
    mesh.triangles.push(Triangle::new([v(0), v(1), v(2)]));
    mesh.triangles.push(Triangle::new([v(0), v(2), v(3)]));
}

/// Unit cube spanning [-1, 1] on every axis, outward winding
pub fn cube(material: Arc<Material>) -> Mesh {
    let faces = [
        // front
        ([(-1.0, -1.0, 1.0), (1.0, -1.0, 1.0), (1.0, 1.0, 1.0), (-1.0, 1.0, 1.0)], (0.0, 0.0, 1.0)),
        // back
        ([(-1.0, -1.0, -1.0), (-1.0, 1.0, -1.0), (1.0, 1.0, -1.0), (1.0, -1.0, -1.0)], (0.0, 0.0, -1.0)),
        // top
        ([(-1.0, 1.0, -1.0), (-1.0, 1.0, 1.0), (1.0, 1.0, 1.0), (1.0, 1.0, -1.0)], (0.0, 1.0, 0.0)),
        // bottom
        ([(-1.0, -1.0, -1.0), (1.0, -1.0, -1.0), (1.0, -1.0, 1.0), (-1.0, -1.0, 1.0)], (0.0, -1.0, 0.0)),
        // right
        ([(1.0, -1.0, -1.0), (1.0, 1.0, -1.0), (1.0, 1.0, 1.0), (1.0, -1.0, 1.0)], (1.0, 0.0, 0.0)),
        // left
        ([(-1.0, -1.0, -1.0), (-1.0, -1.0, 1.0), (-1.0, 1.0, 1.0), (-1.0, 1.0, -1.0)], (-1.0, 0.0, 0.0)),
    ];

    let mut mesh = Mesh::new("cube", material);
    for (corners, (nx, ny, nz)) in faces {
        push_quad(&mut mesh, corners.map(|(x, y, z)| Vec3::new(x, y, z)), Vec3::new(nx, ny, nz));
    }
    mesh
}

/// Square in the XZ plane at y = 0 facing +Y, `half_extent` from the origin
pub fn plane(half_extent: f32, material: Arc<Material>) -> Mesh {
    let s = half_extent;
    let mut mesh = Mesh::new("plane", material);
    push_quad(
        &mut mesh,
        [
            Vec3::new(-s, 0.0, s),
            Vec3::new(s, 0.0, s),
            Vec3::new(s, 0.0, -s),
            Vec3::new(-s, 0.0, -s),
        ],
        Vec3::UP,
    );
    mesh
}

/// Single triangle in the XY plane facing +Z
pub fn triangle(material: Arc<Material>) -> Mesh {
    let normal = Vec3::new(0.0, 0.0, 1.0);
    let mut mesh = Mesh::new("triangle", material);
    mesh.triangles.push(Triangle::new([
        Vertex::new(Vec3::new(-1.0, -1.0, 0.0), normal, Vec3::new(0.0, 0.0, 0.0)),
        Vertex::new(Vec3::new(1.0, -1.0, 0.0), normal, Vec3::new(1.0, 0.0, 0.0)),
        Vertex::new(Vec3::new(0.0, 1.0, 0.0), normal, Vec3::new(0.5, 1.0, 0.0)),
    ]));
    mesh
}
