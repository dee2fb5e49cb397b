//! Built-in geometry: lit cube, inward-facing skybox cube, window quad and
//! the full-screen quad used by post-processing.
//!
//! All front faces wind counter-clockwise when viewed from the side the
//! normal points to.

use glam::{Vec2, Vec3};

use super::mesh::{MeshData, Vertex};

/// (outward normal, tangent) for each cube face. The bitangent is
/// `normal × tangent`, which keeps `tangent × bitangent == normal`.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_X, Vec3::Z),
    (Vec3::Y, Vec3::X),
    (Vec3::NEG_Y, Vec3::X),
    (Vec3::Z, Vec3::X),
    (Vec3::NEG_Z, Vec3::NEG_X),
];

const QUAD_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

fn build_cube(size: f32, inward: bool) -> MeshData {
    let half = size * 0.5;
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, tangent) in CUBE_FACES {
        let bitangent = normal.cross(tangent);
        let base = vertices.len() as u32;
        let corners = [
            normal - tangent - bitangent,
            normal + tangent - bitangent,
            normal + tangent + bitangent,
            normal - tangent + bitangent,
        ];
        let shading_normal = if inward { -normal } else { normal };
        for (corner, uv) in corners.into_iter().zip(QUAD_UVS) {
            vertices.push(Vertex::new(corner * half, shading_normal, uv));
        }
        if inward {
            indices.extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        } else {
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    MeshData::new(vertices, indices)
}

/// Axis-aligned cube centered at the origin, 24 vertices with per-face normals.
#[must_use]
pub fn cube(size: f32) -> MeshData {
    build_cube(size, false)
}

/// Unit-extent cube (±1) whose faces are visible from the inside.
#[must_use]
pub fn skybox_cube() -> MeshData {
    build_cube(2.0, true)
}

/// Quad in the XY plane facing +Z, centered at the origin.
#[must_use]
pub fn quad(width: f32, height: f32) -> MeshData {
    let hw = width * 0.5;
    let hh = height * 0.5;
    let positions = [
        Vec3::new(-hw, -hh, 0.0),
        Vec3::new(hw, -hh, 0.0),
        Vec3::new(hw, hh, 0.0),
        Vec3::new(-hw, hh, 0.0),
    ];
    let vertices = positions
        .into_iter()
        .zip(QUAD_UVS)
        .map(|(p, uv)| Vertex::new(p, Vec3::Z, uv))
        .collect();
    MeshData::new(vertices, vec![0, 1, 2, 0, 2, 3])
}

/// Full-screen quad in normalized device coordinates.
#[must_use]
pub fn screen_quad() -> MeshData {
    quad(2.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(mesh: &MeshData, tri: usize) -> Vec3 {
        let [a, b, c] = mesh.triangles().nth(tri).unwrap();
        (b.position() - a.position())
            .cross(c.position() - a.position())
            .normalize()
    }

    #[test]
    fn cube_winds_outward() {
        let mesh = cube(1.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        for tri in 0..12 {
            let [a, ..] = mesh.triangles().nth(tri).unwrap();
            let geometric = face_normal(&mesh, tri);
            assert!((geometric - a.normal()).length() < 1e-5);
            // Outward: geometric normal points away from the center.
            assert!(geometric.dot(a.position()) > 0.0);
        }
    }

    #[test]
    fn skybox_cube_winds_inward() {
        let mesh = skybox_cube();
        for tri in 0..12 {
            let [a, ..] = mesh.triangles().nth(tri).unwrap();
            assert!(face_normal(&mesh, tri).dot(a.position()) < 0.0);
        }
        assert!((mesh.bounding_radius() - 3f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn quad_faces_positive_z() {
        let mesh = quad(1.0, 1.0);
        assert!((face_normal(&mesh, 0) - Vec3::Z).length() < 1e-6);
        assert!((face_normal(&mesh, 1) - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn byte_views_match_layout() {
        let mesh = screen_quad();
        assert_eq!(mesh.vertex_bytes().len(), 4 * std::mem::size_of::<Vertex>());
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(mesh.index_bytes().len(), 6 * 4);
    }
}
