//! Geodesic sphere triangulation by icosahedron subdivision.

#![allow(clippy::cast_possible_truncation)]

use grasp_types::TriMesh;
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};

/// `sqrt(sqrt(5)+1)/sqrt(2*sqrt(5))`
const ICO_X: f64 = 0.850_650_808_352_039_9;
/// `sqrt(2)/sqrt(5+sqrt(5))`
const ICO_Y: f64 = 0.525_731_112_119_133_6;
const ICO_Z: f64 = 0.0;

const ICO_TRIANGLES: [[u32; 3]; 20] = [
    [0, 1, 2],
    [1, 3, 4],
    [3, 5, 6],
    [2, 4, 7],
    [5, 6, 8],
    [2, 7, 9],
    [0, 5, 8],
    [7, 9, 10],
    [0, 1, 5],
    [7, 10, 11],
    [1, 3, 5],
    [6, 10, 11],
    [3, 6, 11],
    [9, 10, 8],
    [3, 4, 11],
    [6, 8, 10],
    [4, 7, 11],
    [1, 2, 4],
    [0, 8, 9],
    [0, 2, 9],
];

fn icosahedron_vertices() -> Vec<Point3<f64>> {
    vec![
        Point3::new(ICO_Z, ICO_X, -ICO_Y),
        Point3::new(ICO_X, ICO_Y, ICO_Z),
        Point3::new(ICO_Y, ICO_Z, -ICO_X),
        Point3::new(ICO_Y, ICO_Z, ICO_X),
        Point3::new(ICO_X, -ICO_Y, ICO_Z),
        Point3::new(ICO_Z, ICO_X, ICO_Y),
        Point3::new(-ICO_Y, ICO_Z, ICO_X),
        Point3::new(ICO_Z, -ICO_X, -ICO_Y),
        Point3::new(-ICO_X, ICO_Y, ICO_Z),
        Point3::new(-ICO_Y, ICO_Z, -ICO_X),
        Point3::new(-ICO_X, -ICO_Y, ICO_Z),
        Point3::new(ICO_Z, -ICO_X, ICO_Y),
    ]
}

/// Symmetric 64-bit key of an undirected edge.
fn edge_key(a: u32, b: u32) -> u64 {
    (u64::from(a.min(b)) << 32) | u64::from(a.max(b))
}

/// Generate a unit-sphere triangulation by subdividing an icosahedron
/// `levels` times.
///
/// Every triangle is oriented counter-clockwise as seen from outside:
/// `v0 · ((v1−v0)×(v2−v0)) > 0`. Edge midpoints are shared between the
/// triangles that touch them and re-normalized to unit length, so the
/// result has `20·4^levels` triangles and `12 + 30·(4^levels − 1)/3`
/// vertices.
#[must_use]
pub fn sphere_triangulation(levels: u32) -> TriMesh {
    let mut mesh = TriMesh {
        vertices: icosahedron_vertices(),
        indices: ICO_TRIANGLES.to_vec(),
    };

    for tri in &mut mesh.indices {
        let v0: Vector3<f64> = mesh.vertices[tri[0] as usize].coords;
        let v1: Vector3<f64> = mesh.vertices[tri[1] as usize].coords;
        let v2: Vector3<f64> = mesh.vertices[tri[2] as usize].coords;
        if v0.dot(&(v1 - v0).cross(&(v2 - v0))) < 0.0 {
            tri.swap(0, 1);
        }
    }

    for _ in 0..levels {
        mesh = subdivide(&mesh);
    }
    mesh
}

/// One midpoint subdivision pass: each triangle becomes four, midpoints
/// pushed back onto the unit sphere.
fn subdivide(mesh: &TriMesh) -> TriMesh {
    let mut vertices = mesh.vertices.clone();
    let mut indices = Vec::with_capacity(mesh.indices.len() * 4);
    let mut midpoints: HashMap<u64, u32> = HashMap::new();

    for tri in &mesh.indices {
        let mut mids = [0u32; 3];
        for j in 0..3 {
            let a = tri[j];
            let b = tri[(j + 1) % 3];
            mids[j] = *midpoints.entry(edge_key(a, b)).or_insert_with(|| {
                let m =
                    (vertices[a as usize].coords + vertices[b as usize].coords).normalize();
                vertices.push(Point3::from(m));
                (vertices.len() - 1) as u32
            });
        }
        indices.push([tri[0], mids[0], mids[2]]);
        indices.push([mids[0], tri[1], mids[1]]);
        indices.push([mids[2], mids[0], mids[1]]);
        indices.push([mids[2], mids[1], tri[2]]);
    }

    TriMesh { vertices, indices }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn expected_vertices(levels: u32) -> usize {
        12 + 30 * (4usize.pow(levels) - 1) / 3
    }

    #[test]
    fn triangle_and_vertex_counts() {
        for levels in 0..5 {
            let mesh = sphere_triangulation(levels);
            assert_eq!(mesh.indices.len(), 20 * 4usize.pow(levels));
            assert_eq!(mesh.vertices.len(), expected_vertices(levels));
        }
    }

    #[test]
    fn all_vertices_unit_length() {
        for levels in 0..4 {
            let mesh = sphere_triangulation(levels);
            for v in &mesh.vertices {
                assert_relative_eq!(v.coords.norm(), 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn all_triangles_outward_ccw() {
        for levels in 0..5 {
            let mesh = sphere_triangulation(levels);
            for tri in &mesh.indices {
                let v0 = mesh.vertices[tri[0] as usize].coords;
                let v1 = mesh.vertices[tri[1] as usize].coords;
                let v2 = mesh.vertices[tri[2] as usize].coords;
                assert!(
                    v0.dot(&(v1 - v0).cross(&(v2 - v0))) > 0.0,
                    "inward triangle at level {levels}: {tri:?}"
                );
            }
        }
    }

    #[test]
    fn no_duplicate_vertices() {
        let mesh = sphere_triangulation(3);
        for (i, a) in mesh.vertices.iter().enumerate() {
            for b in &mesh.vertices[i + 1..] {
                assert!((a - b).norm() > 1e-9);
            }
        }
    }

    #[test]
    fn mesh_is_closed() {
        // Every edge of a closed manifold appears in exactly two triangles.
        let mesh = sphere_triangulation(2);
        let mut edge_count: HashMap<u64, u32> = HashMap::new();
        for tri in &mesh.indices {
            for j in 0..3 {
                *edge_count
                    .entry(edge_key(tri[j], tri[(j + 1) % 3]))
                    .or_insert(0) += 1;
            }
        }
        assert!(edge_count.values().all(|&c| c == 2));
    }
}
