//! Fan triangulation of planar hull faces.

use std::f64::consts::TAU;

use nalgebra::Vector3;

use crate::{ConvexHull, HullError};

/// Triangulate every face of a 3-dimensional hull.
///
/// Face vertex lists are unordered, so each face's vertices are first
/// sorted by signed angle about the outward face normal (reference vertex
/// at angle 0, ties broken by original position), then fanned from the
/// reference. The resulting triangles are counter-clockwise as seen from
/// outside.
///
/// # Errors
///
/// Returns [`HullError::TriangulationDimension`] when the hull is not
/// 3-dimensional.
pub fn triangulate_faces(points: &[f64], hull: &ConvexHull) -> Result<Vec<[usize; 3]>, HullError> {
    if hull.dim != 3 {
        return Err(HullError::TriangulationDimension(hull.dim));
    }

    let at = |i: usize| Vector3::new(points[3 * i], points[3 * i + 1], points[3 * i + 2]);

    let mut triangles = Vec::new();
    for face in &hull.faces {
        let k = face.vertices.len();
        if k < 3 {
            continue;
        }
        let normal = Vector3::new(face.normal[0], face.normal[1], face.normal[2]);

        let mut mean = Vector3::zeros();
        for &v in &face.vertices {
            mean += at(v);
        }
        mean /= k as f64;

        let p0 = at(face.vertices[0]) - mean;
        let mut angles: Vec<(f64, usize)> = Vec::with_capacity(k);
        angles.push((0.0, 0));
        for (i, &v) in face.vertices.iter().enumerate().skip(1) {
            let p1 = at(v) - mean;
            let sin = normal.dot(&p0.cross(&p1));
            let cos = p0.dot(&p1);
            let mut angle = sin.atan2(cos);
            if angle < 0.0 {
                angle += TAU;
            }
            angles.push((angle, i));
        }
        angles.sort_by(|a, b| a.0.total_cmp(&b.0));

        for i in 2..k {
            triangles.push([
                face.vertices[angles[0].1],
                face.vertices[angles[i - 1].1],
                face.vertices[angles[i].1],
            ]);
        }
    }
    Ok(triangles)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::convex_hull;
    use approx::assert_relative_eq;

    fn octahedron() -> Vec<f64> {
        vec![
            1.0, 0.0, 0.0, //
            -1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, -1.0, 0.0, //
            0.0, 0.0, 1.0, //
            0.0, 0.0, -1.0,
        ]
    }

    fn tri_normal(points: &[f64], t: &[usize; 3]) -> Vector3<f64> {
        let at = |i: usize| Vector3::new(points[3 * i], points[3 * i + 1], points[3 * i + 2]);
        (at(t[1]) - at(t[0])).cross(&(at(t[2]) - at(t[0])))
    }

    #[test]
    fn octahedron_eight_ccw_triangles() {
        let points = octahedron();
        let hull = convex_hull(&points, 3).unwrap();
        let triangles = triangulate_faces(&points, &hull).unwrap();
        assert_eq!(triangles.len(), 8);

        for t in &triangles {
            let face = hull
                .faces
                .iter()
                .find(|f| t.iter().all(|v| f.vertices.contains(v)))
                .unwrap();
            let n = Vector3::new(face.normal[0], face.normal[1], face.normal[2]);
            assert!(tri_normal(&points, t).dot(&n) > 0.0, "clockwise triangle");
        }
    }

    #[test]
    fn cube_faces_fan_into_two_triangles_each() {
        let mut points = Vec::new();
        for &x in &[-1.0, 1.0] {
            for &y in &[-1.0, 1.0] {
                for &z in &[-1.0, 1.0] {
                    points.extend_from_slice(&[x, y, z]);
                }
            }
        }
        let hull = convex_hull(&points, 3).unwrap();
        let triangles = triangulate_faces(&points, &hull).unwrap();
        assert_eq!(triangles.len(), 12);

        // Triangulated area of each face equals the face area (4).
        for face in &hull.faces {
            let n = Vector3::new(face.normal[0], face.normal[1], face.normal[2]);
            let area: f64 = triangles
                .iter()
                .filter(|t| t.iter().all(|v| face.vertices.contains(v)))
                .map(|t| tri_normal(&points, t).dot(&n) * 0.5)
                .sum();
            assert_relative_eq!(area, 4.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn triangles_only_use_their_faces_vertices() {
        let points = octahedron();
        let hull = convex_hull(&points, 3).unwrap();
        let triangles = triangulate_faces(&points, &hull).unwrap();
        for t in &triangles {
            assert!(hull
                .faces
                .iter()
                .any(|f| t.iter().all(|v| f.vertices.contains(v))));
        }
    }

    #[test]
    fn rejects_non_three_dimensional_hulls() {
        let points = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let hull = convex_hull(&points, 2).unwrap();
        assert!(matches!(
            triangulate_faces(&points, &hull),
            Err(HullError::TriangulationDimension(2))
        ));
    }
}
