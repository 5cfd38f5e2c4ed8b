//! Convex hulls in 2 to 6 dimensions with face enumeration and planar
//! triangulation.
//!
//! The hull service takes a flat point array, computes the hull, and
//! returns outward halfspace planes (`n·x + b ≤ 0` for interior points),
//! per-face vertex-id lists with coplanar facets merged into maximal
//! faces, and the polytope volume. For 3-dimensional hulls,
//! [`triangulate_faces`] fans each face into counter-clockwise triangles.
//!
//! The force-closure analyzer consumes the 6-dimensional path; the hull
//! command surface exposes all of it directly.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod error;
mod kernel;
mod triangulate;

pub use error::HullError;
pub use triangulate::triangulate_faces;

/// A maximal face of the hull: its outward halfspace plane and the ids of
/// the input points lying on it.
#[derive(Debug, Clone)]
pub struct HullFace {
    /// Outward unit normal, `dim` components.
    pub normal: Vec<f64>,
    /// Signed offset `b` of the halfspace `n·x + b ≤ 0`.
    pub offset: f64,
    /// Ids of the input points on this face, ascending, unordered around
    /// the face boundary.
    pub vertices: Vec<usize>,
}

/// A computed convex hull.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    /// Hull dimension.
    pub dim: usize,
    /// Maximal faces with coplanar facets merged.
    pub faces: Vec<HullFace>,
    /// Enclosed volume (area for `dim == 2`).
    pub volume: f64,
}

/// Compute the convex hull of `points`, a flat array of `n·dim` reals.
///
/// # Errors
///
/// Returns an error when the dimension is outside 2..=6, the array length
/// is not a multiple of `dim`, fewer than `dim + 1` points are supplied,
/// or the points do not span the full dimension.
pub fn convex_hull(points: &[f64], dim: usize) -> Result<ConvexHull, HullError> {
    if !(2..=6).contains(&dim) {
        return Err(HullError::UnsupportedDimension(dim));
    }
    if points.len() % dim != 0 {
        return Err(HullError::LengthMismatch {
            len: points.len(),
            dim,
        });
    }
    let n = points.len() / dim;
    if n < dim + 1 {
        return Err(HullError::TooFewPoints {
            needed: dim + 1,
            dim,
            got: n,
        });
    }

    let hull = kernel::incremental_hull(points, dim)?;

    // Normalize orientation against the input centroid: any facet whose
    // plane reports the centroid positive gets its normal flipped.
    let mut mean = vec![0.0; dim];
    for i in 0..n {
        for (m, x) in mean.iter_mut().zip(&points[i * dim..(i + 1) * dim]) {
            *m += x;
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let mut facets = hull.facets;
    for facet in &mut facets {
        let side: f64 = facet
            .normal
            .iter()
            .zip(&mean)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            + facet.offset;
        if side > 0.0 {
            for x in &mut facet.normal {
                *x = -*x;
            }
        }
    }

    let scale = points.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    let faces = merge_coplanar(facets, 1e-7 * scale.max(1.0));

    Ok(ConvexHull {
        dim,
        faces,
        volume: hull.volume,
    })
}

/// Merge simplicial facets sharing a hyperplane into maximal faces.
fn merge_coplanar(facets: Vec<kernel::Facet>, offset_eps: f64) -> Vec<HullFace> {
    let mut faces: Vec<HullFace> = Vec::new();
    for facet in facets {
        let found = faces.iter_mut().find(|face| {
            let align: f64 = face
                .normal
                .iter()
                .zip(&facet.normal)
                .map(|(a, b)| a * b)
                .sum();
            align > 1.0 - 1e-9 && (face.offset - facet.offset).abs() <= offset_eps
        });
        match found {
            Some(face) => face.vertices.extend_from_slice(&facet.vertices),
            None => faces.push(HullFace {
                normal: facet.normal,
                offset: facet.offset,
                vertices: facet.vertices,
            }),
        }
    }
    for face in &mut faces {
        face.vertices.sort_unstable();
        face.vertices.dedup();
    }
    faces
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn cube_points() -> Vec<f64> {
        let mut points = Vec::new();
        for &x in &[-1.0, 1.0] {
            for &y in &[-1.0, 1.0] {
                for &z in &[-1.0, 1.0] {
                    points.extend_from_slice(&[x, y, z]);
                }
            }
        }
        points
    }

    #[test]
    fn cube_merges_to_six_faces() {
        let points = cube_points();
        let hull = convex_hull(&points, 3).unwrap();
        assert_eq!(hull.faces.len(), 6);
        assert_relative_eq!(hull.volume, 8.0, epsilon = 1e-9);
        for face in &hull.faces {
            assert_eq!(face.vertices.len(), 4);
            assert_relative_eq!(face.offset, -1.0, epsilon = 1e-9);
            // Normal is a signed basis vector.
            let ones = face.normal.iter().filter(|x| x.abs() > 0.5).count();
            assert_eq!(ones, 1);
            let m: f64 = face.normal.iter().map(|x| x.abs()).sum();
            assert_relative_eq!(m, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn even_sign_tetrahedron() {
        // Regular tetrahedron: cube corners with an even number of -1s.
        let points = [
            1.0, 1.0, 1.0, //
            1.0, -1.0, -1.0, //
            -1.0, 1.0, -1.0, //
            -1.0, -1.0, 1.0,
        ];
        let hull = convex_hull(&points, 3).unwrap();
        assert_eq!(hull.faces.len(), 4);
        assert_relative_eq!(hull.volume, 8.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn all_points_inside_all_planes() {
        let mut rng = StdRng::seed_from_u64(42);
        for dim in 2..=5 {
            let n = 40;
            let points: Vec<f64> = (0..n * dim).map(|_| rng.gen_range(-3.0..3.0)).collect();
            let hull = convex_hull(&points, dim).unwrap();
            let diameter = 12.0 * (dim as f64).sqrt();
            for face in &hull.faces {
                for i in 0..n {
                    let d: f64 = face
                        .normal
                        .iter()
                        .zip(&points[i * dim..(i + 1) * dim])
                        .map(|(a, b)| a * b)
                        .sum::<f64>()
                        + face.offset;
                    assert!(d <= 1e-6 * diameter, "dim {dim} point {i} outside: {d}");
                }
            }
        }
    }

    #[test]
    fn square_area_in_two_dimensions() {
        let points = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.4, 0.6];
        let hull = convex_hull(&points, 2).unwrap();
        assert_eq!(hull.faces.len(), 4);
        assert_relative_eq!(hull.volume, 1.0, epsilon = 1e-12);
        assert!(hull.faces.iter().all(|f| !f.vertices.contains(&4)));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            convex_hull(&[0.0; 14], 7),
            Err(HullError::UnsupportedDimension(7))
        ));
        assert!(matches!(
            convex_hull(&[0.0; 7], 3),
            Err(HullError::LengthMismatch { len: 7, dim: 3 })
        ));
        assert!(matches!(
            convex_hull(&[0.0; 9], 3),
            Err(HullError::TooFewPoints { .. })
        ));
    }

    #[test]
    fn rotated_cube_volume_invariant() {
        use nalgebra::{UnitQuaternion, Vector3};
        let q = UnitQuaternion::from_axis_angle(
            &nalgebra::Unit::new_normalize(Vector3::new(1.0, 2.0, -0.5)),
            0.8,
        );
        let points = cube_points();
        let rotated: Vec<f64> = points
            .chunks(3)
            .flat_map(|p| {
                let v = q * Vector3::new(p[0], p[1], p[2]);
                [v.x, v.y, v.z]
            })
            .collect();
        let hull = convex_hull(&rotated, 3).unwrap();
        assert_eq!(hull.faces.len(), 6);
        assert_relative_eq!(hull.volume, 8.0, epsilon = 1e-9);
    }
}
