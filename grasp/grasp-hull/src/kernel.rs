//! Incremental convex-hull kernel for dimensions 2 through 6.
//!
//! A quickhull-style insertion hull over simplicial facets: build an
//! initial d-simplex by greedy affine-rank extension, then insert each
//! remaining point by replacing the facets it sees with a fan from the
//! horizon ridges. Facet hyperplanes come from Gram-Schmidt nullspace
//! extraction, which is robust at these small dimensions.

use hashbrown::HashMap;
use nalgebra::DMatrix;

use crate::HullError;

/// One simplicial facet: `dim` vertex ids plus the outward hyperplane
/// `normal·x + offset = 0` with interior points on the negative side.
#[derive(Debug, Clone)]
pub(crate) struct Facet {
    pub vertices: Vec<usize>,
    pub normal: Vec<f64>,
    pub offset: f64,
}

/// Kernel output: outward-oriented simplicial facets and the enclosed
/// volume.
#[derive(Debug)]
pub(crate) struct SimplicialHull {
    pub facets: Vec<Facet>,
    pub volume: f64,
}

const FACTORIALS: [f64; 7] = [1.0, 1.0, 2.0, 6.0, 24.0, 120.0, 720.0];

#[inline]
fn point(points: &[f64], dim: usize, i: usize) -> &[f64] {
    &points[i * dim..(i + 1) * dim]
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Subtract from `v` its projections onto the orthonormal `basis`, twice
/// for numerical stability.
fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for _ in 0..2 {
        for b in basis {
            let proj = dot(v, b);
            for (vi, bi) in v.iter_mut().zip(b) {
                *vi -= proj * bi;
            }
        }
    }
}

/// Unit normal and offset of the hyperplane through the given `dim`
/// vertices, or `None` when they are affinely dependent.
fn facet_plane(points: &[f64], dim: usize, verts: &[usize], eps: f64) -> Option<(Vec<f64>, f64)> {
    let p0 = point(points, dim, verts[0]);

    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(dim - 1);
    for &v in &verts[1..] {
        let mut edge: Vec<f64> = point(points, dim, v)
            .iter()
            .zip(p0)
            .map(|(a, b)| a - b)
            .collect();
        orthogonalize(&mut edge, &basis);
        let len = norm(&edge);
        if len <= eps {
            return None;
        }
        for e in &mut edge {
            *e /= len;
        }
        basis.push(edge);
    }

    // The normal is the best-conditioned standard basis vector with the
    // tangent space projected out.
    let mut best: Option<Vec<f64>> = None;
    let mut best_len = 0.0;
    for j in 0..dim {
        let mut r = vec![0.0; dim];
        r[j] = 1.0;
        orthogonalize(&mut r, &basis);
        let len = norm(&r);
        if len > best_len {
            best_len = len;
            best = Some(r);
        }
    }
    let mut normal = best?;
    if best_len <= eps {
        return None;
    }
    for x in &mut normal {
        *x /= best_len;
    }
    let offset = -dot(&normal, p0);
    Some((normal, offset))
}

/// Greedy affine-rank extension: `dim + 1` point ids spanning the space.
fn initial_simplex(points: &[f64], dim: usize, eps: f64) -> Result<Vec<usize>, HullError> {
    let n = points.len() / dim;

    let mut v0 = 0;
    for i in 1..n {
        if point(points, dim, i)[0] < point(points, dim, v0)[0] {
            v0 = i;
        }
    }
    let p0 = point(points, dim, v0);

    let mut simplex = vec![v0];
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(dim);
    while simplex.len() < dim + 1 {
        let mut best = None;
        let mut best_len = 0.0;
        for i in 0..n {
            if simplex.contains(&i) {
                continue;
            }
            let mut r: Vec<f64> = point(points, dim, i)
                .iter()
                .zip(p0)
                .map(|(a, b)| a - b)
                .collect();
            orthogonalize(&mut r, &basis);
            let len = norm(&r);
            if len > best_len {
                best_len = len;
                best = Some((i, r));
            }
        }
        let Some((idx, mut r)) = best else {
            return Err(HullError::Degenerate(dim));
        };
        if best_len <= eps {
            return Err(HullError::Degenerate(dim));
        }
        for x in &mut r {
            *x /= best_len;
        }
        basis.push(r);
        simplex.push(idx);
    }
    Ok(simplex)
}

/// Compute the convex hull of `points` (flat, `n·dim` reals).
pub(crate) fn incremental_hull(points: &[f64], dim: usize) -> Result<SimplicialHull, HullError> {
    let n = points.len() / dim;
    let scale = points.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    let eps = 1e-9 * scale.max(1.0);

    let simplex = initial_simplex(points, dim, eps)?;

    // Interior reference point: simplex centroid.
    let mut interior = vec![0.0; dim];
    for &v in &simplex {
        for (acc, x) in interior.iter_mut().zip(point(points, dim, v)) {
            *acc += x;
        }
    }
    for x in &mut interior {
        *x /= (dim + 1) as f64;
    }

    let mut facets: Vec<Facet> = Vec::new();
    for omit in 0..=dim {
        let verts: Vec<usize> = simplex
            .iter()
            .enumerate()
            .filter(|&(k, _)| k != omit)
            .map(|(_, &v)| v)
            .collect();
        facets.push(oriented_facet(points, dim, verts, &interior, eps)?);
    }

    for i in 0..n {
        if simplex.contains(&i) {
            continue;
        }
        let p = point(points, dim, i);
        let visible: Vec<usize> = facets
            .iter()
            .enumerate()
            .filter(|(_, f)| dot(&f.normal, p) + f.offset > eps)
            .map(|(k, _)| k)
            .collect();
        if visible.is_empty() {
            continue;
        }

        // Ridges shared by exactly one visible facet form the horizon.
        let mut ridges: HashMap<Vec<usize>, usize> = HashMap::new();
        for &fi in &visible {
            let verts = &facets[fi].vertices;
            for omit in 0..dim {
                let mut ridge: Vec<usize> = verts
                    .iter()
                    .enumerate()
                    .filter(|&(k, _)| k != omit)
                    .map(|(_, &v)| v)
                    .collect();
                ridge.sort_unstable();
                *ridges.entry(ridge).or_insert(0) += 1;
            }
        }

        let mut new_facets = Vec::new();
        for (ridge, count) in ridges {
            if count != 1 {
                continue;
            }
            let mut verts = ridge;
            verts.push(i);
            new_facets.push(oriented_facet(points, dim, verts, &interior, eps)?);
        }

        let visible_set: Vec<bool> = {
            let mut mask = vec![false; facets.len()];
            for &fi in &visible {
                mask[fi] = true;
            }
            mask
        };
        let mut kept: Vec<Facet> = facets
            .into_iter()
            .zip(&visible_set)
            .filter(|(_, &vis)| !vis)
            .map(|(f, _)| f)
            .collect();
        kept.append(&mut new_facets);
        facets = kept;
    }

    let volume = enclosed_volume(points, dim, &facets, &interior);
    Ok(SimplicialHull { facets, volume })
}

/// Build a facet with the normal oriented away from the interior point.
fn oriented_facet(
    points: &[f64],
    dim: usize,
    verts: Vec<usize>,
    interior: &[f64],
    eps: f64,
) -> Result<Facet, HullError> {
    let (mut normal, mut offset) =
        facet_plane(points, dim, &verts, eps).ok_or(HullError::Degenerate(dim))?;
    let side = dot(&normal, interior) + offset;
    if side > 0.0 {
        for x in &mut normal {
            *x = -*x;
        }
        offset = -offset;
    }
    Ok(Facet {
        vertices: verts,
        normal,
        offset,
    })
}

/// Total volume as a fan of simplices from the interior point to each
/// facet.
fn enclosed_volume(points: &[f64], dim: usize, facets: &[Facet], interior: &[f64]) -> f64 {
    let mut volume = 0.0;
    let mut m = DMatrix::zeros(dim, dim);
    for facet in facets {
        for (row, &v) in facet.vertices.iter().enumerate() {
            for (col, (x, c)) in point(points, dim, v).iter().zip(interior).enumerate() {
                m[(row, col)] = x - c;
            }
        }
        volume += m.determinant().abs() / FACTORIALS[dim];
    }
    volume
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tetrahedron_facets_and_volume() {
        // Unit right tetrahedron at the origin.
        let points = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        ];
        let hull = incremental_hull(&points, 3).unwrap();
        assert_eq!(hull.facets.len(), 4);
        assert_relative_eq!(hull.volume, 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn interior_points_do_not_add_facets() {
        let points = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, //
            0.2, 0.2, 0.2,
        ];
        let hull = incremental_hull(&points, 3).unwrap();
        assert_eq!(hull.facets.len(), 4);
        assert!(hull.facets.iter().all(|f| !f.vertices.contains(&4)));
    }

    #[test]
    fn facets_are_outward() {
        let points = [
            -1.0, -1.0, -1.0, //
            1.0, -1.0, -1.0, //
            -1.0, 1.0, -1.0, //
            1.0, 1.0, -1.0, //
            -1.0, -1.0, 1.0, //
            1.0, -1.0, 1.0, //
            -1.0, 1.0, 1.0, //
            1.0, 1.0, 1.0,
        ];
        let hull = incremental_hull(&points, 3).unwrap();
        assert_relative_eq!(hull.volume, 8.0, epsilon = 1e-9);
        for f in &hull.facets {
            for i in 0..8 {
                let d = dot(&f.normal, point(&points, 3, i)) + f.offset;
                assert!(d <= 1e-9, "point {i} outside facet: {d}");
            }
        }
    }

    #[test]
    fn coplanar_input_is_degenerate() {
        let points = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            1.0, 1.0, 0.0,
        ];
        assert!(matches!(
            incremental_hull(&points, 3),
            Err(HullError::Degenerate(3))
        ));
    }

    #[test]
    fn square_hull_in_two_dimensions() {
        let points = [
            0.0, 0.0, //
            1.0, 0.0, //
            1.0, 1.0, //
            0.0, 1.0, //
            0.5, 0.5,
        ];
        let hull = incremental_hull(&points, 2).unwrap();
        assert_eq!(hull.facets.len(), 4);
        assert_relative_eq!(hull.volume, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cross_polytope_in_six_dimensions() {
        // 12 vertices ±e_i; 2^6 facets, volume 2^6/6!.
        let mut points = Vec::new();
        for i in 0..6 {
            for sign in [1.0, -1.0] {
                let mut p = vec![0.0; 6];
                p[i] = sign;
                points.extend_from_slice(&p);
            }
        }
        let hull = incremental_hull(&points, 6).unwrap();
        assert_eq!(hull.facets.len(), 64);
        assert_relative_eq!(hull.volume, 64.0 / 720.0, epsilon = 1e-9);
        let inv_sqrt6 = 1.0 / 6.0_f64.sqrt();
        for f in &hull.facets {
            assert_relative_eq!(f.offset, -inv_sqrt6, epsilon = 1e-9);
        }
    }
}
