//! Bounding-plane derivation for general quadrics.
//!
//! The quadric `x^T A3 x + 2 b . x + K = 0` is classified by the rank
//! of the principal 3x3 form, the rank of the full 4x4 form and the
//! signature of the principal eigenvalues. Each class gets a set of
//! half-space conjunctions, built in the diagonalized frame and mapped
//! back through the inverse of the standardizing affine.
//!
//! Ranks and signatures computed in floating point can disagree; every
//! unresolvable combination degrades to the whole-space sentinel with a
//! warning instead of failing the resolution.

use glam::{DVec3, DVec4};
use smallvec::smallvec;

use crate::constants::{matrix_eps, EPS};
use crate::error::{Error, Result};
use crate::math::{rotation_about, Affine, Mat3};
use crate::surface::plane::Plane;
use crate::surface::quadric::Quadric;
use crate::surface::{whole_space, PlaneSets};

/// Rank of the symmetric 4x4 quadratic form, by Gram-Schmidt over its
/// rows.
fn rank4(rows: [DVec4; 4]) -> i32 {
  let eps = matrix_eps(4);
  let mut vecs: Vec<DVec4> = rows
    .iter()
    .map(|r| if r.length() > eps { r.normalize() } else { DVec4::ZERO })
    .collect();
  for _ in 0..=20 {
    for i in 0..4 {
      if vecs[i].length() < 1e-10 {
        continue;
      }
      for j in 0..i {
        let denom = vecs[j].length_squared();
        if denom < 1e-20 {
          continue;
        }
        let proj = vecs[i].dot(vecs[j]) / denom;
        let vj = vecs[j];
        vecs[i] -= proj * vj;
      }
    }
  }
  vecs.iter().filter(|v| v.length() >= 1e-10).count() as i32
}

fn det4(m: [[f64; 4]; 4]) -> f64 {
  let mut det = 0.0;
  for j in 0..4 {
    let mut minor = [[0.0; 3]; 3];
    for (mi, i) in (1..4).enumerate() {
      let mut mj = 0;
      for jj in 0..4 {
        if jj == j {
          continue;
        }
        minor[mi][mj] = m[i][jj];
        mj += 1;
      }
    }
    let m3 = Mat3 { m: minor };
    let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
    det += sign * m[0][j] * m3.determinant();
  }
  det
}

fn positive_count(values: &[f64]) -> usize {
  values.iter().filter(|v| **v > EPS).count()
}

fn pl(normal: DVec3, distance: f64) -> Plane {
  Plane::new(normal, distance).expect("bounding-plane normals are nonzero by construction")
}

fn pl_through(normal: DVec3, point: DVec3) -> Plane {
  Plane::through(normal, point).expect("bounding-plane normals are nonzero by construction")
}

fn transform_sets(mut sets: PlaneSets, matrix: &Affine) -> PlaneSets {
  for conj in &mut sets {
    for plane in conj.iter_mut() {
      plane.transform(matrix);
    }
  }
  sets
}

/// Entry point used by [`Quadric::bounding_planes`]. `inside` is the
/// reversed (implicit value < 0) side.
pub(crate) fn bounding_planes(q: &Quadric, name: &str, inside: bool) -> Result<PlaneSets> {
  let [a, b, c, d, e, f, g, h, j, k] = q.coeffs;
  let principal = Mat3 {
    m: [
      [a, 0.5 * d, 0.5 * f],
      [0.5 * d, b, 0.5 * e],
      [0.5 * f, 0.5 * e, c],
    ],
  };
  let full = [
    [a, 0.5 * d, 0.5 * f, 0.5 * g],
    [0.5 * d, b, 0.5 * e, 0.5 * h],
    [0.5 * f, 0.5 * e, c, 0.5 * j],
    [0.5 * g, 0.5 * h, 0.5 * j, k],
  ];
  let rank_principal = principal.rank();
  let rank_matrix = rank4([
    DVec4::from_array(full[0]),
    DVec4::from_array(full[1]),
    DVec4::from_array(full[2]),
    DVec4::from_array(full[3]),
  ]);

  let eigen = principal.sym_eigen(true, true)?;
  // Columns of `rotation` are the principal eigenvectors; it maps
  // standardized column vectors back to real space.
  let rotation = Mat3::from_rows(eigen.vectors[0], eigen.vectors[1], eigen.vectors[2]).transposed();
  let half_linear = DVec3::new(0.5 * g, 0.5 * h, 0.5 * j);

  let sets = match rank_principal {
    3 => {
      let translation = half_linear * principal.inverse().transposed();
      let dratio = det4(full) / principal.determinant();
      rank3_sets(name, inside, rank_matrix, translation, rotation, eigen.values, dratio)
    }
    2 => {
      let pqr = half_linear * rotation;
      rank2_sets(name, inside, rank_matrix, pqr, rotation, eigen.values, k)
    }
    1 => {
      let pqr = half_linear * rotation;
      rank1_sets(name, inside, rank_matrix, pqr, rotation, eigen.values, k)
    }
    _ => {
      // Zero principal part: the quadric degenerates to the plane of
      // its linear term.
      match rank_matrix {
        2 => {
          let normal = DVec3::new(g, h, j);
          if inside {
            vec![smallvec![pl(-normal, k)]]
          } else {
            vec![smallvec![pl(normal, -k)]]
          }
        }
        _ => {
          return Err(Error::DegenerateGeometry(format!(
            "quadric \"{name}\" has no quadratic and no linear part"
          )));
        }
      }
    }
  };

  if sets.is_empty() {
    tracing::warn!(surface = name, "no bounding planes derived; treating as unbounded");
    return Ok(vec![smallvec![]]);
  }
  Ok(sets)
}

/// Full-rank principal part: ellipsoids, hyperboloids, elliptic cones.
fn rank3_sets(
  name: &str,
  inside: bool,
  rank_matrix: i32,
  translation: DVec3,
  rotation: Mat3,
  mut values: [f64; 3],
  dratio: f64,
) -> PlaneSets {
  let mut norm_to_real = Affine::from_parts(rotation.transposed(), -translation);
  let mut sets = PlaneSets::new();

  if rank_matrix == 4 {
    // Normalize the constant to -1: lambda x'^2 + mu y'^2 + nu z'^2 = 1.
    let mut coeff: Vec<(f64, DVec3)> = (0..3)
      .map(|i| (-values[i] / dratio, rotation.col(i)))
      .collect();
    coeff.sort_by(|x, y| y.0.partial_cmp(&x.0).unwrap_or(std::cmp::Ordering::Equal));
    let ca = [coeff[0].0, coeff[1].0, coeff[2].0];
    norm_to_real = Affine::from_parts(
      Mat3::from_cols(coeff[0].1, coeff[1].1, coeff[2].1).transposed(),
      -translation,
    );

    match positive_count(&ca) {
      3 => {
        // Ellipsoid with semi-axes r_i.
        let r1 = 1.0 / ca[0].sqrt();
        let r2 = 1.0 / ca[1].sqrt();
        let r3 = 1.0 / ca[2].sqrt();
        if inside {
          sets.push(smallvec![
            pl(DVec3::X, -r1),
            pl(-DVec3::X, -r1),
            pl(DVec3::Y, -r2),
            pl(-DVec3::Y, -r2),
            pl(DVec3::Z, -r3),
            pl(-DVec3::Z, -r3),
          ]);
        } else {
          let s = 1.0 / 3.0_f64.sqrt();
          for (ax, r) in [(DVec3::X, r1), (DVec3::Y, r2), (DVec3::Z, r3)] {
            sets.push(smallvec![pl(ax, r * s)]);
            sets.push(smallvec![pl(-ax, r * s)]);
          }
        }
      }
      2 => {
        // One-sheet hyperboloid around z'.
        let lamb = ca[0];
        let mu = ca[1];
        let nu = -ca[2];
        let cx = 1.0 / lamb.sqrt();
        let cy = 1.0 / mu.sqrt();
        if inside {
          let (sl, sm, sn) = (lamb.sqrt(), mu.sqrt(), nu.sqrt());
          sets.push(smallvec![
            pl(DVec3::Z, 0.0),
            pl_through(DVec3::new(sl, 0.0, sn), DVec3::new(-cx, 0.0, 0.0)),
            pl_through(DVec3::new(-sl, 0.0, sn), DVec3::new(cx, 0.0, 0.0)),
            pl_through(DVec3::new(0.0, sm, sn), DVec3::new(0.0, -cy, 0.0)),
            pl_through(DVec3::new(0.0, -sm, sn), DVec3::new(0.0, cy, 0.0)),
          ]);
          sets.push(smallvec![
            pl(-DVec3::Z, 0.0),
            pl_through(DVec3::new(-sl, 0.0, -sn), DVec3::new(cx, 0.0, 0.0)),
            pl_through(DVec3::new(sl, 0.0, -sn), DVec3::new(-cx, 0.0, 0.0)),
            pl_through(DVec3::new(0.0, -sm, -sn), DVec3::new(0.0, cy, 0.0)),
            pl_through(DVec3::new(0.0, sm, -sn), DVec3::new(0.0, -cy, 0.0)),
          ]);
        } else {
          // Sides of the rectangle inscribed in the waist ellipse.
          sets.push(smallvec![pl(DVec3::X, cx)]);
          sets.push(smallvec![pl(-DVec3::X, cx)]);
          sets.push(smallvec![pl(DVec3::Y, cy)]);
          sets.push(smallvec![pl(-DVec3::Y, cy)]);
        }
      }
      1 => {
        // Two-sheet hyperboloid: each sheet sits in an
        // asymptote-bounded cone shifted off the waist plane.
        let lamb = ca[0];
        let nu = -ca[2];
        let (sl, sn) = (lamb.sqrt(), nu.sqrt());
        let mu = -ca[1];
        let sm = mu.sqrt();
        let zdist = 1.0 / nu.sqrt();
        if inside {
          sets.push(smallvec![
            pl(DVec3::Z, zdist),
            pl_through(DVec3::new(-sl, 0.0, sn), DVec3::ZERO),
            pl_through(DVec3::new(sl, 0.0, sn), DVec3::ZERO),
            pl_through(DVec3::new(0.0, -sm, sn), DVec3::ZERO),
            pl_through(DVec3::new(0.0, sm, sn), DVec3::ZERO),
          ]);
          sets.push(smallvec![
            pl(-DVec3::Z, zdist),
            pl_through(DVec3::new(-sl, 0.0, -sn), DVec3::ZERO),
            pl_through(DVec3::new(sl, 0.0, -sn), DVec3::ZERO),
            pl_through(DVec3::new(0.0, -sm, -sn), DVec3::ZERO),
            pl_through(DVec3::new(0.0, sm, -sn), DVec3::ZERO),
          ]);
        } else {
          sets = whole_space();
        }
      }
      _ => {
        tracing::warn!(surface = name, "quadric is an empty set (rank 3, no positive coefficients)");
      }
    }
  } else if rank_matrix == 3 {
    // Point or elliptic cone.
    let positives = positive_count(&values);
    if positives == 2 || positives == 1 {
      if positives == 1 {
        // One positive eigenvalue means the cone opens around x';
        // rotate x' onto z' and flip signs so the axis lands on z'
        // with the largest coefficient first.
        norm_to_real.set_rotation(
          rotation * rotation_about(DVec3::Y, 0.5 * std::f64::consts::PI),
        );
        for v in &mut values {
          *v = -*v;
        }
        values.swap(0, 2);
      }
      if inside {
        let cx = values[0].sqrt();
        let cy = values[1].sqrt();
        let cz = (-values[2]).sqrt();
        let nxz1 = DVec3::new(-cx, 0.0, cz).normalize();
        let nxz2 = DVec3::new(cx, 0.0, cz).normalize();
        let nyz1 = DVec3::new(0.0, -cy, cz).normalize();
        let nyz2 = DVec3::new(0.0, cy, cz).normalize();
        sets.push(smallvec![
          pl(nxz1, 0.0),
          pl(nxz2, 0.0),
          pl(nyz1, 0.0),
          pl(nyz2, 0.0),
          pl(DVec3::Z, 0.0),
        ]);
        sets.push(smallvec![
          pl(-nxz1, 0.0),
          pl(-nxz2, 0.0),
          pl(-nyz1, 0.0),
          pl(-nyz2, 0.0),
          pl(-DVec3::Z, 0.0),
        ]);
      } else {
        tracing::warn!(surface = name, "outside of an elliptic cone has no useful bounding set");
        sets = whole_space();
      }
    } else {
      tracing::warn!(surface = name, "quadric reduces to a single point");
    }
  }

  transform_sets(sets, &norm_to_real)
}

/// Rank-2 principal part: paraboloids, elliptic/hyperbolic cylinders,
/// intersecting planes, lines.
fn rank2_sets(
  name: &str,
  inside: bool,
  rank_matrix: i32,
  pqr: DVec3,
  rotation: Mat3,
  values: [f64; 3],
  dconst: f64,
) -> PlaneSets {
  let (p, q, r) = (pqr.x, pqr.y, pqr.z);
  let mut norm_to_real = Affine::IDENTITY;
  let mut sets = PlaneSets::new();

  if rank_matrix == 4 {
    // Reduces to lambda x'^2 + mu y'^2 + 2 r z' = 0.
    if r.abs() < EPS || values[0].abs() < EPS || values[1].abs() < EPS {
      tracing::warn!(surface = name, "paraboloid standardization failed; treating as unbounded");
      return whole_space();
    }
    let translation = DVec3::new(
      p / values[0],
      q / values[1],
      0.5 / r * (dconst - p * p / values[0] - q * q / values[1]),
    ) * rotation.transposed();
    norm_to_real = Affine::from_parts(rotation.transposed(), -translation);
    // Normalize the z' coefficient to -2.
    let lamb = -values[0] / r;
    let mu = -values[1] / r;
    match positive_count(&[lamb, mu]) {
      2 => {
        // Elliptic paraboloid opening along +z'.
        if inside {
          let s = 0.5 * 2.0_f64.sqrt();
          sets.push(smallvec![
            pl(DVec3::Z, 0.0),
            pl_through(DVec3::new(-s, 0.0, s), DVec3::new(0.5 / lamb, 0.0, 0.5 / lamb)),
            pl_through(DVec3::new(s, 0.0, s), DVec3::new(-0.5 / lamb, 0.0, 0.5 / lamb)),
            pl_through(DVec3::new(0.0, -s, s), DVec3::new(0.0, 0.5 / mu, 0.5 / mu)),
            pl_through(DVec3::new(0.0, s, s), DVec3::new(0.0, -0.5 / mu, 0.5 / mu)),
          ]);
        } else {
          tracing::warn!(surface = name, "outside of an elliptic paraboloid has no bounding set");
          sets = whole_space();
        }
      }
      1 => {
        // Hyperbolic paraboloid: neither side admits a bounding set.
        tracing::warn!(surface = name, "hyperbolic paraboloid has no bounding set");
        sets = whole_space();
      }
      _ => {
        // Rank and signature disagree under floating point.
        tracing::warn!(
          surface = name,
          "inconsistent rank/signature for a rank-2 quadric; treating as unbounded"
        );
        sets = whole_space();
      }
    }
  } else if rank_matrix == 3 {
    // lambda x'^2 + mu y'^2 + k = 0: elliptic or hyperbolic cylinder.
    if values[0].abs() < EPS || values[1].abs() < EPS {
      tracing::warn!(surface = name, "cylinder standardization failed; treating as unbounded");
      return whole_space();
    }
    let translation =
      DVec3::new(p / values[0], q / values[1], 0.0) * rotation.transposed();
    norm_to_real = Affine::from_parts(rotation.transposed(), -translation);
    let kconst = dconst - p * p / values[0] - q * q / values[1];
    if kconst.abs() < EPS {
      tracing::warn!(surface = name, "cylinder constant vanished; treating as unbounded");
      return whole_space();
    }
    let mut coeff = [-values[0] / kconst, -values[1] / kconst];
    match positive_count(&coeff) {
      2 => {
        let r1 = 1.0 / coeff[0].sqrt();
        let r2 = 1.0 / coeff[1].sqrt();
        if inside {
          sets.push(smallvec![
            pl(DVec3::X, -r1),
            pl(-DVec3::X, -r1),
            pl(DVec3::Y, -r2),
            pl(-DVec3::Y, -r2),
          ]);
        } else {
          let s = 1.0 / 2.0_f64.sqrt();
          sets.push(smallvec![pl(DVec3::X, r1 * s)]);
          sets.push(smallvec![pl(-DVec3::X, r1 * s)]);
          sets.push(smallvec![pl(DVec3::Y, r2 * s)]);
          sets.push(smallvec![pl(-DVec3::Y, r2 * s)]);
        }
      }
      1 => {
        // Hyperbolic cylinder: branches open along +-x' once the
        // positive coefficient sits first.
        if coeff[0] < coeff[1] {
          coeff.swap(0, 1);
          norm_to_real.set_rotation(
            norm_to_real.rotation() * rotation_about(DVec3::Z, 0.5 * std::f64::consts::PI),
          );
        }
        let lamb = coeff[0];
        let mu = -coeff[1];
        let (sl, sm) = (lamb.sqrt(), mu.sqrt());
        let focus1 = DVec3::new(1.0 / sl, 0.0, 0.0);
        let focus2 = -focus1;
        if inside {
          sets.push(smallvec![
            pl(DVec3::Z, 0.0),
            pl_through(DVec3::new(-sl, sm, 0.0), focus1),
            pl_through(DVec3::new(sl, sm, 0.0), focus2),
          ]);
          sets.push(smallvec![
            pl(-DVec3::Z, 0.0),
            pl_through(DVec3::new(-sl, -sm, 0.0), focus1),
            pl_through(DVec3::new(sl, -sm, 0.0), focus2),
          ]);
        } else {
          sets.push(smallvec![
            pl(-DVec3::Z, 0.0),
            pl(DVec3::new(sl, -sm, 0.0), 0.0),
            pl(DVec3::new(-sl, -sm, 0.0), 0.0),
          ]);
          sets.push(smallvec![
            pl(DVec3::Z, 0.0),
            pl(DVec3::new(sl, sm, 0.0), 0.0),
            pl(DVec3::new(-sl, sm, 0.0), 0.0),
          ]);
        }
      }
      _ => {
        tracing::warn!(surface = name, "quadric cylinder is an empty set");
        if !inside {
          sets = whole_space();
        }
      }
    }
  } else if rank_matrix == 2 {
    // A line or two intersecting planes.
    if values[0] * values[1] > 0.0 {
      tracing::warn!(surface = name, "quadric degenerates to a line; no bounding planes");
      if !inside {
        sets = whole_space();
      }
    } else {
      let tr = if values[0].abs() > EPS && values[1].abs() > EPS {
        DVec3::new(p / values[0], q / values[1], 0.0) * rotation.transposed()
      } else {
        DVec3::ZERO
      };
      norm_to_real = Affine::from_parts(rotation.transposed(), -tr);
      let cslope = (-values[0] / values[1]).sqrt();
      if inside {
        sets.push(smallvec![
          pl(DVec3::new(cslope, -1.0, 0.0), 0.0),
          pl(DVec3::new(cslope, 1.0, 0.0), 0.0),
          pl(DVec3::X, 0.0),
        ]);
        sets.push(smallvec![
          pl(DVec3::new(-cslope, 1.0, 0.0), 0.0),
          pl(DVec3::new(-cslope, -1.0, 0.0), 0.0),
          pl(-DVec3::X, 0.0),
        ]);
      } else {
        sets.push(smallvec![
          pl(DVec3::new(-cslope, 1.0, 0.0), 0.0),
          pl(DVec3::new(cslope, 1.0, 0.0), 0.0),
          pl(DVec3::Z, 0.0),
        ]);
        sets.push(smallvec![
          pl(DVec3::new(cslope, -1.0, 0.0), 0.0),
          pl(DVec3::new(-cslope, -1.0, 0.0), 0.0),
          pl(-DVec3::Z, 0.0),
        ]);
      }
    }
  } else {
    tracing::warn!(surface = name, rank_matrix, "quadric is an empty set");
  }

  transform_sets(sets, &norm_to_real)
}

/// Rank-1 principal part: parabolic cylinder, parallel planes, a
/// single plane.
fn rank1_sets(
  name: &str,
  inside: bool,
  rank_matrix: i32,
  pqr: DVec3,
  rotation: Mat3,
  values: [f64; 3],
  dconst: f64,
) -> PlaneSets {
  let lamb0 = values[0];
  let (p, mut q, mut r) = (pqr.x, pqr.y, pqr.z);
  let mut rotation = rotation;
  let mut sets = PlaneSets::new();
  let norm_to_real;

  if rank_matrix == 3 {
    // Parabolic cylinder: one of q, r is zero; arrange for q = 0.
    if q.abs() > r.abs() {
      std::mem::swap(&mut q, &mut r);
      rotation = Mat3::from_cols(rotation.col(0), rotation.col(2), rotation.col(1));
    }
    if lamb0.abs() < EPS || r.abs() < EPS {
      tracing::warn!(surface = name, "parabolic cylinder standardization failed");
      return whole_space();
    }
    let translation = DVec3::new(
      p / lamb0,
      0.0,
      0.5 * (dconst - p * p / lamb0) / r,
    ) * rotation.transposed();
    norm_to_real = Affine::from_parts(rotation.transposed(), -translation);
    // The apex tangent plane, oriented toward the opening.
    let zfwd = if -lamb0 / r > 0.0 { 1.0 } else { -1.0 };
    if inside {
      sets.push(smallvec![pl(DVec3::new(0.0, 0.0, zfwd), 0.0)]);
    } else {
      sets.push(smallvec![pl(DVec3::new(0.0, 0.0, -zfwd), 0.0)]);
    }
  } else if rank_matrix == 2 {
    // lambda x'^2 + k = 0: two parallel planes or nothing.
    let kconst = dconst - p * p / lamb0;
    if kconst.abs() < EPS {
      tracing::warn!(surface = name, "parallel-plane constant vanished");
      return whole_space();
    }
    let lamb = -lamb0 / kconst;
    norm_to_real = Affine::from_parts(
      rotation.transposed(),
      -(DVec3::new(p / lamb0, 0.0, 0.0) * rotation.transposed()),
    );
    if lamb > 0.0 {
      let xpos = 1.0 / lamb.sqrt();
      if inside {
        sets.push(smallvec![pl(-DVec3::X, -xpos), pl(DVec3::X, -xpos)]);
      } else {
        sets.push(smallvec![pl(DVec3::X, xpos)]);
        sets.push(smallvec![pl(-DVec3::X, xpos)]);
      }
    } else {
      tracing::warn!(surface = name, "quadric is an empty set (negative parallel-plane constant)");
      if !inside {
        sets = whole_space();
      }
    }
  } else {
    // Single plane x'^2 = 0.
    norm_to_real = Affine::from_parts(rotation.transposed(), DVec3::ZERO);
    let normal = if inside { -DVec3::X } else { DVec3::X };
    sets.push(smallvec![pl(normal, 0.0)]);
  }

  transform_sets(sets, &norm_to_real)
}

#[cfg(test)]
#[path = "quadric_bounds_test.rs"]
mod quadric_bounds_test;
