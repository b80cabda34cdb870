//! Helpers over `glam::DVec3`: dependence tests, Gram-Schmidt
//! orthogonalization and orthogonal-frame construction.

use glam::DVec3;

use crate::constants::{EPS, EPS_ZERO_VEC};
use crate::error::{Error, Result};

/// A position in R^3.
pub type Point = DVec3;
/// A direction or displacement in R^3.
pub type Vector = DVec3;

/// Principal axis selector used by axis-variant cards (PX/CX/KX/TX...).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
  X,
  Y,
  Z,
}

impl Axis {
  pub fn unit(self) -> Vector {
    match self {
      Axis::X => DVec3::X,
      Axis::Y => DVec3::Y,
      Axis::Z => DVec3::Z,
    }
  }

  /// Lowercase mnemonic character of the axis.
  pub fn mnemonic(self) -> char {
    match self {
      Axis::X => 'x',
      Axis::Y => 'y',
      Axis::Z => 'z',
    }
  }
}

/// Componentwise coincidence within the geometric tolerance.
pub fn is_same_point(a: Point, b: Point) -> bool {
  (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS && (a.z - b.z).abs() < EPS
}

/// True when the two vectors are linearly dependent (parallel or
/// anti-parallel, or either is zero).
pub fn is_dependent(a: Vector, b: Vector) -> bool {
  a.cross(b).length() < EPS * (1.0 + a.length() * b.length())
}

/// True when the two vectors are orthogonal within tolerance.
pub fn is_orthogonal(a: Vector, b: Vector) -> bool {
  a.dot(b).abs() < EPS * (1.0 + a.length() * b.length())
}

/// Unit vector, or `DegenerateGeometry` when the magnitude is below
/// the zero threshold.
pub fn normalized(v: Vector) -> Result<Vector> {
  let len = v.length();
  if len < EPS_ZERO_VEC {
    return Err(Error::DegenerateGeometry(format!(
      "cannot normalize a zero vector ({}, {}, {})",
      v.x, v.y, v.z
    )));
  }
  Ok(v / len)
}

/// In-place Gram-Schmidt orthogonalization with `relax` extra
/// stabilization passes. Vectors that turn out linearly dependent on
/// their predecessors are zeroed. Returns the number of independent
/// vectors.
pub fn orthogonalize(vecs: &mut [Vector], relax: usize) -> usize {
  for _ in 0..=relax {
    for i in 0..vecs.len() {
      if vecs[i].length() < EPS_ZERO_VEC {
        continue;
      }
      for j in 0..i {
        let denom = vecs[j].length_squared();
        if denom < EPS_ZERO_VEC * EPS_ZERO_VEC {
          continue;
        }
        let proj = vecs[i].dot(vecs[j]) / denom;
        vecs[i] -= proj * vecs[j];
      }
    }
  }
  let mut count = 0;
  for v in vecs.iter_mut() {
    if v.length() < EPS_ZERO_VEC {
      *v = DVec3::ZERO;
    } else {
      count += 1;
    }
  }
  count
}

/// A unit vector orthogonal to `reference`, built from the principal
/// axis least aligned with it.
pub fn get_orthogonal_unit(reference: Vector) -> Vector {
  let mut best = DVec3::X;
  let mut best_prod = best.dot(reference);
  for cand in [DVec3::Y, DVec3::Z] {
    let prod = cand.dot(reference);
    if prod * prod < best_prod * best_prod {
      best = cand;
      best_prod = prod;
    }
  }
  (best - best_prod / reference.length_squared() * reference).normalize()
}

/// Two unit vectors that, with `axis`, form an orthogonal frame. The
/// pair spans the plane perpendicular to `axis`.
pub fn get_two_orthogonal_units(axis: Vector) -> Result<(Vector, Vector)> {
  let v0 = axis;
  let mut v1 = DVec3::X;
  if is_dependent(v0, v1) {
    v1 = DVec3::Y;
  }
  let v2 = v0.cross(v1);
  let mut frame = [v0, v1, v2];
  if orthogonalize(&mut frame, 0) != 3 {
    return Err(Error::DegenerateGeometry(
      "failed to build an orthogonal frame around the axis".into(),
    ));
  }
  Ok((frame[1].normalize(), frame[2].normalize()))
}

#[cfg(test)]
#[path = "vector_test.rs"]
mod vector_test;
