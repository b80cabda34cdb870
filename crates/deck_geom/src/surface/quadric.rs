//! General quadrics (`gq`, `sq`, ELL/REC/QUA macrobody products).
//!
//! The transform acts directly on the ten implicit-function
//! coefficients; no matrix is retained on the surface.

use crate::bbox::BoundingBox;
use crate::constants::EPS;
use crate::error::{Error, Result};
use crate::math::{Affine, Point, Vector};
use crate::surface::PlaneSets;

/// `A x^2 + B y^2 + C z^2 + D xy + E yz + F zx + G x + H y + J z + K`.
/// The forward side is where the implicit value is non-negative.
#[derive(Clone, Copy, Debug)]
pub struct Quadric {
  /// A B C D E F G H J K, in card order.
  pub coeffs: [f64; 10],
}

impl Quadric {
  pub fn new(coeffs: [f64; 10]) -> Quadric {
    Quadric { coeffs }
  }

  /// `SQ` cards store axis-aligned coefficients plus a center; the
  /// center folds into a translation applied on top of any explicit
  /// transform.
  pub fn from_sq(params: &[f64], tr: &Affine) -> Result<(Quadric, Affine)> {
    if params.len() != 10 {
      return Err(Error::DegenerateGeometry(format!(
        "SQ requires 10 parameters, got {}",
        params.len()
      )));
    }
    let coeffs = [
      params[0],
      params[1],
      params[2],
      0.0,
      0.0,
      0.0,
      2.0 * params[3],
      2.0 * params[4],
      2.0 * params[5],
      params[6],
    ];
    let center = Affine::from_translation(Vector::new(params[7], params[8], params[9]));
    Ok((Quadric::new(coeffs), center * *tr))
  }

  pub fn implicit(&self, p: Point) -> f64 {
    let [a, b, c, d, e, f, g, h, j, k] = self.coeffs;
    let (x, y, z) = (p.x, p.y, p.z);
    a * x * x + b * y * y + c * z * z + d * x * y + e * y * z + f * z * x + g * x + h * y + j * z + k
  }

  /// Rewrite the coefficients under `x -> x R + t`. Applying the
  /// transform and then its inverse restores the coefficients up to a
  /// uniform scale.
  pub fn transform(&mut self, matrix: &Affine) {
    if matrix.is_identity() {
      return;
    }
    let m = &matrix.m;
    let (a11, a12, a13) = (m[0][0], m[0][1], m[0][2]);
    let (a21, a22, a23) = (m[1][0], m[1][1], m[1][2]);
    let (a31, a32, a33) = (m[2][0], m[2][1], m[2][2]);
    let (ll1, ll2, ll3) = (m[3][0], m[3][1], m[3][2]);
    let l1 = ll1 * a11 + ll2 * a12 + ll3 * a13;
    let l2 = ll1 * a21 + ll2 * a22 + ll3 * a23;
    let l3 = ll1 * a31 + ll2 * a32 + ll3 * a33;

    let [a, b, c, d, e, f, g, h, j, k] = self.coeffs;

    let na = a11 * a11 * a + a21 * a21 * b + a31 * a31 * c
      + a11 * a21 * d
      + a21 * a31 * e
      + a11 * a31 * f;
    let nb = a12 * a12 * a + a22 * a22 * b + a32 * a32 * c
      + a12 * a22 * d
      + a22 * a32 * e
      + a12 * a32 * f;
    let nc = a13 * a13 * a + a23 * a23 * b + a33 * a33 * c
      + a13 * a23 * d
      + a23 * a33 * e
      + a13 * a33 * f;
    let nd = 2.0 * a11 * a12 * a
      + 2.0 * a21 * a22 * b
      + 2.0 * a31 * a32 * c
      + a11 * a22 * d
      + a12 * a21 * d
      + a21 * a32 * e
      + a22 * a31 * e
      + a11 * a32 * f
      + a12 * a31 * f;
    let ne = 2.0 * a12 * a13 * a
      + 2.0 * a22 * a23 * b
      + 2.0 * a32 * a33 * c
      + a12 * a23 * d
      + a13 * a22 * d
      + a22 * a33 * e
      + a23 * a32 * e
      + a12 * a33 * f
      + a13 * a32 * f;
    let nf = 2.0 * a11 * a13 * a
      + 2.0 * a21 * a23 * b
      + 2.0 * a31 * a33 * c
      + a11 * a23 * d
      + a13 * a21 * d
      + a21 * a33 * e
      + a23 * a31 * e
      + a11 * a33 * f
      + a13 * a31 * f;
    let ng = -2.0 * l1 * a11 * a - 2.0 * l2 * a21 * b - 2.0 * l3 * a31 * c
      - l1 * a21 * d
      - l2 * a11 * d
      - l2 * a31 * e
      - l3 * a21 * e
      - l1 * a31 * f
      - l3 * a11 * f
      + a11 * g
      + a21 * h
      + a31 * j;
    let nh = -2.0 * l1 * a12 * a - 2.0 * l2 * a22 * b - 2.0 * l3 * a32 * c
      - l1 * a22 * d
      - l2 * a12 * d
      - l2 * a32 * e
      - l3 * a22 * e
      - l1 * a32 * f
      - l3 * a12 * f
      + a12 * g
      + a22 * h
      + a32 * j;
    let nj = -2.0 * l1 * a13 * a - 2.0 * l2 * a23 * b - 2.0 * l3 * a33 * c
      - l1 * a23 * d
      - l2 * a13 * d
      - l2 * a33 * e
      - l3 * a23 * e
      - l1 * a33 * f
      - l3 * a13 * f
      + a13 * g
      + a23 * h
      + a33 * j;
    let nk = l1 * l1 * a + l2 * l2 * b + l3 * l3 * c + l1 * l2 * d + l2 * l3 * e + l1 * l3 * f
      - l1 * g
      - l2 * h
      - l3 * j
      + k;

    self.coeffs = [na, nb, nc, nd, ne, nf, ng, nh, nj, nk];
  }

  pub fn intersection(&self, point: Point, direction: Vector) -> Option<Point> {
    let [a, b, c, d, e, f, g, h, j, _k] = self.coeffs;
    let (d1, d2, d3) = (direction.x, direction.y, direction.z);
    let (x, y, z) = (point.x, point.y, point.z);

    let c2 = c * d3 * d3 + e * d2 * d3 + f * d1 * d3 + b * d2 * d2 + d * d1 * d2 + a * d1 * d1;
    let c1 = 2.0 * c * d3 * z
      + e * d2 * z
      + f * d1 * z
      + e * d3 * y
      + 2.0 * b * d2 * y
      + d * d1 * y
      + f * d3 * x
      + d * d2 * x
      + 2.0 * a * d1 * x
      + j * d3
      + h * d2
      + g * d1;
    let c0 = self.implicit(point);

    let disc = c1 * c1 - 4.0 * c2 * c0;
    // Tangent or missing the quadric entirely.
    if disc <= 0.0 {
      return None;
    }
    if c2.abs() < EPS {
      let t = -c0 / c1;
      return if t < 0.0 { None } else { Some(point + t * direction) };
    }
    let sq = disc.sqrt();
    let t1 = 0.5 * (-c1 + sq) / c2;
    let t2 = 0.5 * (-c1 - sq) / c2;
    let (small, large) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
    if large < 0.0 {
      return None;
    }
    let t = if small > 0.0 { small } else { large };
    Some(point + t * direction)
  }

  pub fn bounding_planes(&self, name: &str, reversed: bool) -> Result<PlaneSets> {
    crate::surface::quadric_bounds::bounding_planes(self, name, reversed)
  }

  pub fn generate_bbox(&self, name: &str, reversed: bool) -> BoundingBox {
    // Derive from the bounding planes: a single conjunction of
    // axis-parallel planes clips; anything else stays universal here
    // (the cell layer intersects plane sets properly).
    let Ok(sets) = self.bounding_planes(name, reversed) else {
      return BoundingBox::universal();
    };
    if sets.len() == 1 {
      let mut bb = BoundingBox::universal();
      for plane in &sets[0] {
        bb = BoundingBox::and(&bb, &plane.generate_bbox());
      }
      return bb;
    }
    BoundingBox::universal()
  }

  pub fn to_input_string(&self, name: &str) -> String {
    let c = &self.coeffs;
    format!(
      "{} gq {} {} {} {} {} {} {} {} {} {}",
      name, c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7], c[8], c[9]
    )
  }
}

#[cfg(test)]
#[path = "quadric_test.rs"]
mod quadric_test;
