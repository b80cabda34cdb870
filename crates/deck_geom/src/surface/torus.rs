//! Elliptic-section tori (`tx ty tz ta` and the TOR macrobody core).
//!
//! Internal storage is the canonical frame: center at the origin, axis
//! along +z. An optional affine pair maps canonical coordinates to the
//! world and back; `center()` / `axis()` answer in world coordinates.

use glam::DVec3;
use smallvec::smallvec;

use crate::bbox::BoundingBox;
use crate::constants::NEWTON_PREC;
use crate::error::{Error, Result};
use crate::math::quartic::{refine_newton, solve_quartic};
use crate::math::{get_two_orthogonal_units, is_same_point, rotation_onto, Affine, Point, Vector};
use crate::surface::plane::Plane;
use crate::surface::PlaneSets;

/// Torus with major radius `r_major`, vertical minor semi-axis `a`
/// (along the torus axis) and horizontal minor semi-axis `b`. The
/// implicit function in the canonical frame is
/// `[b^2 z^2 + a^2 (x^2 + y^2 + R^2 - b^2)]^2 - 4 a^4 R^2 (x^2 + y^2)`;
/// the forward side is outside the tube.
#[derive(Clone, Debug)]
pub struct Torus {
  pub r_major: f64,
  pub a: f64,
  pub b: f64,
  /// (canonical -> world, world -> canonical), absent when already
  /// canonical.
  tr: Option<Box<(Affine, Affine)>>,
}

impl Torus {
  pub fn new(center: Point, axis: Vector, r_major: f64, a: f64, b: f64) -> Result<Torus> {
    if a <= 0.0 {
      return Err(Error::DegenerateGeometry(
        "torus vertical minor radius must be positive".into(),
      ));
    }
    if b <= 0.0 {
      return Err(Error::DegenerateGeometry(
        "torus horizontal minor radius must be positive".into(),
      ));
    }
    if r_major <= 0.0 {
      return Err(Error::DegenerateGeometry(
        "torus major radius must be positive".into(),
      ));
    }
    let axis_unit = crate::math::normalized(axis)?;
    let mut matrix = Affine::IDENTITY;
    if !is_same_point(axis_unit, DVec3::Z) {
      // Canonical -> world: carry +z onto the requested axis.
      matrix.set_rotation(rotation_onto(axis_unit, DVec3::Z));
    }
    if !is_same_point(center, DVec3::ZERO) {
      matrix = matrix * Affine::from_translation(center);
    }
    let tr = if matrix.is_identity() {
      None
    } else {
      Some(Box::new((matrix, matrix.inverse())))
    };
    Ok(Torus {
      r_major,
      a,
      b,
      tr,
    })
  }

  pub fn center(&self) -> Point {
    match &self.tr {
      Some(pair) => pair.0.apply_point(DVec3::ZERO),
      None => DVec3::ZERO,
    }
  }

  pub fn axis(&self) -> Vector {
    match &self.tr {
      Some(pair) => pair.0.apply_vector(DVec3::Z),
      None => DVec3::Z,
    }
  }

  fn to_canonical(&self, p: Point) -> Point {
    match &self.tr {
      Some(pair) => pair.1.apply_point(p),
      None => p,
    }
  }

  pub fn implicit(&self, point: Point) -> f64 {
    let p = self.to_canonical(point);
    let a2 = self.a * self.a;
    let b2 = self.b * self.b;
    let r2 = self.r_major * self.r_major;
    let rho2 = p.x * p.x + p.y * p.y;
    let term1 = b2 * p.z * p.z + a2 * (rho2 + r2 - b2);
    term1 * term1 - 4.0 * a2 * a2 * r2 * rho2
  }

  /// Accumulate a further transform onto the canonical-frame pair.
  pub fn transform(&mut self, matrix: &Affine) {
    if matrix.is_identity() {
      return;
    }
    let current = match &self.tr {
      Some(pair) => pair.0,
      None => Affine::IDENTITY,
    };
    let combined = current * *matrix;
    self.tr = Some(Box::new((combined, combined.inverse())));
  }

  /// Smallest positive root of the canonical-frame quartic, polished
  /// with one Newton pass per root before selection.
  pub fn intersection(&self, point: Point, direction: Vector) -> Option<Point> {
    let mut p = point;
    let mut d = direction.normalize();
    if let Some(pair) = &self.tr {
      p = pair.1.apply_point(p);
      d = pair.1.apply_vector(d);
    }
    let a2 = self.a * self.a;
    let b2 = self.b * self.b;
    let r2 = self.r_major * self.r_major;
    let (sx, sy, sz) = (p.x, p.y, p.z);
    let (sx2, sy2, sz2) = (sx * sx, sy * sy, sz * sz);
    let (dx, dy, dz) = (d.x, d.y, d.z);

    let mut c4 = b2 * dz * dz + a2 * dy * dy + a2 * dx * dx;
    c4 *= c4;
    let c3 = 4.0
      * (sz * b2 * dz + sy * a2 * dy + sx * a2 * dx)
      * (b2 * dz * dz + a2 * dy * dy + a2 * dx * dx);
    let c2 = ((6.0 * sz2 - 2.0 * a2) * b2 * b2 + (2.0 * sy2 + 2.0 * sx2 + 2.0 * r2) * a2 * b2)
      * dz
      * dz
      + (8.0 * sy * sz * a2 * b2 * dy + 8.0 * sx * sz * a2 * b2 * dx) * dz
      + ((2.0 * sz2 * a2 - 2.0 * a2 * a2) * b2 + (6.0 * sy2 + 2.0 * sx2 - 2.0 * r2) * a2 * a2)
        * dy
        * dy
      + 8.0 * sx * sy * a2 * a2 * dx * dy
      + ((2.0 * sz2 * a2 - 2.0 * a2 * a2) * b2 + (2.0 * sy2 + 6.0 * sx2 - 2.0 * r2) * a2 * a2)
        * dx
        * dx;
    let c1 = ((4.0 * sz2 * sz - 4.0 * sz * a2) * b2 * b2
      + (4.0 * sy2 + 4.0 * sx2 + 4.0 * r2) * sz * a2 * b2)
      * dz
      + ((4.0 * sy * sz2 * a2 - 4.0 * sy * a2 * a2) * b2
        + (4.0 * sy2 * sy + (4.0 * sx2 - 4.0 * r2) * sy) * a2 * a2)
        * dy
      + ((4.0 * sx * sz2 * a2 - 4.0 * sx * a2 * a2) * b2
        + (4.0 * sx * sy2 + 4.0 * sx2 * sx - 4.0 * r2 * sx) * a2 * a2)
        * dx;
    let c0 = (a2 * a2 - 2.0 * sz2 * a2 + sz2 * sz2) * b2 * b2
      + ((-2.0 * sy2 - 2.0 * sx2 - 2.0 * r2) * a2 * a2
        + (2.0 * sy2 + 2.0 * sx2 + 2.0 * r2) * sz2 * a2)
        * b2
      + (sy2 * sy2 + (2.0 * sx2 - 2.0 * r2) * sy2 + sx2 * sx2 - 2.0 * r2 * sx2 + r2 * r2)
        * a2
        * a2;

    let mut sols = solve_quartic(c4, c3, c2, c1, c0, false);
    sols.sort_by(|x, y| x.partial_cmp(y).unwrap());
    // Ferrari alone cannot keep the hit on the torus; a Newton polish
    // per candidate pulls it back before the positivity selection.
    for s in &mut sols {
      *s = refine_newton(c4, c3, c2, c1, c0, *s, NEWTON_PREC);
    }
    let t = sols.into_iter().find(|s| *s > 0.0)?;
    let mut hit = p + t * d;
    if let Some(pair) = &self.tr {
      hit = pair.0.apply_point(hit);
    }
    Some(hit)
  }

  /// Inside: one conjunction of six half-spaces tangent to the tube
  /// extents. Outside: the whole-space sentinel.
  pub fn bounding_planes(&self, reversed: bool) -> PlaneSets {
    if !reversed {
      return crate::surface::whole_space();
    }
    let axis = self.axis();
    let center = self.center();
    let (v1, v2) = match get_two_orthogonal_units(axis) {
      Ok(pair) => pair,
      Err(_) => return PlaneSets::new(),
    };
    let reach = self.b + self.r_major;
    vec![smallvec![
      Plane::through(-axis, center + axis * self.a).unwrap(),
      Plane::through(axis, center - axis * self.a).unwrap(),
      Plane::through(-v1, center + v1 * reach).unwrap(),
      Plane::through(v1, center - v1 * reach).unwrap(),
      Plane::through(-v2, center + v2 * reach).unwrap(),
      Plane::through(v2, center - v2 * reach).unwrap(),
    ]]
  }

  pub fn generate_bbox(&self, reversed: bool) -> BoundingBox {
    if !reversed {
      return BoundingBox::universal();
    }
    let c = self.center();
    let ax = self.axis();
    let minor_max = self.a.max(self.b);
    let width = |unit: DVec3| -> f64 {
      let axial = (self.a * ax).dot(unit).abs();
      let radial = ax.cross(unit).length() * self.r_major + minor_max;
      axial.max(radial)
    };
    let (wx, wy, wz) = (width(DVec3::X), width(DVec3::Y), width(DVec3::Z));
    BoundingBox::new(c.x - wx, c.x + wx, c.y - wy, c.y + wy, c.z - wz, c.z + wz)
  }

  pub fn to_input_string(&self, name: &str) -> String {
    let c = self.center();
    let ax = self.axis();
    format!(
      "{} ta {} {} {} {} {} {} {} {} {}",
      name, c.x, c.y, c.z, ax.x, ax.y, ax.z, self.r_major, self.a, self.b
    )
  }
}

#[cfg(test)]
#[path = "torus_test.rs"]
mod torus_test;
