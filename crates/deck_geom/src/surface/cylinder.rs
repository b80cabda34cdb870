//! Circular cylinders about an arbitrary axis (`c/x c/y c/z cx cy cz`,
//! the general `ca` form, and the RCC macrobody side).

use glam::DVec3;
use smallvec::smallvec;

use crate::bbox::BoundingBox;
use crate::constants::{EPS, MAX_EXTENT};
use crate::error::Result;
use crate::math::{get_two_orthogonal_units, normalized, Affine, Point, Vector};
use crate::surface::plane::Plane;
use crate::surface::PlaneSets;

/// Infinite circular cylinder. `refpoint` is any point on the axis;
/// the forward side is outside the shell.
#[derive(Clone, Copy, Debug)]
pub struct Cylinder {
  pub refpoint: Point,
  pub axis: Vector,
  pub radius: f64,
}

impl Cylinder {
  pub fn new(refpoint: Point, axis: Vector, radius: f64) -> Result<Cylinder> {
    if radius <= 0.0 {
      return Err(crate::error::Error::DegenerateGeometry(format!(
        "cylinder radius must be positive, got {radius}"
      )));
    }
    Ok(Cylinder {
      refpoint,
      axis: normalized(axis)?,
      radius,
    })
  }

  fn perp(&self, p: Point) -> Vector {
    let rel = p - self.refpoint;
    rel - rel.dot(self.axis) * self.axis
  }

  pub fn implicit(&self, p: Point) -> f64 {
    self.perp(p).length_squared() - self.radius * self.radius
  }

  pub fn intersection(&self, point: Point, direction: Vector) -> Option<Point> {
    let dp = direction - direction.dot(self.axis) * self.axis;
    let rp = self.perp(point);
    let c2 = dp.length_squared();
    let c1 = 2.0 * rp.dot(dp);
    let c0 = rp.length_squared() - self.radius * self.radius;
    let disc = c1 * c1 - 4.0 * c2 * c0;
    if disc <= 0.0 {
      return None;
    }
    if c2.abs() < EPS {
      // Running parallel to the axis never crosses the shell.
      return None;
    }
    let sq = disc.sqrt();
    let t1 = 0.5 * (-c1 - sq) / c2;
    let t2 = 0.5 * (-c1 + sq) / c2;
    let t = if t1 > 0.0 {
      t1
    } else if t2 > 0.0 {
      t2
    } else {
      return None;
    };
    Some(point + t * direction)
  }

  pub fn transform(&mut self, matrix: &Affine) {
    self.refpoint = matrix.apply_point(self.refpoint);
    self.axis = matrix.apply_vector(self.axis).normalize();
  }

  /// Inside: the four side planes of the circumscribed square prism.
  /// Outside: the four tangent planes of the inscribed square prism
  /// (at `r / sqrt(2)`), one conjunction each.
  pub fn bounding_planes(&self, reversed: bool) -> PlaneSets {
    let (u, v) = match get_two_orthogonal_units(self.axis) {
      Ok(pair) => pair,
      Err(_) => return PlaneSets::new(),
    };
    let c = self.refpoint;
    let r = self.radius;
    if reversed {
      vec![smallvec![
        Plane::through(u, c - r * u).unwrap(),
        Plane::through(-u, c + r * u).unwrap(),
        Plane::through(v, c - r * v).unwrap(),
        Plane::through(-v, c + r * v).unwrap(),
      ]]
    } else {
      let d = r / 2.0_f64.sqrt();
      vec![
        smallvec![Plane::through(u, c + d * u).unwrap()],
        smallvec![Plane::through(-u, c - d * u).unwrap()],
        smallvec![Plane::through(v, c + d * v).unwrap()],
        smallvec![Plane::through(-v, c - d * v).unwrap()],
      ]
    }
  }

  pub fn generate_bbox(&self, reversed: bool) -> BoundingBox {
    if !reversed {
      return BoundingBox::universal();
    }
    // Bounded across the axis, unbounded along it.
    let mut lo = [0.0_f64; 3];
    let mut hi = [0.0_f64; 3];
    let axes = [DVec3::X, DVec3::Y, DVec3::Z];
    for (i, e) in axes.iter().enumerate() {
      if self.axis.dot(*e).abs() < EPS {
        let c = self.refpoint.dot(*e);
        lo[i] = c - self.radius;
        hi[i] = c + self.radius;
      } else {
        lo[i] = -MAX_EXTENT;
        hi[i] = MAX_EXTENT;
      }
    }
    BoundingBox::new(lo[0], hi[0], lo[1], hi[1], lo[2], hi[2])
  }

  pub fn to_input_string(&self, name: &str) -> String {
    let ax = self.axis;
    let c = self.refpoint;
    // Prefer the standard axis-parallel spellings; the general `ca`
    // form is the canonical serialization for everything else.
    if ax.cross(DVec3::X).length() < EPS {
      if c.y.abs() < EPS && c.z.abs() < EPS {
        return format!("{} cx {}", name, self.radius);
      }
      return format!("{} c/x {} {} {}", name, c.y, c.z, self.radius);
    }
    if ax.cross(DVec3::Y).length() < EPS {
      if c.x.abs() < EPS && c.z.abs() < EPS {
        return format!("{} cy {}", name, self.radius);
      }
      return format!("{} c/y {} {} {}", name, c.x, c.z, self.radius);
    }
    if ax.cross(DVec3::Z).length() < EPS {
      if c.x.abs() < EPS && c.y.abs() < EPS {
        return format!("{} cz {}", name, self.radius);
      }
      return format!("{} c/z {} {} {}", name, c.x, c.y, self.radius);
    }
    format!(
      "{} ca {} {} {} {} {} {} {}",
      name, c.x, c.y, c.z, ax.x, ax.y, ax.z, self.radius
    )
  }
}
