//! Spheres (`s`, `so`, `sx/sy/sz` and the SPH macrobody product).

use glam::DVec3;
use smallvec::smallvec;

use crate::bbox::BoundingBox;
use crate::constants::EPS;
use crate::error::{Error, Result};
use crate::math::{Affine, Point, Vector};
use crate::surface::plane::Plane;
use crate::surface::PlaneSets;

/// Sphere `|x - c|^2 - r^2 = 0`; the forward side is outside.
#[derive(Clone, Copy, Debug)]
pub struct Sphere {
  pub center: Point,
  pub radius: f64,
}

impl Sphere {
  pub fn new(center: Point, radius: f64) -> Result<Sphere> {
    if radius <= 0.0 {
      return Err(Error::DegenerateGeometry(format!(
        "sphere radius must be positive, got {radius}"
      )));
    }
    Ok(Sphere { center, radius })
  }

  pub fn implicit(&self, p: Point) -> f64 {
    (p - self.center).length_squared() - self.radius * self.radius
  }

  pub fn intersection(&self, point: Point, direction: Vector) -> Option<Point> {
    let rel = point - self.center;
    let c2 = direction.length_squared();
    let c1 = 2.0 * rel.dot(direction);
    let c0 = rel.length_squared() - self.radius * self.radius;
    let disc = c1 * c1 - 4.0 * c2 * c0;
    if disc <= 0.0 {
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
    self.center = matrix.apply_point(self.center);
  }

  /// Inside: the inscribing box as one conjunction. Outside: the six
  /// tangent planes of the maximal inscribed box (touching at
  /// `r / sqrt(3)`), one conjunction each.
  pub fn bounding_planes(&self, reversed: bool) -> PlaneSets {
    let c = self.center;
    let r = self.radius;
    let axes = [DVec3::X, DVec3::Y, DVec3::Z];
    if reversed {
      let mut planes = smallvec::SmallVec::<[Plane; 6]>::new();
      for ax in axes {
        planes.push(Plane::through(ax, c - r * ax).unwrap());
        planes.push(Plane::through(-ax, c + r * ax).unwrap());
      }
      vec![planes]
    } else {
      let d = r / 3.0_f64.sqrt();
      let mut sets = PlaneSets::new();
      for ax in axes {
        sets.push(smallvec![Plane::through(ax, c + d * ax).unwrap()]);
        sets.push(smallvec![Plane::through(-ax, c - d * ax).unwrap()]);
      }
      sets
    }
  }

  pub fn generate_bbox(&self, reversed: bool) -> BoundingBox {
    if reversed {
      BoundingBox::new(
        self.center.x - self.radius,
        self.center.x + self.radius,
        self.center.y - self.radius,
        self.center.y + self.radius,
        self.center.z - self.radius,
        self.center.z + self.radius,
      )
    } else {
      BoundingBox::universal()
    }
  }

  pub fn to_input_string(&self, name: &str) -> String {
    if self.center.length() < EPS {
      format!("{} so {}", name, self.radius)
    } else {
      format!(
        "{} s {} {} {} {}",
        name, self.center.x, self.center.y, self.center.z, self.radius
      )
    }
  }
}
