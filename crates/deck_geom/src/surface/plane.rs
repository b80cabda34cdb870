//! Planes: the primitive surface and the currency of every
//! bounding-plane computation.

use glam::DVec3;

use crate::bbox::BoundingBox;
use crate::constants::{EPS, MAX_EXTENT};
use crate::error::{Error, Result};
use crate::math::{is_dependent, is_same_point, Affine, Mat3, Point, Vector};

/// Oriented plane `n . x - d = 0` with unit normal. The forward side is
/// `n . x - d >= 0`.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
  normal: Vector,
  distance: f64,
}

impl Plane {
  /// Normalizes the normal; the distance scales along with it.
  pub fn new(normal: Vector, distance: f64) -> Result<Plane> {
    let len = normal.length();
    if len < crate::constants::EPS_ZERO_VEC {
      return Err(Error::DegenerateGeometry(
        "plane normal must not be zero".into(),
      ));
    }
    Ok(Plane {
      normal: normal / len,
      distance: distance / len,
    })
  }

  /// Plane with the given normal passing through `point`.
  pub fn through(normal: Vector, point: Point) -> Result<Plane> {
    let len = normal.length();
    if len < crate::constants::EPS_ZERO_VEC {
      return Err(Error::DegenerateGeometry(
        "plane normal must not be zero".into(),
      ));
    }
    let n = normal / len;
    Ok(Plane {
      normal: n,
      distance: point.dot(n),
    })
  }

  /// The MCNP nine-parameter rule. The normal direction is fixed by:
  /// 1. the reference point (the origin) lies in the back half-space;
  /// 2. if the plane passes through the reference point, the +z
  ///    half-space is front; with `n_z = 0`, +y; with `n_y = 0` too,
  ///    +x;
  /// 3. a fully degenerate normal is an error.
  pub fn from_three_points(p1: Point, p2: Point, p3: Point) -> Result<Plane> {
    let v2 = p1 - p2;
    let v3 = p1 - p3;
    if is_dependent(v2, v3) {
      return Err(Error::DegenerateGeometry(format!(
        "three collinear points cannot define a plane: {p1:?} {p2:?} {p3:?}"
      )));
    }
    let mut normal = v2.cross(v3).normalize();
    let mut dist = p1.dot(normal);
    if dist.abs() < EPS {
      if normal.z.abs() < EPS {
        if normal.y.abs() < EPS {
          if normal.x.abs() < EPS {
            return Err(Error::DegenerateGeometry(
              "plane normal cannot be determined (= 0 0 0)".into(),
            ));
          } else if normal.x < 0.0 {
            normal = -normal;
          }
        } else if normal.y < 0.0 {
          normal = -normal;
        }
      } else if normal.z < 0.0 {
        normal = -normal;
      }
    } else if dist < 0.0 {
      normal = -normal;
    }
    dist = p1.dot(normal);
    Ok(Plane {
      normal,
      distance: dist,
    })
  }

  pub fn normal(&self) -> Vector {
    self.normal
  }

  pub fn distance(&self) -> f64 {
    self.distance
  }

  /// Flip orientation in place.
  pub fn reversed(&self) -> Plane {
    Plane {
      normal: -self.normal,
      distance: -self.distance,
    }
  }

  /// Signed distance of `pt` from the plane (positive on the forward
  /// side).
  pub fn distance_to_point(&self, pt: Point) -> f64 {
    pt.dot(self.normal) - self.distance
  }

  pub fn is_forward(&self, pt: Point) -> bool {
    self.distance_to_point(pt) >= 0.0
  }

  /// Ray/plane intersection in the forward ray direction.
  pub fn intersection(&self, point: Point, direction: Vector) -> Option<Point> {
    let denom = self.normal.dot(direction);
    if denom.abs() < EPS {
      return None;
    }
    let delta = (self.distance - self.normal.dot(point)) / denom;
    if delta >= 0.0 {
      Some(point + delta * direction)
    } else {
      None
    }
  }

  /// Orthogonal projection of `pt` onto the plane.
  pub fn projection(&self, pt: Point) -> Point {
    pt - self.distance_to_point(pt) * self.normal
  }

  /// The TR rotates the normal and shifts the distance by the
  /// translation's projection onto the rotated normal.
  pub fn transform(&mut self, matrix: &Affine) {
    if matrix.is_identity() {
      return;
    }
    self.normal = self.normal * matrix.rotation();
    self.distance += matrix.translation().dot(self.normal);
  }

  pub fn is_same(&self, other: &Plane) -> bool {
    (self.distance - other.distance).abs() < EPS && is_same_point(self.normal, other.normal)
  }

  /// Common point of three planes, or `None` when any pair is
  /// parallel.
  pub fn intersection_of(p1: &Plane, p2: &Plane, p3: &Plane) -> Option<Point> {
    let mat = Mat3::from_rows(p1.normal, p2.normal, p3.normal).transposed();
    if !mat.is_regular() {
      return None;
    }
    let rhs = DVec3::new(p1.distance, p2.distance, p3.distance);
    Some(rhs * mat.inverse())
  }

  /// Half-space box: axis-parallel planes clip one axis, anything else
  /// is the universal box.
  pub fn generate_bbox(&self) -> BoundingBox {
    const L: f64 = MAX_EXTENT;
    let anchor = self.distance * self.normal;
    if is_dependent(self.normal, DVec3::X) {
      if self.normal.x > 0.0 {
        BoundingBox::new(anchor.x, L, -L, L, -L, L)
      } else {
        BoundingBox::new(-L, anchor.x, -L, L, -L, L)
      }
    } else if is_dependent(self.normal, DVec3::Y) {
      if self.normal.y > 0.0 {
        BoundingBox::new(-L, L, anchor.y, L, -L, L)
      } else {
        BoundingBox::new(-L, L, -L, anchor.y, -L, L)
      }
    } else if is_dependent(self.normal, DVec3::Z) {
      if self.normal.z > 0.0 {
        BoundingBox::new(-L, L, -L, L, anchor.z, L)
      } else {
        BoundingBox::new(-L, L, -L, L, -L, anchor.z)
      }
    } else {
      BoundingBox::universal()
    }
  }
}

#[cfg(test)]
#[path = "plane_test.rs"]
mod plane_test;
