//! Circular cones about an arbitrary axis (`k/x k/y k/z kx ky kz`, the
//! general `ka` form, and the TRC macrobody side).

use glam::DVec3;
use smallvec::{smallvec, SmallVec};

use crate::bbox::BoundingBox;
use crate::constants::EPS;
use crate::error::{Error, Result};
use crate::math::{normalized, rotation_onto, Affine, Point, Vector};
use crate::surface::plane::Plane;
use crate::surface::PlaneSets;

/// Cone `rho^2 - t^2 h^2 = 0` around `axis` with apex at `vertex`,
/// where `h` is the axial coordinate from the apex and `t2` the squared
/// slope (`tan^2` of the half angle). `sheet` selects one nappe:
/// `+1` the half-space `h > 0`, `-1` the half-space `h < 0`, `0` both.
/// The forward side is outside the cone.
#[derive(Clone, Copy, Debug)]
pub struct Cone {
  pub vertex: Point,
  pub axis: Vector,
  pub t2: f64,
  pub sheet: i8,
}

impl Cone {
  pub fn new(vertex: Point, axis: Vector, t2: f64, sheet: i8) -> Result<Cone> {
    if t2 <= 0.0 {
      return Err(Error::DegenerateGeometry(format!(
        "cone slope squared must be positive, got {t2}"
      )));
    }
    Ok(Cone {
      vertex,
      axis: normalized(axis)?,
      t2,
      sheet,
    })
  }

  pub fn implicit(&self, p: Point) -> f64 {
    let rel = p - self.vertex;
    let h = rel.dot(self.axis);
    let rho2 = rel.length_squared() - h * h;
    if self.sheet != 0 && h * f64::from(self.sheet) < 0.0 {
      // The unselected nappe counts as outside everywhere.
      return rho2 + self.t2 * h * h;
    }
    rho2 - self.t2 * h * h
  }

  pub fn intersection(&self, point: Point, direction: Vector) -> Option<Point> {
    let rel = point - self.vertex;
    let hd = direction.dot(self.axis);
    let hp = rel.dot(self.axis);
    // rho(t)^2 - t2 h(t)^2 = 0 expands to a quadratic in the ray
    // parameter.
    let c2 = direction.length_squared() - (1.0 + self.t2) * hd * hd;
    let c1 = 2.0 * (rel.dot(direction) - (1.0 + self.t2) * hp * hd);
    let c0 = rel.length_squared() - (1.0 + self.t2) * hp * hp;
    let mut candidates: SmallVec<[f64; 2]> = smallvec![];
    if c2.abs() < EPS {
      if c1.abs() > EPS {
        candidates.push(-c0 / c1);
      }
    } else {
      let disc = c1 * c1 - 4.0 * c2 * c0;
      if disc <= 0.0 {
        return None;
      }
      let sq = disc.sqrt();
      candidates.push(0.5 * (-c1 - sq) / c2);
      candidates.push(0.5 * (-c1 + sq) / c2);
      candidates.sort_by(|a, b| a.partial_cmp(b).unwrap());
    }
    for t in candidates {
      if t <= 0.0 {
        continue;
      }
      let hit = point + t * direction;
      if self.sheet != 0 {
        let h = (hit - self.vertex).dot(self.axis);
        if h * f64::from(self.sheet) < 0.0 {
          continue;
        }
      }
      return Some(hit);
    }
    None
  }

  pub fn transform(&mut self, matrix: &Affine) {
    self.vertex = matrix.apply_point(self.vertex);
    self.axis = matrix.apply_vector(self.axis).normalize();
  }

  /// Inside: per selected nappe, the apex plane plus four asymptote
  /// planes (built in the canonical frame, rotated out). Outside: the
  /// whole-space sentinel.
  pub fn bounding_planes(&self, reversed: bool) -> PlaneSets {
    if !reversed {
      return crate::surface::whole_space();
    }
    let t = self.t2.sqrt();
    let frame = rotation_onto(self.axis, DVec3::Z);
    let world = |n: DVec3| (n * frame).normalize();
    let nappe = |dir: f64| -> SmallVec<[Plane; 6]> {
      // Asymptote normals in the canonical frame: (+-1, 0, dir*t) and
      // (0, +-1, dir*t), leaning over the cone opening.
      smallvec![
        Plane::through(world(DVec3::new(0.0, 0.0, dir)), self.vertex).unwrap(),
        Plane::through(world(DVec3::new(-1.0, 0.0, dir * t)), self.vertex).unwrap(),
        Plane::through(world(DVec3::new(1.0, 0.0, dir * t)), self.vertex).unwrap(),
        Plane::through(world(DVec3::new(0.0, -1.0, dir * t)), self.vertex).unwrap(),
        Plane::through(world(DVec3::new(0.0, 1.0, dir * t)), self.vertex).unwrap(),
      ]
    };
    match self.sheet {
      1 => vec![nappe(1.0)],
      -1 => vec![nappe(-1.0)],
      _ => vec![nappe(1.0), nappe(-1.0)],
    }
  }

  pub fn generate_bbox(&self, _reversed: bool) -> BoundingBox {
    // A cone is unbounded along its axis in at least one direction.
    BoundingBox::universal()
  }

  pub fn to_input_string(&self, name: &str) -> String {
    let v = self.vertex;
    let sheet_str = |s: i8| {
      if s == 0 {
        String::new()
      } else {
        format!(" {s}")
      }
    };
    // An axis anti-parallel to a principal direction folds into the
    // standard spelling with the nappe selector flipped.
    for (unit, mn) in [(DVec3::X, "x"), (DVec3::Y, "y"), (DVec3::Z, "z")] {
      if self.axis.cross(unit).length() < EPS {
        let sheet = if self.axis.dot(unit) > 0.0 { self.sheet } else { -self.sheet };
        return format!(
          "{} k/{} {} {} {} {}{}",
          name,
          mn,
          v.x,
          v.y,
          v.z,
          self.t2,
          sheet_str(sheet)
        );
      }
    }
    format!(
      "{} ka {} {} {} {} {} {} {}{}",
      name,
      v.x,
      v.y,
      v.z,
      self.axis.x,
      self.axis.y,
      self.axis.z,
      self.t2,
      sheet_str(self.sheet)
    )
  }
}
