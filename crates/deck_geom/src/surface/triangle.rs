//! Triangle facets (`tri` cards, tetrahedral-mesh import).
//!
//! Vertices are shared between neighboring facets through `Arc`s; two
//! facets are neighbors exactly when they share two vertices.

use std::sync::Arc;

use smallvec::smallvec;

use crate::bbox::BoundingBox;
use crate::constants::EPS;
use crate::error::{Error, Result};
use crate::math::{Affine, Point, Vector};
use crate::surface::plane::Plane;
use crate::surface::PlaneSets;

/// Orientation convention for the facet normal as seen from the
/// outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winding {
  Clockwise,
  CounterClockwise,
}

/// Triangle facet with a unit normal. The forward side is the normal
/// side of the supporting plane.
#[derive(Clone, Debug)]
pub struct Triangle {
  pub vertices: [Arc<Point>; 3],
  pub normal: Vector,
}

impl Triangle {
  pub fn new(vertices: [Arc<Point>; 3], winding: Winding) -> Result<Triangle> {
    let v1 = *vertices[1] - *vertices[0];
    let v2 = *vertices[2] - *vertices[1];
    let cross = v1.cross(v2);
    if cross.length() < EPS {
      return Err(Error::DegenerateGeometry(
        "triangle vertices are collinear".into(),
      ));
    }
    let normal = match winding {
      Winding::Clockwise => cross.normalize(),
      Winding::CounterClockwise => -cross.normalize(),
    };
    Ok(Triangle { vertices, normal })
  }

  pub fn from_points(p1: Point, p2: Point, p3: Point) -> Result<Triangle> {
    Triangle::new(
      [Arc::new(p1), Arc::new(p2), Arc::new(p3)],
      Winding::Clockwise,
    )
  }

  fn plane(&self) -> Plane {
    Plane::through(self.normal, *self.vertices[0]).unwrap()
  }

  pub fn implicit(&self, p: Point) -> f64 {
    self.plane().distance_to_point(p)
  }

  /// Facets sharing exactly two vertices are neighbors.
  pub fn is_neighbor(&self, other: &Triangle) -> bool {
    let mut shared = 0;
    for a in &self.vertices {
      for b in &other.vertices {
        if Arc::ptr_eq(a, b) {
          shared += 1;
        }
      }
    }
    shared == 2
  }

  /// Ray hit on the facet itself (plane hit + inside test).
  pub fn intersection(&self, point: Point, direction: Vector) -> Option<Point> {
    let hit = self.plane().intersection(point, direction)?;
    // Edge-side test with the facet normal as reference.
    let pts = [*self.vertices[0], *self.vertices[1], *self.vertices[2]];
    for i in 0..3 {
      let edge = pts[(i + 1) % 3] - pts[i];
      let to_hit = hit - pts[i];
      if edge.cross(to_hit).dot(self.normal) < -EPS {
        return None;
      }
    }
    Some(hit)
  }

  pub fn transform(&mut self, matrix: &Affine) {
    for v in &mut self.vertices {
      *v = Arc::new(matrix.apply_point(**v));
    }
    self.normal = matrix.apply_vector(self.normal).normalize();
  }

  /// Both sides bound by the supporting plane.
  pub fn bounding_planes(&self, reversed: bool) -> PlaneSets {
    let plane = if reversed { self.plane().reversed() } else { self.plane() };
    vec![smallvec![plane]]
  }

  pub fn generate_bbox(&self, _reversed: bool) -> BoundingBox {
    let pts = [*self.vertices[0], *self.vertices[1], *self.vertices[2]];
    BoundingBox::from_points(&pts)
  }

  pub fn to_input_string(&self, name: &str) -> String {
    let (p1, p2, p3) = (*self.vertices[0], *self.vertices[1], *self.vertices[2]);
    format!(
      "{} tri {} {} {} {} {} {} {} {} {}",
      name, p1.x, p1.y, p1.z, p2.x, p2.y, p2.z, p3.x, p3.y, p3.z
    )
  }
}
