//! TOR: partial torus.
//!
//! The body is a torus segment between a start and an end angle. Two
//! angular planes alone would make the cell non-convex once the
//! subtended angle passes 180 degrees, so a third plane at the middle
//! angle always splits the segment into two convex pieces; the cell
//! substitution is the union of those pieces (and its De Morgan dual
//! for the outward orientation).

use glam::DVec3;

use crate::error::{Error, Result};
use crate::input::surface_card::SurfaceCard;
use crate::math::{rotation_about, Affine, Point};
use crate::surface::{Plane, Surface, SurfaceBody, Torus};

/// `.1` torus, `.2` start-angle plane, `.3` end-angle plane, `.4`
/// middle plane.
pub fn expand_tor(card: &SurfaceCard) -> Result<Vec<Surface>> {
  if card.params.len() != 9 {
    return Err(Error::DegenerateGeometry(format!(
      "TOR accepts 9 parameters, got {}",
      card.params.len()
    )));
  }
  let p = &card.params;
  let center: Point = DVec3::new(p[0], p[1], p[2]);
  let major_r = p[3];
  let minor_h = p[4];
  let minor_v = p[5];
  let dir_flag = p[6] as i32;
  let theta1 = p[7];
  let theta2 = p[8];

  let (axis, plane_normal) = match dir_flag {
    1 => (DVec3::X, DVec3::Z),
    2 => (DVec3::Y, DVec3::X),
    3 => (DVec3::Z, DVec3::Y),
    other => {
      return Err(Error::DegenerateGeometry(format!(
        "invalid torus direction flag {other}, only 1, 2, 3 are acceptable"
      )))
    }
  };

  let n = &card.name;
  let torus = Surface::new(
    format!("{n}.1"),
    SurfaceBody::Torus(Torus::new(center, axis, major_r, minor_v, minor_h)?),
  )?;

  let mut surfaces = vec![torus];
  let angles = [theta1, theta2, 0.5 * (theta1 + theta2)];
  for (i, theta) in angles.iter().enumerate() {
    let mut plane = Surface::new(
      format!("{n}.{}", i + 2),
      SurfaceBody::Plane(Plane::through(plane_normal, DVec3::ZERO)?),
    )?;
    let mut matrix = Affine::from_parts(rotation_about(axis, theta.to_radians()), DVec3::ZERO);
    matrix.set_translation(center);
    plane.transform(&matrix);
    surfaces.push(plane);
  }
  Ok(surfaces)
}

/// `-B` side: the two convex pieces, OR-joined.
pub fn negative_substitution(name: &str) -> String {
  format!(
    "((-{n}.1 {n}.2 -{n}.4):(-{n}.1 {n}.4 -{n}.3))",
    n = name
  )
}

/// `+B` side: the De Morgan dual of the two pieces.
pub fn positive_substitution(name: &str) -> String {
  format!(
    "(({n}.1:-{n}.2:{n}.4) ({n}.1:-{n}.4:{n}.3))",
    n = name
  )
}
