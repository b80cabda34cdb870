//! Plane-only macrobodies: RPP, BOX, WED, RHP/HEX, ARB.

use glam::DVec3;

use crate::constants::MAX_EXTENT;
use crate::error::{Error, Result};
use crate::input::surface_card::SurfaceCard;
use crate::math::{is_orthogonal, Point};
use crate::surface::{Plane, Surface, SurfaceBody};

fn check_params(card: &SurfaceCard, accepted: &[usize]) -> Result<()> {
  if accepted.contains(&card.params.len()) {
    return Ok(());
  }
  Err(Error::DegenerateGeometry(format!(
    "{} accepts {:?} parameters, got {}",
    card.symbol.to_uppercase(),
    accepted,
    card.params.len()
  )))
}

fn plane_surface(name: String, plane: Plane) -> Result<Surface> {
  Surface::new(name, SurfaceBody::Plane(plane))
}

/// RPP: six axis planes with outward normals.
pub fn expand_rpp(card: &SurfaceCard, pos: &str) -> Result<Vec<Surface>> {
  check_params(card, &[6])?;
  let p = &card.params;
  let (xmin, xmax, ymin, ymax, zmin, zmax) = (p[0], p[1], p[2], p[3], p[4], p[5]);
  if xmax < xmin {
    tracing::warn!(%pos, "RPP xmin is larger than xmax");
  }
  if ymax < ymin {
    tracing::warn!(%pos, "RPP ymin is larger than ymax");
  }
  if zmax < zmin {
    tracing::warn!(%pos, "RPP zmin is larger than zmax");
  }
  let n = &card.name;
  Ok(vec![
    plane_surface(format!("{n}.1"), Plane::new(DVec3::X, xmax)?)?,
    plane_surface(format!("{n}.2"), Plane::new(-DVec3::X, -xmin)?)?,
    plane_surface(format!("{n}.3"), Plane::new(DVec3::Y, ymax)?)?,
    plane_surface(format!("{n}.4"), Plane::new(-DVec3::Y, -ymin)?)?,
    plane_surface(format!("{n}.5"), Plane::new(DVec3::Z, zmax)?)?,
    plane_surface(format!("{n}.6"), Plane::new(-DVec3::Z, -zmin)?)?,
  ])
}

/// BOX: corner plus two or three edge vectors. The nine-parameter form
/// leaves the third direction unbounded.
pub fn expand_box(card: &SurfaceCard, pos: &str) -> Result<Vec<Surface>> {
  check_params(card, &[9, 12])?;
  let p = &card.params;
  let v0 = DVec3::new(p[0], p[1], p[2]);
  let a1 = DVec3::new(p[3], p[4], p[5]);
  let a2 = DVec3::new(p[6], p[7], p[8]);
  if !is_orthogonal(a1, a2) {
    tracing::warn!(%pos, "BOX first and second vectors are not orthogonal");
  }
  let n = &card.name;
  let u1 = crate::math::normalized(a1)?;
  let u2 = crate::math::normalized(a2)?;
  let mut surfaces = vec![
    plane_surface(format!("{n}.1"), Plane::new(u1, v0.dot(u1) + a1.length())?)?,
    plane_surface(format!("{n}.2"), Plane::new(-u1, -v0.dot(u1))?)?,
    plane_surface(format!("{n}.3"), Plane::new(u2, v0.dot(u2) + a2.length())?)?,
    plane_surface(format!("{n}.4"), Plane::new(-u2, -v0.dot(u2))?)?,
  ];
  if card.params.len() == 12 {
    let a3 = DVec3::new(p[9], p[10], p[11]);
    if !is_orthogonal(a2, a3) {
      tracing::warn!(%pos, "BOX second and third vectors are not orthogonal");
    }
    if !is_orthogonal(a3, a1) {
      tracing::warn!(%pos, "BOX third and first vectors are not orthogonal");
    }
    let u3 = crate::math::normalized(a3)?;
    surfaces.push(plane_surface(format!("{n}.5"), Plane::new(u3, v0.dot(u3) + a3.length())?)?);
    surfaces.push(plane_surface(format!("{n}.6"), Plane::new(-u3, -v0.dot(u3))?)?);
  } else {
    // Nine arguments: both remaining faces recede to infinity.
    let u3 = crate::math::normalized(a1.cross(a2))?;
    surfaces.push(plane_surface(format!("{n}.5"), Plane::new(u3, MAX_EXTENT)?)?);
    surfaces.push(plane_surface(format!("{n}.6"), Plane::new(-u3, MAX_EXTENT)?)?);
  }
  Ok(surfaces)
}

/// WED: wedge from a vertex, two base edge vectors and the height
/// vector. Faces: hypotenuse, the two base sides, top, bottom.
pub fn expand_wed(card: &SurfaceCard) -> Result<Vec<Surface>> {
  check_params(card, &[12])?;
  let p = &card.params;
  let vertex = DVec3::new(p[0], p[1], p[2]);
  let v1 = DVec3::new(p[3], p[4], p[5]);
  let v2 = DVec3::new(p[6], p[7], p[8]);
  let vh = DVec3::new(p[9], p[10], p[11]);
  let u1 = crate::math::normalized(v1)?;
  let u2 = crate::math::normalized(v2)?;
  let uh = crate::math::normalized(vh)?;
  // Hypotenuse normal: leans between the two edges.
  let hypo = crate::math::normalized(v1.length() * u2 + v2.length() * u1)?;
  let n = &card.name;
  Ok(vec![
    plane_surface(format!("{n}.1"), Plane::new(hypo, (vertex + v1).dot(hypo))?)?,
    plane_surface(format!("{n}.2"), Plane::new(-u1, vertex.dot(-u1))?)?,
    plane_surface(format!("{n}.3"), Plane::new(-u2, vertex.dot(-u2))?)?,
    plane_surface(format!("{n}.4"), Plane::new(uh, (vertex + vh).dot(uh))?)?,
    plane_surface(format!("{n}.5"), Plane::new(-uh, vertex.dot(-uh))?)?,
  ])
}

/// RHP/HEX: hexagonal prism. Nine arguments derive the two missing
/// in-plane vectors from 60/120 degree rotations of the first.
pub fn expand_rhp(card: &SurfaceCard, pos: &str) -> Result<Vec<Surface>> {
  check_params(card, &[9, 15])?;
  let p = &card.params;
  let base = DVec3::new(p[0], p[1], p[2]);
  let top_vec = DVec3::new(p[3], p[4], p[5]);
  let r_vec = DVec3::new(p[6], p[7], p[8]);
  let h_unit = crate::math::normalized(top_vec)?;
  let r_unit = crate::math::normalized(r_vec)?;

  let (s_vec, t_vec) = if card.params.len() == 9 {
    let sin60 = 3.0_f64.sqrt();
    let ortho = h_unit.cross(r_unit);
    (
      r_vec.length() * 0.5 * (r_unit + sin60 * ortho),
      r_vec.length() * 0.5 * (-r_unit + sin60 * ortho),
    )
  } else {
    (
      DVec3::new(p[9], p[10], p[11]),
      DVec3::new(p[12], p[13], p[14]),
    )
  };
  let s_unit = crate::math::normalized(s_vec)?;
  let t_unit = crate::math::normalized(t_vec)?;

  for side in [r_unit, s_unit, t_unit] {
    if !is_orthogonal(side, top_vec) {
      tracing::warn!(%pos, "RHP/HEX side faces should be orthogonal to the prism axis");
      break;
    }
  }

  let n = &card.name;
  Ok(vec![
    plane_surface(format!("{n}.1"), Plane::new(r_unit, (base + r_vec).dot(r_unit))?)?,
    plane_surface(format!("{n}.2"), Plane::new(-r_unit, (base - r_vec).dot(-r_unit))?)?,
    plane_surface(format!("{n}.3"), Plane::new(s_unit, (base + s_vec).dot(s_unit))?)?,
    plane_surface(format!("{n}.4"), Plane::new(-s_unit, (base - s_vec).dot(-s_unit))?)?,
    plane_surface(format!("{n}.5"), Plane::new(t_unit, (base + t_vec).dot(t_unit))?)?,
    plane_surface(format!("{n}.6"), Plane::new(-t_unit, (base - t_vec).dot(-t_unit))?)?,
    plane_surface(format!("{n}.7"), Plane::new(h_unit, (base + top_vec).dot(h_unit))?)?,
    plane_surface(format!("{n}.8"), Plane::new(-h_unit, base.dot(-h_unit))?)?,
  ])
}

/// ARB: eight vertices plus up to six four-digit face descriptors.
/// Every face normal is reoriented outward from the centroid of the
/// vertices actually used.
pub fn expand_arb(card: &SurfaceCard) -> Result<Vec<Surface>> {
  check_params(card, &[30])?;
  let p = &card.params;

  let mut faces: Vec<[usize; 4]> = Vec::new();
  let mut used: std::collections::BTreeSet<usize> = std::collections::BTreeSet::new();
  for i in 0..6 {
    let digits = p[24 + i].round() as i64;
    if digits == 0 {
      continue;
    }
    let text = digits.to_string();
    if text.len() != 4 {
      return Err(Error::DegenerateGeometry(format!(
        "ARB face descriptor must have four digits, got {text}"
      )));
    }
    let mut face = [0usize; 4];
    for (slot, ch) in text.chars().enumerate() {
      let d = ch.to_digit(10).ok_or_else(|| {
        Error::DegenerateGeometry(format!("ARB face descriptor digit out of range in {text}"))
      })? as usize;
      if d > 8 {
        return Err(Error::DegenerateGeometry(format!(
          "ARB face descriptor digit must be 0-8, got {d}"
        )));
      }
      face[slot] = d;
      if d > 0 {
        used.insert(d);
      }
    }
    faces.push(face);
  }
  if faces.len() < 4 {
    return Err(Error::DegenerateGeometry(format!(
      "ARB needs at least four face descriptors, got {}",
      faces.len()
    )));
  }

  let mut points = [DVec3::ZERO; 8];
  for (i, point) in points.iter_mut().enumerate() {
    *point = DVec3::new(p[3 * i], p[3 * i + 1], p[3 * i + 2]);
  }

  if used.len() < 4 {
    return Err(Error::DegenerateGeometry(format!(
      "ARB face descriptors use fewer than four vertices ({})",
      used.len()
    )));
  }
  let mut center = DVec3::ZERO;
  for &d in &used {
    center += points[d - 1];
  }
  center /= used.len() as f64;

  let mut surfaces = Vec::new();
  let mut last_plane: Option<Plane> = None;
  for (i, face) in faces.iter().enumerate() {
    let pts: Vec<Point> = face
      .iter()
      .filter(|d| **d > 0)
      .map(|d| points[d - 1])
      .collect();
    if pts.len() < 3 {
      return Err(Error::DegenerateGeometry(
        "an ARB face needs at least three non-zero vertex numbers".into(),
      ));
    }
    let tmp = Plane::from_three_points(pts[0], pts[1], pts[2])?;
    // Reorient outward: the body centroid must sit behind the face.
    let plane = if tmp.is_forward(center) { tmp.reversed() } else { tmp };
    if pts.len() == 4 {
      let distance = plane.distance_to_point(pts[3]);
      if distance.abs() > 1e-6 {
        tracing::warn!(
          face = i + 1,
          distance,
          "fourth ARB vertex is off the face plane"
        );
      }
    }
    surfaces.push(plane_surface(format!("{}.{}", card.name, i + 1), plane)?);
    last_plane = Some(plane);
  }

  // The substitution always references six faces; pad with the last
  // one when fewer are declared.
  let last = last_plane.unwrap();
  for i in surfaces.len()..6 {
    surfaces.push(plane_surface(format!("{}.{}", card.name, i + 1), last)?);
  }
  Ok(surfaces)
}
