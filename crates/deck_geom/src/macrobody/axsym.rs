//! Axis-symmetric point-defined surfaces (`X`, `Y`, `Z` mnemonics).
//!
//! Two, four or six parameters give one, two or three `(coordinate,
//! radius)` samples on an axis-symmetric surface. One sample (or
//! coincident coordinates) is a plane; two samples make a cylinder or
//! cone; three samples define an axis-aligned hyperboloid expressed as
//! an SQ. Always a single surface under the card's own name, so cell
//! equations never change.

use glam::DVec3;

use crate::constants::EPS;
use crate::error::{Error, Result};
use crate::input::surface_card::SurfaceCard;
use crate::math::{Affine, Axis};
use crate::surface::{Cone, Cylinder, Plane, Quadric, Surface, SurfaceBody};

fn axis_from_symbol(symbol: &str) -> Result<Axis> {
  match symbol {
    "x" => Ok(Axis::X),
    "y" => Ok(Axis::Y),
    "z" => Ok(Axis::Z),
    other => Err(Error::UnknownSymbol(other.to_string())),
  }
}

pub fn expand(card: &SurfaceCard) -> Result<Vec<Surface>> {
  let axis = axis_from_symbol(&card.symbol)?;
  let axis_dir = axis.unit();
  let p = &card.params;
  if !matches!(p.len(), 2 | 4 | 6) {
    return Err(Error::DegenerateGeometry(format!(
      "{} accepts 2, 4 or 6 parameters, got {}",
      card.symbol.to_uppercase(),
      p.len()
    )));
  }

  let same = |a: f64, b: f64| (a - b).abs() < EPS;
  let is_plane = p.len() == 2
    || (p.len() == 4 && same(p[0], p[2]))
    || (p.len() == 6 && same(p[0], p[2]) && same(p[0], p[4]));

  let body = if is_plane {
    SurfaceBody::Plane(Plane::new(axis_dir, p[0])?)
  } else if p.len() == 4 {
    let (x1, r1, x2, r2) = (p[0], p[1], p[2], p[3]);
    if same(r1, r2) {
      SurfaceBody::Cylinder(Cylinder::new(DVec3::ZERO, axis_dir, r1)?)
    } else {
      let grad = (r1 - r2) / (x1 - x2);
      let dir = if grad > 0.0 { axis_dir } else { -axis_dir };
      let vertex = axis_dir * ((-x1 * r2 + x2 * r1) / (r1 - r2));
      SurfaceBody::Cone(Cone::new(vertex, dir, grad * grad, 0)?)
    }
  } else {
    let (x1, r1, x2, r2, x3, r3) = (p[0], p[1], p[2], p[3], p[4], p[5]);
    // Coincident coordinates here mean the samples straddle sheets.
    if same(x1, x2) || same(x2, x3) {
      return Err(Error::DegenerateGeometry(format!(
        "points ({x1}, {r1}) ({x2}, {r2}) ({x3}, {r3}) are not on the same sheet"
      )));
    }
    // Fit r^2 = c2 s^2 + c1 s + c0 through the three samples, then
    // express it as an SQ around the axis.
    let denom = 1.0 / ((x1 - x2) * (x2 - x3) * (x3 - x1));
    let c2 = (-r1 * r1 * (x2 - x3) - r2 * r2 * (x3 - x1) - r3 * r3 * (x1 - x2)) * denom;
    let c1 = (r1 * r1 * (x2 + x3) * (x2 - x3)
      + r2 * r2 * (x3 + x1) * (x3 - x1)
      + r3 * r3 * (x1 + x2) * (x1 - x2))
      * denom;
    let c0 = (-r1 * r1 * x2 * x3 * (x2 - x3)
      - r2 * r2 * x1 * x3 * (x3 - x1)
      - r3 * r3 * x1 * x2 * (x1 - x2))
      * denom;
    let quad2 = DVec3::ONE - (1.0 + c2) * axis_dir;
    let quad1 = -0.5 * c1 * axis_dir;
    let sq_params = [
      quad2.x, quad2.y, quad2.z, quad1.x, quad1.y, quad1.z, -c0, 0.0, 0.0, 0.0,
    ];
    let (quad, matrix) = Quadric::from_sq(&sq_params, &Affine::IDENTITY)?;
    let mut q = quad;
    q.transform(&matrix);
    SurfaceBody::Quadric(q)
  };

  Ok(vec![Surface::new(card.name.clone(), body)?])
}
