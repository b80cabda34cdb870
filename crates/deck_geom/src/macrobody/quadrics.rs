//! Quadric-family macrobodies: SPH, RCC, REC, ELL, TRC, QUA.

use glam::DVec3;

use crate::error::{Error, Result};
use crate::input::surface_card::SurfaceCard;
use crate::math::{is_orthogonal, normalized, Affine, Mat3};
use crate::surface::{Cone, Cylinder, Plane, Quadric, Sphere, Surface, SurfaceBody};

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

/// SPH: one sphere under the macrobody's own name. The one-argument
/// form (radius only, centered at the origin) is accepted with a
/// warning.
pub fn expand_sph(card: &SurfaceCard, pos: &str) -> Result<Vec<Surface>> {
  check_params(card, &[1, 4])?;
  let (center, radius) = if card.params.len() == 4 {
    (
      DVec3::new(card.params[0], card.params[1], card.params[2]),
      card.params[3],
    )
  } else {
    tracing::warn!(%pos, "single-parameter SPH is not MCNP compatible");
    (DVec3::ZERO, card.params[0])
  };
  Ok(vec![Surface::new(
    card.name.clone(),
    SurfaceBody::Sphere(Sphere::new(center, radius)?),
  )?])
}

/// RCC: cylinder shell plus top and bottom planes.
pub fn expand_rcc(card: &SurfaceCard) -> Result<Vec<Surface>> {
  check_params(card, &[7])?;
  let p = &card.params;
  let base = DVec3::new(p[0], p[1], p[2]);
  let axis = DVec3::new(p[3], p[4], p[5]);
  let radius = p[6];
  let h_unit = normalized(axis)?;
  let n = &card.name;
  Ok(vec![
    Surface::new(
      format!("{n}.1"),
      SurfaceBody::Cylinder(Cylinder::new(base, h_unit, radius)?),
    )?,
    Surface::new(
      format!("{n}.2"),
      SurfaceBody::Plane(Plane::new(h_unit, base.dot(h_unit) + axis.length())?),
    )?,
    Surface::new(
      format!("{n}.3"),
      SurfaceBody::Plane(Plane::new(-h_unit, -base.dot(h_unit))?),
    )?,
  ])
}

/// REC: elliptic cylinder (as a GQ) plus the two cap planes. Axis,
/// major and minor vectors must be mutually orthogonal.
pub fn expand_rec(card: &SurfaceCard, pos: &str) -> Result<Vec<Surface>> {
  check_params(card, &[10, 12])?;
  let p = &card.params;
  let base = DVec3::new(p[0], p[1], p[2]);
  let axis = DVec3::new(p[3], p[4], p[5]);
  let major = DVec3::new(p[6], p[7], p[8]);
  if !is_orthogonal(axis, major) {
    return Err(Error::DegenerateGeometry(format!(
      "{pos} REC axis and major radius vector must be orthogonal"
    )));
  }
  let minor = if card.params.len() == 10 {
    p[9] * normalized(axis.cross(major))?
  } else {
    DVec3::new(p[9], p[10], p[11])
  };
  if !is_orthogonal(axis, minor) {
    return Err(Error::DegenerateGeometry(format!(
      "{pos} REC axis and minor radius vector must be orthogonal"
    )));
  }
  if !is_orthogonal(major, minor) {
    return Err(Error::DegenerateGeometry(format!(
      "{pos} REC major and minor radius vectors must be orthogonal"
    )));
  }

  let a = major.length();
  let b = minor.length();
  // Formulated along z with the major axis on x:
  // b^2 x^2 + a^2 y^2 - a^2 b^2 = 0.
  let mut quad = Quadric::new([b * b, a * a, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -a * a * b * b]);
  let rot = Mat3::from_rows(normalized(major)?, normalized(minor)?, normalized(axis)?);
  quad.transform(&Affine::from_parts(rot, base));

  let h_unit = normalized(axis)?;
  let n = &card.name;
  Ok(vec![
    Surface::new(format!("{n}.1"), SurfaceBody::Quadric(quad))?,
    Surface::new(
      format!("{n}.2"),
      SurfaceBody::Plane(Plane::new(h_unit, base.dot(h_unit) + axis.length())?),
    )?,
    Surface::new(
      format!("{n}.3"),
      SurfaceBody::Plane(Plane::new(-h_unit, -base.dot(h_unit))?),
    )?,
  ])
}

/// ELL: spheroid as a GQ under the macrobody's own name.
///
/// A positive seventh parameter is the semi-major-axis radius and the
/// leading triples are the foci (matching the MCNP implementation, not
/// its manual); a negative one is the minor radius, with center and
/// axis vector given instead.
pub fn expand_ell(card: &SurfaceCard) -> Result<Vec<Surface>> {
  check_params(card, &[7])?;
  let p = &card.params;
  if p[6].abs() < crate::constants::EPS {
    return Err(Error::DegenerateGeometry("ELL seventh parameter must not be 0".into()));
  }

  let (focus1, focus2, a, b);
  if p[6] > 0.0 {
    a = p[6];
    let raw1 = DVec3::new(p[0], p[1], p[2]);
    let raw2 = DVec3::new(p[3], p[4], p[5]);
    let fvec = 0.5 * (raw2 - raw1);
    let center = raw1 + fvec;
    let stretch = a / fvec.length() - 1.0;
    focus1 = center + fvec * stretch;
    focus2 = center - fvec * stretch;
    let sep2 = (focus1 - focus2).length_squared();
    if a * a <= 0.25 * sep2 {
      return Err(Error::DegenerateGeometry(
        "ELL major radius must exceed the focus separation".into(),
      ));
    }
    b = (a * a - 0.25 * sep2).sqrt();
  } else {
    b = -p[6];
    let center = DVec3::new(p[0], p[1], p[2]);
    let avec = DVec3::new(p[3], p[4], p[5]);
    a = avec.length();
    let au = normalized(avec)?;
    let offset = if b > a { (b * b - a * a).sqrt() } else { (a * a - b * b).sqrt() };
    focus1 = center - offset * au;
    focus2 = center + offset * au;
  }

  let center = 0.5 * (focus1 + focus2);
  let ax_unit = normalized(focus2 - focus1)?;
  let (u, v) = crate::math::get_two_orthogonal_units(ax_unit)?;

  // Canonical frame: major axis on x, b^2 x^2 + a^2 (y^2+z^2) = a^2 b^2.
  let mut quad = Quadric::new([
    b * b,
    a * a,
    a * a,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    -b * b * a * a,
  ]);
  let rot = Mat3::from_rows(ax_unit, u, v);
  quad.transform(&Affine::from_parts(rot, center));

  Ok(vec![Surface::new(card.name.clone(), SurfaceBody::Quadric(quad))?])
}

/// TRC: truncated cone: shell plus top and bottom planes. The shell is
/// a one-nappe cone whose apex lies beyond the smaller cap.
pub fn expand_trc(card: &SurfaceCard) -> Result<Vec<Surface>> {
  check_params(card, &[8])?;
  let p = &card.params;
  let base = DVec3::new(p[0], p[1], p[2]);
  let axis = DVec3::new(p[3], p[4], p[5]);
  let r1 = p[6];
  let r2 = p[7];
  let height = axis.length();
  let h_unit = normalized(axis)?;
  if (r1 - r2).abs() < crate::constants::EPS {
    return Err(Error::DegenerateGeometry(
      "TRC radii must differ (use RCC for a cylinder)".into(),
    ));
  }
  if r1 <= 0.0 || r2 < 0.0 {
    return Err(Error::DegenerateGeometry("TRC radii must be non-negative".into()));
  }

  let apex_s = r1 * height / (r1 - r2);
  let vertex = base + h_unit * apex_s;
  let slope = (r1 - r2) / height;
  let sheet = if r1 > r2 { -1 } else { 1 };
  let n = &card.name;
  Ok(vec![
    Surface::new(
      format!("{n}.1"),
      SurfaceBody::Cone(Cone::new(vertex, h_unit, slope * slope, sheet)?),
    )?,
    Surface::new(
      format!("{n}.2"),
      SurfaceBody::Plane(Plane::new(h_unit, base.dot(h_unit) + height)?),
    )?,
    Surface::new(
      format!("{n}.3"),
      SurfaceBody::Plane(Plane::new(-h_unit, -base.dot(h_unit))?),
    )?,
  ])
}

/// QUA: general quadric plus two z cap planes with inward normals.
pub fn expand_qua(card: &SurfaceCard) -> Result<Vec<Surface>> {
  check_params(card, &[10])?;
  let p = &card.params;
  let (a, b, c, d, e, f, g, h) = (p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7]);
  let (z1, z2) = (p[8], p[9]);
  let coeffs = [
    a * a,
    d * d,
    b * b + e * e - g * g,
    0.0,
    2.0 * d * e,
    2.0 * a * b,
    2.0 * a * c,
    2.0 * d * f,
    2.0 * (b * c + e * f - g * h),
    c * c + f * f - h * h,
  ];
  let n = &card.name;
  Ok(vec![
    Surface::new(format!("{n}.1"), SurfaceBody::Quadric(Quadric::new(coeffs)))?,
    Surface::new(
      format!("{n}.2"),
      SurfaceBody::Plane(Plane::through(-DVec3::Z, DVec3::new(0.0, 0.0, z1))?),
    )?,
    Surface::new(
      format!("{n}.3"),
      SurfaceBody::Plane(Plane::through(DVec3::Z, DVec3::new(0.0, 0.0, z2))?),
    )?,
  ])
}
