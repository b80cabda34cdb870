//! Primitive surfaces.
//!
//! A surface is an oriented implicit function `f(x) >= 0`; the
//! reversed instance answers the strict complement. The seven concrete
//! kinds live behind [`Surface`], a tagged sum with a thin dispatch
//! layer for the five shared operations: forward test, ray
//! intersection, affine transform, bounding planes, and deep copy.

pub mod cone;
pub mod cylinder;
pub mod map;
pub mod plane;
pub mod quadric;
pub(crate) mod quadric_bounds;
pub mod sphere;
pub mod torus;
pub mod triangle;

use glam::DVec3;
use smallvec::{smallvec, SmallVec};

use crate::bbox::BoundingBox;
use crate::error::{Error, Result};
use crate::math::{Affine, Axis, Point, Vector};

pub use cone::Cone;
pub use cylinder::Cylinder;
pub use map::SurfaceMap;
pub use plane::Plane;
pub use quadric::Quadric;
pub use sphere::Sphere;
pub use torus::Torus;
pub use triangle::Triangle;

/// Union of conjunctions of half-spaces. Each inner set is an AND of
/// planes; the outer list is an OR over those conjunctions.
pub type PlaneSets = Vec<SmallVec<[Plane; 6]>>;

/// Sentinel set covering all of R^3: two opposite half-spaces joined
/// by OR. Used where a side admits no useful bounding planes.
pub fn whole_space() -> PlaneSets {
  vec![
    smallvec![Plane::new(DVec3::X, 0.0).unwrap()],
    smallvec![Plane::new(-DVec3::X, 0.0).unwrap()],
  ]
}

/// Per-kind state of a surface.
#[derive(Clone, Debug)]
pub enum SurfaceBody {
  Plane(Plane),
  Sphere(Sphere),
  Cylinder(Cylinder),
  Cone(Cone),
  Quadric(Quadric),
  Torus(Torus),
  Triangle(Triangle),
}

/// A registered, oriented surface instance.
#[derive(Clone, Debug)]
pub struct Surface {
  id: i32,
  name: String,
  reversed: bool,
  body: SurfaceBody,
  bounding_planes: PlaneSets,
}

impl Surface {
  /// Wrap a body under a user name. The id stays zero until the map
  /// assigns one.
  pub fn new(name: impl Into<String>, body: SurfaceBody) -> Result<Surface> {
    let name = name.into();
    let bounding_planes = body_bounding_planes(&body, &name, false)?;
    Ok(Surface {
      id: 0,
      name,
      reversed: false,
      body,
      bounding_planes,
    })
  }

  /// Build a surface from an already-parsed card: mnemonic, numeric
  /// parameters and the combined TRSF/TRn matrix.
  pub fn from_card(name: &str, symbol: &str, params: &[f64], matrix: &Affine) -> Result<Surface> {
    let body = body_from_card(symbol, params)?;
    // SQ folds its center into the transform.
    let full_matrix = if symbol.eq_ignore_ascii_case("sq") {
      let (_, m) = Quadric::from_sq(params, matrix)?;
      m
    } else {
      *matrix
    };
    let mut surface = Surface::new(name, body)?;
    surface.transform(&full_matrix);
    Ok(surface)
  }

  pub fn id(&self) -> i32 {
    self.id
  }

  pub(crate) fn set_id(&mut self, id: i32) {
    self.id = id;
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_reversed(&self) -> bool {
    self.reversed
  }

  pub fn body(&self) -> &SurfaceBody {
    &self.body
  }

  pub fn kind(&self) -> &'static str {
    match self.body {
      SurfaceBody::Plane(_) => "PLANE",
      SurfaceBody::Sphere(_) => "SPHERE",
      SurfaceBody::Cylinder(_) => "CYLINDER",
      SurfaceBody::Cone(_) => "CONE",
      SurfaceBody::Quadric(_) => "QUADRIC",
      SurfaceBody::Torus(_) => "TORUS",
      SurfaceBody::Triangle(_) => "TRIANGLE",
    }
  }

  /// Raw implicit value at `p` (orientation of the unreversed side).
  pub fn implicit(&self, p: Point) -> f64 {
    match &self.body {
      SurfaceBody::Plane(pl) => pl.distance_to_point(p),
      SurfaceBody::Sphere(s) => s.implicit(p),
      SurfaceBody::Cylinder(c) => c.implicit(p),
      SurfaceBody::Cone(c) => c.implicit(p),
      SurfaceBody::Quadric(q) => q.implicit(p),
      SurfaceBody::Torus(t) => t.implicit(p),
      SurfaceBody::Triangle(t) => t.implicit(p),
    }
  }

  /// Point-side predicate. A reversed surface answers strictly
  /// (`> 0`) so the forward and reversed sides never both claim a
  /// boundary point.
  pub fn is_forward(&self, p: Point) -> bool {
    // A reversed body already carries its flipped orientation where it
    // has one (planes); the others compare against the stored sign.
    match &self.body {
      SurfaceBody::Plane(pl) => {
        let v = pl.distance_to_point(p);
        if self.reversed {
          v > 0.0
        } else {
          v >= 0.0
        }
      }
      _ => {
        let v = self.implicit(p);
        if self.reversed {
          v < 0.0
        } else {
          v >= 0.0
        }
      }
    }
  }

  /// First ray hit at non-negative parameter, if any.
  pub fn intersection(&self, point: Point, direction: Vector) -> Option<Point> {
    match &self.body {
      SurfaceBody::Plane(pl) => pl.intersection(point, direction),
      SurfaceBody::Sphere(s) => s.intersection(point, direction),
      SurfaceBody::Cylinder(c) => c.intersection(point, direction),
      SurfaceBody::Cone(c) => c.intersection(point, direction),
      SurfaceBody::Quadric(q) => q.intersection(point, direction),
      SurfaceBody::Torus(t) => t.intersection(point, direction),
      SurfaceBody::Triangle(t) => t.intersection(point, direction),
    }
  }

  /// Apply an affine transform in place. The cached bounding planes
  /// are transformed alongside the body.
  pub fn transform(&mut self, matrix: &Affine) {
    if matrix.is_identity() {
      return;
    }
    match &mut self.body {
      SurfaceBody::Plane(pl) => pl.transform(matrix),
      SurfaceBody::Sphere(s) => s.transform(matrix),
      SurfaceBody::Cylinder(c) => c.transform(matrix),
      SurfaceBody::Cone(c) => c.transform(matrix),
      SurfaceBody::Quadric(q) => q.transform(matrix),
      SurfaceBody::Torus(t) => t.transform(matrix),
      SurfaceBody::Triangle(t) => t.transform(matrix),
    }
    for conj in &mut self.bounding_planes {
      for plane in conj.iter_mut() {
        plane.transform(matrix);
      }
    }
  }

  /// The reversed instance: negated name, negated id, strict
  /// complement side.
  pub fn make_reverse(&self) -> Result<Surface> {
    if self.reversed {
      return Err(Error::DegenerateGeometry(format!(
        "cannot reverse the already-reversed surface \"{}\"",
        self.name
      )));
    }
    let body = match &self.body {
      SurfaceBody::Plane(pl) => SurfaceBody::Plane(pl.reversed()),
      other => other.clone(),
    };
    let name = format!("-{}", self.name);
    let bounding_planes = body_bounding_planes(&self.body, &name, true)?;
    Ok(Surface {
      id: -self.id,
      name,
      reversed: true,
      body,
      bounding_planes,
    })
  }

  /// Fresh unreversed copy under a new name (TRCL propagation).
  pub fn deep_copy(&self, new_name: impl Into<String>) -> Result<Surface> {
    Surface::new(new_name, self.body.clone())
  }

  pub fn bounding_planes(&self) -> &PlaneSets {
    &self.bounding_planes
  }

  /// Axis-aligned box of the surface side.
  pub fn generate_bbox(&self) -> BoundingBox {
    match &self.body {
      SurfaceBody::Plane(pl) => pl.generate_bbox(),
      SurfaceBody::Sphere(s) => s.generate_bbox(self.reversed),
      SurfaceBody::Cylinder(c) => c.generate_bbox(self.reversed),
      SurfaceBody::Cone(c) => c.generate_bbox(self.reversed),
      SurfaceBody::Quadric(q) => q.generate_bbox(&self.name, self.reversed),
      SurfaceBody::Torus(t) => t.generate_bbox(self.reversed),
      SurfaceBody::Triangle(t) => t.generate_bbox(self.reversed),
    }
  }

  /// Serialize back to a card the surface parser accepts.
  pub fn to_input_string(&self) -> String {
    match &self.body {
      SurfaceBody::Plane(pl) => format!(
        "{} p {} {} {} {}",
        self.name,
        pl.normal().x,
        pl.normal().y,
        pl.normal().z,
        pl.distance()
      ),
      SurfaceBody::Sphere(s) => s.to_input_string(&self.name),
      SurfaceBody::Cylinder(c) => c.to_input_string(&self.name),
      SurfaceBody::Cone(c) => c.to_input_string(&self.name),
      SurfaceBody::Quadric(q) => q.to_input_string(&self.name),
      SurfaceBody::Torus(t) => t.to_input_string(&self.name),
      SurfaceBody::Triangle(t) => t.to_input_string(&self.name),
    }
  }
}

fn body_bounding_planes(body: &SurfaceBody, name: &str, reversed: bool) -> Result<PlaneSets> {
  Ok(match body {
    SurfaceBody::Plane(pl) => {
      let p = if reversed { pl.reversed() } else { *pl };
      vec![smallvec![p]]
    }
    SurfaceBody::Sphere(s) => s.bounding_planes(reversed),
    SurfaceBody::Cylinder(c) => c.bounding_planes(reversed),
    SurfaceBody::Cone(c) => c.bounding_planes(reversed),
    SurfaceBody::Quadric(q) => q.bounding_planes(name, reversed)?,
    SurfaceBody::Torus(t) => t.bounding_planes(reversed),
    SurfaceBody::Triangle(t) => t.bounding_planes(reversed),
  })
}

fn check_param_count(symbol: &str, params: &[f64], accepted: &[usize]) -> Result<()> {
  if accepted.contains(&params.len()) {
    return Ok(());
  }
  Err(Error::DegenerateGeometry(format!(
    "{} accepts {:?} parameters, got {}",
    symbol,
    accepted,
    params.len()
  )))
}

fn body_from_card(symbol: &str, params: &[f64]) -> Result<SurfaceBody> {
  let sym = symbol.to_ascii_lowercase();
  let v3 = |i: usize| DVec3::new(params[i], params[i + 1], params[i + 2]);
  match sym.as_str() {
    "p" => {
      check_param_count(&sym, params, &[4, 9])?;
      let plane = if params.len() == 4 {
        Plane::new(v3(0), params[3])?
      } else {
        Plane::from_three_points(v3(0), v3(3), v3(6))?
      };
      Ok(SurfaceBody::Plane(plane))
    }
    "px" | "py" | "pz" => {
      check_param_count(&sym, params, &[1])?;
      let axis = axis_of(&sym)?;
      Ok(SurfaceBody::Plane(Plane::new(axis.unit(), params[0])?))
    }
    "s" => {
      check_param_count(&sym, params, &[4])?;
      Ok(SurfaceBody::Sphere(Sphere::new(v3(0), params[3])?))
    }
    "so" => {
      check_param_count(&sym, params, &[1])?;
      Ok(SurfaceBody::Sphere(Sphere::new(DVec3::ZERO, params[0])?))
    }
    "sx" | "sy" | "sz" => {
      check_param_count(&sym, params, &[2])?;
      let center = axis_of(&sym)?.unit() * params[0];
      Ok(SurfaceBody::Sphere(Sphere::new(center, params[1])?))
    }
    "c/x" => {
      check_param_count(&sym, params, &[3])?;
      Ok(SurfaceBody::Cylinder(Cylinder::new(
        DVec3::new(0.0, params[0], params[1]),
        DVec3::X,
        params[2],
      )?))
    }
    "c/y" => {
      check_param_count(&sym, params, &[3])?;
      Ok(SurfaceBody::Cylinder(Cylinder::new(
        DVec3::new(params[0], 0.0, params[1]),
        DVec3::Y,
        params[2],
      )?))
    }
    "c/z" => {
      check_param_count(&sym, params, &[3])?;
      Ok(SurfaceBody::Cylinder(Cylinder::new(
        DVec3::new(params[0], params[1], 0.0),
        DVec3::Z,
        params[2],
      )?))
    }
    "cx" | "cy" | "cz" => {
      check_param_count(&sym, params, &[1])?;
      let axis = axis_of(&sym)?;
      Ok(SurfaceBody::Cylinder(Cylinder::new(
        DVec3::ZERO,
        axis.unit(),
        params[0],
      )?))
    }
    "ca" => {
      check_param_count(&sym, params, &[7])?;
      Ok(SurfaceBody::Cylinder(Cylinder::new(v3(0), v3(3), params[6])?))
    }
    "k/x" | "k/y" | "k/z" => {
      check_param_count(&sym, params, &[4, 5])?;
      let sheet = if params.len() == 5 { params[4] as i8 } else { 0 };
      let axis = axis_of(&sym)?;
      Ok(SurfaceBody::Cone(Cone::new(v3(0), axis.unit(), params[3], sheet)?))
    }
    "kx" | "ky" | "kz" => {
      check_param_count(&sym, params, &[2, 3])?;
      let sheet = if params.len() == 3 { params[2] as i8 } else { 0 };
      let axis = axis_of(&sym)?;
      Ok(SurfaceBody::Cone(Cone::new(
        axis.unit() * params[0],
        axis.unit(),
        params[1],
        sheet,
      )?))
    }
    "ka" => {
      check_param_count(&sym, params, &[7, 8])?;
      let sheet = if params.len() == 8 { params[7] as i8 } else { 0 };
      Ok(SurfaceBody::Cone(Cone::new(v3(0), v3(3), params[6], sheet)?))
    }
    "sq" => {
      check_param_count(&sym, params, &[10])?;
      let (quad, _) = Quadric::from_sq(params, &Affine::IDENTITY)?;
      Ok(SurfaceBody::Quadric(quad))
    }
    "gq" => {
      check_param_count(&sym, params, &[10])?;
      let mut coeffs = [0.0; 10];
      coeffs.copy_from_slice(params);
      Ok(SurfaceBody::Quadric(Quadric::new(coeffs)))
    }
    "tx" | "ty" | "tz" => {
      check_param_count(&sym, params, &[6])?;
      let axis = axis_of(&sym)?;
      Ok(SurfaceBody::Torus(Torus::new(
        v3(0),
        axis.unit(),
        params[3],
        params[4],
        params[5],
      )?))
    }
    "ta" => {
      check_param_count(&sym, params, &[9])?;
      Ok(SurfaceBody::Torus(Torus::new(
        v3(0),
        v3(3),
        params[6],
        params[7],
        params[8],
      )?))
    }
    "tri" => {
      check_param_count(&sym, params, &[9])?;
      Ok(SurfaceBody::Triangle(Triangle::from_points(v3(0), v3(3), v3(6))?))
    }
    _ => Err(Error::UnknownSymbol(symbol.to_string())),
  }
}

fn axis_of(sym: &str) -> Result<Axis> {
  match sym.chars().last() {
    Some('x') => Ok(Axis::X),
    Some('y') => Ok(Axis::Y),
    Some('z') => Ok(Axis::Z),
    _ => Err(Error::UnknownSymbol(sym.to_string())),
  }
}

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;
