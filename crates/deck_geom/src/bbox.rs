//! Axis-aligned bounding boxes and the plane-vector algebra that
//! produces them.
//!
//! A cell's spatial extent arrives here as a union of conjunctions of
//! half-spaces. Each conjunction with at least four planes is reduced
//! to candidate vertices (all three-plane intersections filtered to the
//! forward side of every other plane); the candidates then pass through
//! the degenerate ladder of [`BoundingBox::from_points`]. The routines
//! poll an optional timeout flag and the conjunction product guards
//! against memory blow-up before allocating.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::DVec3;
use smallvec::SmallVec;

use crate::constants::{BB_TEST_DELTA, EPS, MAX_EXTENT};
use crate::error::{Error, Result};
use crate::math::{is_dependent, is_same_point, Affine, Point, Vector};
use crate::surface::plane::Plane;
use crate::surface::PlaneSets;

/// Axis-aligned box `[xmin, xmax] x [ymin, ymax] x [zmin, zmax]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
  pub xmin: f64,
  pub xmax: f64,
  pub ymin: f64,
  pub ymax: f64,
  pub zmin: f64,
  pub zmax: f64,
}

impl BoundingBox {
  pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64, zmin: f64, zmax: f64) -> BoundingBox {
    debug_assert!(xmin <= xmax && ymin <= ymax && zmin <= zmax, "box min above max");
    BoundingBox {
      xmin,
      xmax,
      ymin,
      ymax,
      zmin,
      zmax,
    }
  }

  pub fn universal() -> BoundingBox {
    BoundingBox::new(
      -MAX_EXTENT,
      MAX_EXTENT,
      -MAX_EXTENT,
      MAX_EXTENT,
      -MAX_EXTENT,
      MAX_EXTENT,
    )
  }

  pub fn empty() -> BoundingBox {
    BoundingBox::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
  }

  pub fn range(&self) -> [f64; 6] {
    [self.xmin, self.xmax, self.ymin, self.ymax, self.zmin, self.zmax]
  }

  /// A box is empty when any axis span collapses.
  pub fn is_empty(&self) -> bool {
    self.xmax - self.xmin < EPS || self.ymax - self.ymin < EPS || self.zmax - self.zmin < EPS
  }

  /// Strict: saturated on every axis. Loose: saturated on any.
  pub fn is_universal(&self, strict: bool) -> bool {
    if strict {
      self.xmin <= -MAX_EXTENT
        && self.xmax >= MAX_EXTENT
        && self.ymin <= -MAX_EXTENT
        && self.ymax >= MAX_EXTENT
        && self.zmin <= -MAX_EXTENT
        && self.zmax >= MAX_EXTENT
    } else {
      self.xmin <= -MAX_EXTENT
        || self.xmax >= MAX_EXTENT
        || self.ymin <= -MAX_EXTENT
        || self.ymax >= MAX_EXTENT
        || self.zmin <= -MAX_EXTENT
        || self.zmax >= MAX_EXTENT
    }
  }

  pub fn center(&self) -> Point {
    DVec3::new(
      0.5 * (self.xmin + self.xmax),
      0.5 * (self.ymin + self.ymax),
      0.5 * (self.zmin + self.zmax),
    )
  }

  pub fn contains(&self, other: &BoundingBox) -> bool {
    other.xmin > self.xmin
      && other.xmax < self.xmax
      && other.ymin > self.ymin
      && other.ymax < self.ymax
      && other.zmin > self.zmin
      && other.zmax < self.zmax
  }

  /// Scale every half-extent about the center.
  pub fn expand(&mut self, factor: f64) {
    let c = self.center();
    self.xmin = c.x - (c.x - self.xmin) * factor;
    self.xmax = c.x + (self.xmax - c.x) * factor;
    self.ymin = c.y - (c.y - self.ymin) * factor;
    self.ymax = c.y + (self.ymax - c.y) * factor;
    self.zmin = c.z - (c.z - self.zmin) * factor;
    self.zmax = c.z + (self.zmax - c.z) * factor;
  }

  pub fn translate(&mut self, v: Vector) {
    self.xmin += v.x;
    self.xmax += v.x;
    self.ymin += v.y;
    self.ymax += v.y;
    self.zmin += v.z;
    self.zmax += v.z;
  }

  pub fn vertices(&self) -> [Point; 8] {
    [
      DVec3::new(self.xmin, self.ymin, self.zmin),
      DVec3::new(self.xmin, self.ymin, self.zmax),
      DVec3::new(self.xmin, self.ymax, self.zmin),
      DVec3::new(self.xmin, self.ymax, self.zmax),
      DVec3::new(self.xmax, self.ymin, self.zmin),
      DVec3::new(self.xmax, self.ymin, self.zmax),
      DVec3::new(self.xmax, self.ymax, self.zmin),
      DVec3::new(self.xmax, self.ymax, self.zmax),
    ]
  }

  /// Transform the eight corners and rebuild from their hull.
  pub fn transform(&mut self, matrix: &Affine) {
    let pts: Vec<Point> = self.vertices().iter().map(|p| matrix.apply_point(*p)).collect();
    *self = BoundingBox::from_points(&pts);
  }

  /// Interval intersection; disjoint boxes collapse to the empty box.
  pub fn and(b1: &BoundingBox, b2: &BoundingBox) -> BoundingBox {
    if !is_overlapping(b1, b2) {
      return BoundingBox::empty();
    }
    let mid = |a0: f64, a1: f64, b0: f64, b1v: f64| {
      let mut v = [a0, a1, b0, b1v];
      v.sort_by(|x, y| x.partial_cmp(y).unwrap());
      (v[1], v[2])
    };
    let (x0, x1) = mid(b1.xmin, b1.xmax, b2.xmin, b2.xmax);
    let (y0, y1) = mid(b1.ymin, b1.ymax, b2.ymin, b2.ymax);
    let (z0, z1) = mid(b1.zmin, b1.zmax, b2.zmin, b2.zmax);
    BoundingBox::new(x0, x1, y0, y1, z0, z1)
  }

  /// Interval hull; the empty box is the identity element.
  pub fn or(b1: &BoundingBox, b2: &BoundingBox) -> BoundingBox {
    if b1.is_empty() {
      return *b2;
    }
    if b2.is_empty() {
      return *b1;
    }
    BoundingBox::new(
      b1.xmin.min(b2.xmin),
      b1.xmax.max(b2.xmax),
      b1.ymin.min(b2.ymin),
      b1.ymax.max(b2.ymax),
      b1.zmin.min(b2.zmin),
      b1.zmax.max(b2.zmax),
    )
  }

  /// Box of a candidate vertex set, with the degenerate ladder:
  /// no points -> empty; one distinct point -> universal; collinear
  /// points -> bounded only across an axis-parallel line; coplanar
  /// points -> unbounded along an axis-parallel normal; otherwise the
  /// min/max box.
  pub fn from_points(points: &[Point]) -> BoundingBox {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    pts.dedup_by(|a, b| is_same_point(*a, *b));

    if pts.is_empty() {
      return BoundingBox::empty();
    }
    if pts.len() == 1 {
      return BoundingBox::universal();
    }

    let p1 = pts[0];
    let p2 = pts[1..].iter().copied().find(|p| !is_same_point(p1, *p));
    let Some(p2) = p2 else {
      return BoundingBox::universal();
    };
    let vec12 = p1 - p2;
    let p3 = pts[1..]
      .iter()
      .copied()
      .find(|p| !is_dependent(vec12, p1 - *p));

    let min_max = |axis: usize| -> (f64, f64) {
      let vals = pts.iter().map(|p| p[axis]);
      let lo = vals.clone().fold(f64::INFINITY, f64::min);
      let hi = vals.fold(f64::NEG_INFINITY, f64::max);
      (lo, hi)
    };
    let (x0, x1) = min_max(0);
    let (y0, y1) = min_max(1);
    let (z0, z1) = min_max(2);

    let Some(p3) = p3 else {
      // Collinear points close at most one dimension.
      let mut arr = [x0, x1, y0, y1, z0, z1];
      if is_dependent(vec12, DVec3::X) {
        arr[2] = -MAX_EXTENT;
        arr[3] = MAX_EXTENT;
        arr[4] = -MAX_EXTENT;
        arr[5] = MAX_EXTENT;
      } else if is_dependent(vec12, DVec3::Y) {
        arr[0] = -MAX_EXTENT;
        arr[1] = MAX_EXTENT;
        arr[4] = -MAX_EXTENT;
        arr[5] = MAX_EXTENT;
      } else if is_dependent(vec12, DVec3::Z) {
        arr[0] = -MAX_EXTENT;
        arr[1] = MAX_EXTENT;
        arr[2] = -MAX_EXTENT;
        arr[3] = MAX_EXTENT;
      } else {
        return BoundingBox::universal();
      }
      return BoundingBox::new(arr[0], arr[1], arr[2], arr[3], arr[4], arr[5]);
    };

    let Ok(plane) = Plane::from_three_points(p1, p2, p3) else {
      return BoundingBox::universal();
    };
    let coplanar = pts.iter().all(|p| plane.distance_to_point(*p).abs() <= EPS);
    if coplanar {
      // A planar set cannot close the volume along its normal.
      let normal = plane.normal();
      let mut arr = [x0, x1, y0, y1, z0, z1];
      if is_dependent(normal, DVec3::X) {
        arr[0] = -MAX_EXTENT;
        arr[1] = MAX_EXTENT;
      } else if is_dependent(normal, DVec3::Y) {
        arr[2] = -MAX_EXTENT;
        arr[3] = MAX_EXTENT;
      } else if is_dependent(normal, DVec3::Z) {
        arr[4] = -MAX_EXTENT;
        arr[5] = MAX_EXTENT;
      } else {
        return BoundingBox::universal();
      }
      return BoundingBox::new(arr[0], arr[1], arr[2], arr[3], arr[4], arr[5]);
    }

    BoundingBox::new(x0, x1, y0, y1, z0, z1)
  }

  /// Box of a union of conjunctions of half-spaces.
  pub fn from_planes(
    timeout: Option<&AtomicBool>,
    plane_vectors: &PlaneSets,
  ) -> Result<BoundingBox> {
    if plane_vectors.is_empty() {
      return Ok(BoundingBox::universal());
    }
    let mut bb = BoundingBox::empty();
    for planes in plane_vectors {
      // Fewer than four planes cannot close a volume: cut the
      // universal box by the axis-parallel members and move on.
      if planes.len() < 4 {
        let mut tmp = BoundingBox::universal();
        for plane in planes {
          tmp = BoundingBox::and(&tmp, &plane.generate_bbox());
        }
        bb = BoundingBox::or(&bb, &tmp);
        continue;
      }

      let points = valid_points(planes, timeout)?;
      let tmp = if points.is_empty() {
        // No vertex survived: either an empty region or an unbounded
        // one. Closing with far planes distinguishes the two.
        let mut closed: Vec<Plane> = planes.to_vec();
        let far = 0.1 * MAX_EXTENT;
        for axis in [DVec3::X, DVec3::Y, DVec3::Z] {
          closed.push(Plane::new(-axis, -far).unwrap());
          closed.push(Plane::new(axis, -far).unwrap());
        }
        let closed_points = valid_points(&closed, timeout)?;
        if closed_points.is_empty() {
          BoundingBox::empty()
        } else {
          let mut t = BoundingBox::universal();
          for plane in planes {
            t = BoundingBox::and(&t, &plane.generate_bbox());
          }
          t
        }
      } else if points.len() < 4 {
        // Too few vertices to close a polyhedron; axis-parallel
        // members may still clip something off.
        let mut t = BoundingBox::universal();
        for plane in planes {
          t = BoundingBox::and(&t, &plane.generate_bbox());
        }
        t
      } else {
        BoundingBox::from_points(&points)
      };

      // A fully universal member makes the whole union universal.
      if tmp.is_universal(true) {
        return Ok(BoundingBox::universal());
      }
      if !tmp.is_empty() {
        bb = BoundingBox::or(&bb, &tmp);
      }
    }
    Ok(bb)
  }

  /// Plane sets spanning this box: inward as one conjunction, outward
  /// as six disjoined half-spaces.
  pub fn bounding_surfaces(&self, inward: bool) -> PlaneSets {
    use smallvec::smallvec;
    if inward {
      vec![smallvec![
        Plane::new(DVec3::X, self.xmin).unwrap(),
        Plane::new(-DVec3::X, -self.xmax).unwrap(),
        Plane::new(DVec3::Y, self.ymin).unwrap(),
        Plane::new(-DVec3::Y, -self.ymax).unwrap(),
        Plane::new(DVec3::Z, self.zmin).unwrap(),
        Plane::new(-DVec3::Z, -self.zmax).unwrap(),
      ]]
    } else {
      vec![
        smallvec![Plane::new(-DVec3::X, -self.xmin).unwrap()],
        smallvec![Plane::new(DVec3::X, self.xmax).unwrap()],
        smallvec![Plane::new(-DVec3::Y, -self.ymin).unwrap()],
        smallvec![Plane::new(DVec3::Y, self.ymax).unwrap()],
        smallvec![Plane::new(-DVec3::Z, -self.zmin).unwrap()],
        smallvec![Plane::new(DVec3::Z, self.zmax).unwrap()],
      ]
    }
  }
}

impl std::fmt::Display for BoundingBox {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let r = self.range();
    write!(
      f,
      "{{{}, {}, {}, {}, {}, {}}}",
      r[0], r[1], r[2], r[3], r[4], r[5]
    )
  }
}

pub fn is_overlapping(b1: &BoundingBox, b2: &BoundingBox) -> bool {
  !(b1.xmin > b2.xmax
    || b1.xmax < b2.xmin
    || b1.ymin > b2.ymax
    || b1.ymax < b2.ymin
    || b1.zmin > b2.zmax
    || b1.zmax < b2.zmin)
}

pub fn is_same_bb(b1: &BoundingBox, b2: &BoundingBox) -> bool {
  let r1 = b1.range();
  let r2 = b2.range();
  r1.iter().zip(r2.iter()).all(|(a, b)| (a - b).abs() < EPS)
}

fn check_timeout(timeout: Option<&AtomicBool>) -> Result<()> {
  if let Some(flag) = timeout {
    if flag.load(Ordering::Relaxed) {
      return Err(Error::Timeout);
    }
  }
  Ok(())
}

/// Vertices of the conjunction: all three-plane intersections that lie
/// strictly on the forward side of every other plane. Candidates are
/// nudged off each test plane by `BB_TEST_DELTA` along its normal so
/// points sitting exactly on a plane do not flicker.
fn valid_points(planes: &[Plane], timeout: Option<&AtomicBool>) -> Result<Vec<Point>> {
  check_timeout(timeout)?;
  if planes.len() < 4 {
    return Ok(Vec::new());
  }

  let mut candidates: Vec<(Point, [usize; 3])> = Vec::new();
  for i in 0..planes.len() {
    for j in (i + 1)..planes.len() {
      for k in (j + 1)..planes.len() {
        if let Some(pt) = Plane::intersection_of(&planes[i], &planes[j], &planes[k]) {
          candidates.push((pt, [i, j, k]));
        }
      }
      check_timeout(timeout)?;
    }
  }

  for (pi, plane) in planes.iter().enumerate() {
    candidates.retain(|(pt, gen)| {
      gen.contains(&pi) || plane.is_forward(*pt + BB_TEST_DELTA * plane.normal())
    });
  }

  Ok(candidates.into_iter().map(|(pt, _)| pt).collect())
}

/// Reported available memory in megabytes; conservative fallback when
/// the platform offers no answer.
fn available_memory_mb() -> f64 {
  if let Ok(text) = std::fs::read_to_string("/proc/meminfo") {
    for line in text.lines() {
      if let Some(rest) = line.strip_prefix("MemAvailable:") {
        if let Some(kb) = rest.split_whitespace().next().and_then(|v| v.parse::<f64>().ok()) {
          return kb / 1024.0;
        }
      }
    }
  }
  4096.0
}

/// AND of two unions of conjunctions: the pairwise concatenations,
/// deduplicated, with contradictory conjunctions (coincident planes of
/// opposite orientation) dropped. Fails fast when the product would
/// take more than half the available memory.
pub fn merge_plane_vectors_and(
  timeout: Option<&AtomicBool>,
  vecs1: &PlaneSets,
  vecs2: &PlaneSets,
) -> Result<PlaneSets> {
  check_timeout(timeout)?;
  if vecs1.is_empty() {
    return Ok(vecs2.clone());
  }
  if vecs2.is_empty() {
    return Ok(vecs1.clone());
  }

  let size1: usize = vecs1.iter().map(|v| v.len()).sum();
  let size2: usize = vecs2.iter().map(|v| v.len()).sum();
  let projected_mb = std::mem::size_of::<Plane>() as f64 * size1 as f64 * size2 as f64 * 1e-6;
  if available_memory_mb() * 0.5 <= projected_mb {
    return Err(Error::OutOfMemory);
  }

  let mut merged = PlaneSets::new();
  for v1 in vecs1 {
    check_timeout(timeout)?;
    for v2 in vecs2 {
      let mut planes: SmallVec<[Plane; 6]> = v1.clone();
      planes.extend(v2.iter().copied());

      // Drop duplicates by (normal, distance) equivalence.
      let mut unique: SmallVec<[Plane; 6]> = SmallVec::new();
      for plane in planes {
        if !unique.iter().any(|u| u.is_same(&plane)) {
          unique.push(plane);
        }
      }

      // Coincident position with opposite normals contradicts the
      // conjunction; the whole member vanishes.
      let mut invalid = false;
      'outer: for i in 0..unique.len() {
        for j in (i + 1)..unique.len() {
          let pos_i = unique[i].distance() * unique[i].normal();
          let pos_j = unique[j].distance() * unique[j].normal();
          if is_same_point(pos_i, pos_j)
            && (unique[i].normal().dot(unique[j].normal()) + 1.0).abs() < EPS
          {
            invalid = true;
            break 'outer;
          }
        }
      }
      if !invalid {
        merged.push(unique);
      }
    }
  }
  Ok(merged)
}

#[cfg(test)]
#[path = "bbox_test.rs"]
mod bbox_test;
