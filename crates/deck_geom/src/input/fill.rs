//! FILL/LATTICE expansion.
//!
//! A lattice cell's equation pairs up opposing planes; each pair yields
//! an index vector (direction of increasing index, magnitude one
//! element pitch). The dimension declarator is derived automatically by
//! expressing every vertex of the containing cell's bounding box in the
//! index-vector basis and taking per-axis extremes; hexagonal lattices
//! run both redundant bases and merge. Elements are instantiated on a
//! small worker pool, each one polling the shared cancel flag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use glam::DVec3;

use crate::bbox::{is_overlapping, BoundingBox};
use crate::cell::EquationNode;
use crate::constants::MAX_LATTICE_INDEX;
use crate::error::{Error, Result};
use crate::input::cell_card::{CellCard, FillEntry};
use crate::math::{Affine, Mat3, Point, Vector};
use crate::surface::{SurfaceBody, SurfaceMap};
use crate::transform;

/// Shared state of one FILL expansion run.
pub struct FillContext<'a> {
  pub tr_map: &'a HashMap<usize, Affine>,
  pub smap: &'a Arc<SurfaceMap>,
  pub cancel: Option<&'a AtomicBool>,
  pub timeout: Option<&'a AtomicBool>,
  /// Elements instantiated so far, for progress reporting.
  pub counter: &'a AtomicUsize,
  pub threads: usize,
}

impl FillContext<'_> {
  fn check_cancel(&self) -> Result<()> {
    if let Some(flag) = self.cancel {
      if flag.load(Ordering::Relaxed) {
        return Err(Error::Cancelled);
      }
    }
    Ok(())
  }
}

/// Convert the containing cell's bounding box into index ranges.
///
/// Cell index `i` spans `[i - 0.5, i + 0.5]` in the basis, so plain
/// rounding of the converted coordinates already carries the half-bin
/// shift. Unbounded box axes are only admissible when the basis is
/// orthogonal to them; otherwise the lattice is infinite.
pub fn calc_dimension_declarator(
  dimension: usize,
  base_center: Point,
  index_vectors: &[Vector],
  outer_bb: &BoundingBox,
) -> Result<[(i32, i32); 3]> {
  if !(2..=3).contains(&dimension) || index_vectors.len() < dimension {
    return Err(Error::DegenerateGeometry(format!(
      "lattice dimension {dimension} with {} index vectors",
      index_vectors.len()
    )));
  }
  let hexagon = index_vectors.len() > dimension;
  let mut ranges = [(i32::MAX, i32::MIN); 3];

  let third = if dimension == 3 {
    index_vectors[if hexagon { 3 } else { 2 }]
  } else {
    index_vectors[0].cross(index_vectors[1]).normalize()
  };

  let accumulate = |basis_b: Vector, pt: Point, ranges: &mut [(i32, i32); 3]| -> Result<()> {
    let mat = Mat3::from_rows(index_vectors[0], basis_b, third);
    if !mat.is_regular() {
      return Err(Error::DegenerateGeometry(
        "singular lattice index basis".into(),
      ));
    }
    let res = (pt - base_center) * mat.inverse();
    for i in 0..dimension {
      if res[i].abs() > i32::MAX as f64 * 0.1 {
        return Err(Error::InfiniteLattice);
      }
    }
    for i in 0..3 {
      let rounded = res[i].round();
      let value = if rounded < i32::MIN as f64 {
        i32::MIN
      } else if rounded > i32::MAX as f64 {
        i32::MAX
      } else {
        rounded as i32
      };
      ranges[i].0 = ranges[i].0.min(value);
      ranges[i].1 = ranges[i].1.max(value);
    }
    Ok(())
  };

  for pt in outer_bb.vertices() {
    accumulate(index_vectors[1], pt, &mut ranges)?;
    if hexagon {
      accumulate(index_vectors[2], pt, &mut ranges)?;
    }
  }

  for range in ranges.iter().take(dimension) {
    if range.0 <= -MAX_LATTICE_INDEX || range.1 >= MAX_LATTICE_INDEX {
      return Err(Error::ExcessMaxIndex);
    }
  }
  if dimension <= 2 {
    ranges[2] = (0, 0);
  }
  Ok(ranges)
}

/// Derive the index vectors, the base element center and the lattice
/// dimension from the lattice cell's plane pairs.
///
/// The first surface of each pair marks the direction of increasing
/// index; the pitch is the distance between the pair's planes.
pub fn lattice_basis(
  lattice: &CellCard,
  smap: &SurfaceMap,
) -> Result<(usize, Vec<Vector>, Point)> {
  let refs = crate::input::cell_card::surface_refs(&lattice.equation);
  if refs.len() < 4 || refs.len() % 2 != 0 {
    return Err(Error::DegenerateGeometry(format!(
      "lattice cell \"{}\" needs an even number (>= 4) of bounding planes, found {}",
      lattice.name,
      refs.len()
    )));
  }
  let lat_type = lattice.lattice_type();
  let pair_count = refs.len() / 2;
  let dimension = match (lat_type, pair_count) {
    (1, 2) => 2usize,
    (1, 3) => 3,
    (2, 3) => 2,
    (2, 4) => 3,
    _ => {
      return Err(Error::DegenerateGeometry(format!(
        "lattice cell \"{}\": lat={} with {} plane pairs is not a recognized layout",
        lattice.name, lat_type, pair_count
      )))
    }
  };

  let mut vectors = Vec::with_capacity(pair_count);
  let mut mid_normals: Vec<(Vector, f64)> = Vec::new();
  for pair in 0..pair_count {
    let first = &refs[2 * pair];
    let second = &refs[2 * pair + 1];
    let plane_of = |reference: &str| -> Result<(crate::surface::Plane, bool)> {
      let negative = reference.starts_with('-');
      let name = reference.trim_start_matches(['-', '+']);
      let surface = smap.by_name(name)?;
      match surface.body() {
        SurfaceBody::Plane(p) => Ok((*p, negative)),
        _ => Err(Error::DegenerateGeometry(format!(
          "lattice cell \"{}\" is bounded by non-plane surface \"{}\"",
          lattice.name, name
        ))),
      }
    };
    let (p1, neg1) = plane_of(first)?;
    let (p2, _neg2) = plane_of(second)?;
    // Outward direction of the first listed surface relative to the
    // cell interior: +n when the cell sits behind it, -n otherwise.
    let outward = if neg1 { p1.normal() } else { -p1.normal() };
    let pos1 = p1.distance() * p1.normal();
    let pos2 = p2.distance() * p2.normal();
    let pitch = (pos1 - pos2).dot(outward).abs();
    if pitch < crate::constants::EPS {
      return Err(Error::DegenerateGeometry(format!(
        "lattice cell \"{}\" has a zero-pitch plane pair",
        lattice.name
      )));
    }
    vectors.push(outward * pitch);
    let u = outward.normalize();
    let mid = 0.5 * (pos1 + pos2);
    mid_normals.push((u, mid.dot(u)));
  }

  // Base element center: intersection of the pair mid-planes. For 2-D
  // lattices the free coordinate carries no index vector component and
  // pins to zero.
  let (rows, rhs) = if dimension == 3 {
    let zi = mid_normals.len() - 1;
    (
      [mid_normals[0].0, mid_normals[1].0, mid_normals[zi].0],
      DVec3::new(mid_normals[0].1, mid_normals[1].1, mid_normals[zi].1),
    )
  } else {
    (
      [
        mid_normals[0].0,
        mid_normals[1].0,
        mid_normals[0].0.cross(mid_normals[1].0).normalize(),
      ],
      DVec3::new(mid_normals[0].1, mid_normals[1].1, 0.0),
    )
  };
  let mat = Mat3::from_rows(rows[0], rows[1], rows[2]).transposed();
  if !mat.is_regular() {
    return Err(Error::DegenerateGeometry(format!(
      "lattice cell \"{}\" has a degenerate plane-pair basis",
      lattice.name
    )));
  }
  let center = rhs * mat.inverse();

  Ok((dimension, vectors, center))
}

/// Rewrite every surface reference of an equation as its transformed
/// copy, registering fresh surfaces under the anchor name.
pub fn translate_equation(
  equation: &str,
  trcl_str: &str,
  anchor: &str,
  ctx: &FillContext<'_>,
) -> Result<String> {
  if trcl_str.is_empty() {
    return Ok(equation.to_string());
  }
  let node = EquationNode::parse(equation)?;
  let rewritten = rewrite_leaves(&node, &mut |leaf: &str| {
    let negative = leaf.starts_with('-');
    let base = leaf.trim_start_matches(['-', '+']);
    let new_base = ctx
      .smap
      .register_transformed(ctx.tr_map, base, anchor, trcl_str)?;
    Ok(if negative { format!("-{new_base}") } else { new_base })
  })?;
  Ok(rewritten.to_equation_string())
}

fn rewrite_leaves(
  node: &EquationNode,
  rewrite: &mut impl FnMut(&str) -> Result<String>,
) -> Result<EquationNode> {
  Ok(match node {
    EquationNode::Leaf(name) => EquationNode::Leaf(rewrite(name)?),
    EquationNode::And(children) => EquationNode::And(
      children
        .iter()
        .map(|c| rewrite_leaves(c, rewrite))
        .collect::<Result<Vec<_>>>()?,
    ),
    EquationNode::Or(children) => EquationNode::Or(
      children
        .iter()
        .map(|c| rewrite_leaves(c, rewrite))
        .collect::<Result<Vec<_>>>()?,
    ),
  })
}

/// One lattice element to instantiate.
struct ElementJob {
  i: i32,
  j: i32,
  k: i32,
  entry: FillEntry,
}

/// Expand a lattice into explicit element cells.
///
/// The element equations are the lattice cell's equation translated by
/// `i v_s + j v_t + k v_u` and then carried through `extra_tr` (the
/// container's fill transform chain, possibly empty). When a container
/// is given, its equation clips every element and its bounding box
/// prunes elements that cannot intersect it. Elements whose fill entry
/// references a different universe keep a `fill=` parameter (with the
/// composed transform) for the next resolution pass.
#[allow(clippy::too_many_arguments)]
pub fn expand_lattice(
  container: Option<&CellCard>,
  container_bb: &BoundingBox,
  extra_tr: &str,
  lattice: &CellCard,
  ranges: [(i32, i32); 3],
  entries: &[FillEntry],
  vectors: &[Vector],
  base_bb: &BoundingBox,
  ctx: &FillContext<'_>,
) -> Result<Vec<CellCard>> {
  let ni = (ranges[0].1 - ranges[0].0 + 1) as usize;
  let nj = (ranges[1].1 - ranges[1].0 + 1) as usize;

  let extra_matrix = if extra_tr.is_empty() {
    Affine::IDENTITY
  } else {
    transform::compose_transforms(ctx.tr_map, extra_tr)?
  };

  let mut jobs: Vec<ElementJob> = Vec::new();
  for k in ranges[2].0..=ranges[2].1 {
    for j in ranges[1].0..=ranges[1].1 {
      for i in ranges[0].0..=ranges[0].1 {
        let entry = if entries.len() == 1 {
          entries[0].clone()
        } else {
          // Row-major listing, first index fastest.
          let idx = ((k - ranges[2].0) as usize * nj + (j - ranges[1].0) as usize) * ni
            + (i - ranges[0].0) as usize;
          entries[idx].clone()
        };
        jobs.push(ElementJob { i, j, k, entry });
      }
    }
  }

  let worker = |job: &ElementJob| -> Result<Option<CellCard>> {
    ctx.check_cancel()?;
    let shift = job.i as f64 * vectors[0]
      + job.j as f64 * vectors[1]
      + if vectors.len() > 2 && ranges[2] != (0, 0) {
        job.k as f64 * vectors[vectors.len() - 1]
      } else {
        DVec3::ZERO
      };
    let shift_trcl = format!("{} {} {}", shift.x, shift.y, shift.z);

    // Prune elements that cannot reach the container. A fully
    // universal base box carries no information; partially unbounded
    // boxes (2-D lattices) still prune across their bounded axes.
    if !base_bb.is_empty() && !base_bb.is_universal(true) {
      let mut shifted = *base_bb;
      shifted.translate(shift);
      shifted.transform(&extra_matrix);
      if !is_overlapping(&shifted, container_bb) {
        return Ok(None);
      }
    }

    // The surface anchor must be unique per element and per container;
    // '@' joins them without engaging the '<' hierarchy splitting.
    let elem_base = crate::input::card::element_name(&lattice.name, job.i, job.j, job.k);
    let (elem_name, anchor) = match container {
      Some(c) => (
        format!("{elem_base}<{}", c.name),
        format!("{elem_base}@{}", c.name),
      ),
      None => (elem_base.clone(), elem_base.clone()),
    };

    let mut trcl_parts = vec![shift_trcl.clone()];
    if !extra_tr.is_empty() {
      trcl_parts.push(extra_tr.to_string());
    }
    let full_trcl = trcl_parts.join(",");
    let translated = match translate_equation(&lattice.equation, &full_trcl, &anchor, ctx) {
      Ok(eq) => eq,
      Err(e) => return Err(e),
    };

    let mut elem = lattice.clone();
    elem.name = elem_name;
    elem.equation = match container {
      Some(c) => format!("({}) ({})", translated, c.equation),
      None => translated,
    };
    elem.parameters.remove("lat");
    elem.parameters.remove("fill");
    elem.parameters.remove("u");
    elem.trcl = String::new();
    elem.order = crate::input::cell_card::NOT_ORDERED;
    if job.entry.universe != lattice.universe() {
      // The element is itself filled; its content maps through the
      // entry transform, the element shift and the container chain.
      let mut fill_value = job.entry.universe.clone();
      let mut tr_parts: Vec<String> = Vec::new();
      if let Some(tr) = &job.entry.tr {
        tr_parts.push(tr.clone());
      }
      tr_parts.push(full_trcl.clone());
      fill_value.push_str(&format!("({})", tr_parts.join(",")));
      elem.parameters.insert("fill".into(), fill_value);
    }
    ctx.counter.fetch_add(1, Ordering::Relaxed);
    Ok(Some(elem))
  };

  let results: Vec<Result<Option<CellCard>>> = if ctx.threads > 1 && jobs.len() > 1 {
    run_pool(&jobs, ctx.threads, worker)
  } else {
    jobs.iter().map(worker).collect()
  };

  let mut cells = Vec::new();
  for r in results {
    if let Some(cell) = r? {
      cells.push(cell);
    }
  }
  Ok(cells)
}

/// Fixed worker pool over a job slice: indices flow through a channel,
/// results come back tagged so the output order matches the input.
fn run_pool<'j, F>(
  jobs: &'j [ElementJob],
  threads: usize,
  worker: F,
) -> Vec<Result<Option<CellCard>>>
where
  F: Fn(&'j ElementJob) -> Result<Option<CellCard>> + Sync,
{
  let workers = threads.min(jobs.len()).max(1);
  let (job_tx, job_rx) = crossbeam_channel::bounded::<usize>(jobs.len());
  let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Result<Option<CellCard>>)>();
  for idx in 0..jobs.len() {
    job_tx.send(idx).expect("queueing fill jobs");
  }
  drop(job_tx);

  std::thread::scope(|scope| {
    for _ in 0..workers {
      let job_rx = job_rx.clone();
      let result_tx = result_tx.clone();
      let worker = &worker;
      scope.spawn(move || {
        while let Ok(idx) = job_rx.recv() {
          let outcome = worker(&jobs[idx]);
          if result_tx.send((idx, outcome)).is_err() {
            break;
          }
        }
      });
    }
  });
  drop(result_tx);

  let mut results: Vec<Result<Option<CellCard>>> = (0..jobs.len()).map(|_| Ok(None)).collect();
  while let Ok((idx, outcome)) = result_rx.recv() {
    results[idx] = outcome;
  }
  results
}

/// Expand a plain (non-lattice) inner cell of a filled universe: clip
/// it into the outer cell under the composed transform chain.
pub fn expand_simple_inner(
  outer: &CellCard,
  entry: &FillEntry,
  inner: &CellCard,
  ctx: &FillContext<'_>,
) -> Result<CellCard> {
  ctx.check_cancel()?;
  let new_name = format!("{}<{}", inner.name, outer.name);
  let mut tr_parts: Vec<String> = Vec::new();
  if let Some(tr) = &entry.tr {
    tr_parts.push(tr.clone());
  }
  if !outer.trcl.is_empty() {
    tr_parts.push(outer.trcl.clone());
  }
  let trcl_str = tr_parts.join(",");
  let translated = translate_equation(&inner.equation, &trcl_str, &new_name, ctx)?;

  let mut cell = inner.clone();
  cell.name = new_name;
  cell.equation = format!("({}) ({})", translated, outer.equation);
  cell.parameters.remove("u");
  cell.trcl = String::new();
  cell.order = crate::input::cell_card::NOT_ORDERED;
  // A still-filled inner cell carries the composed transform forward
  // into its own expansion.
  if cell.parameters.contains_key("fill") && !trcl_str.is_empty() {
    cell.trcl = trcl_str;
  }
  ctx.counter.fetch_add(1, Ordering::Relaxed);
  Ok(cell)
}

#[cfg(test)]
#[path = "fill_test.rs"]
mod fill_test;
