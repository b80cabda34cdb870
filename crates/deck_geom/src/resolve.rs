//! Whole-deck orchestration.
//!
//! Pipeline order: TR table, macrobody expansion (surface side, then
//! cell side), surface registration (with reversed instances), cell
//! parsing, dependency ordering, LIKE-BUT inheritance, complement
//! substitution, TRCL propagation onto surfaces, FILL expansion, and
//! finally per-cell bounding boxes plus unused-surface pruning.
//!
//! The resolver owns the cooperative-abort state: a cancel flag polled
//! by FILL workers and a timeout flag polled inside the bounding-box
//! loops. Both can be shared with a controlling thread.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cell::{name_equation_bbox, Cell, EquationNode};
use crate::error::{Error, Result};
use crate::input::cell_card::{
  resolve_complements, resolve_like_but, solve_dependencies, CellCard,
};
use crate::input::fill::{
  calc_dimension_declarator, expand_lattice, expand_simple_inner, lattice_basis, FillContext,
};
use crate::input::surface_card::SurfaceCard;
use crate::input::tr_card::TrCard;
use crate::input::DataLine;
use crate::macrobody;
use crate::math::Affine;
use crate::surface::{Surface, SurfaceMap};

/// Safety cap on the number of fill rewrites; an acyclic deck finishes
/// far below it.
const MAX_FILL_STEPS: usize = 100_000;

/// Knobs of one resolution run.
#[derive(Clone, Debug)]
pub struct ResolveOptions {
  /// Worker threads for FILL fan-out (0 = all available cores).
  pub threads: usize,
  /// Apply the strict user-input naming rules while parsing.
  pub strict_names: bool,
}

impl Default for ResolveOptions {
  fn default() -> Self {
    ResolveOptions {
      threads: 0,
      strict_names: false,
    }
  }
}

/// The three deck sections, already comment-stripped and line-joined.
#[derive(Clone, Debug, Default)]
pub struct DeckInput {
  pub cell_cards: Vec<DataLine>,
  pub surface_cards: Vec<DataLine>,
  pub data_cards: Vec<DataLine>,
}

impl DeckInput {
  /// Convenience constructor from bare card strings.
  pub fn from_strings(
    cells: &[&str],
    surfaces: &[&str],
    data: &[&str],
  ) -> DeckInput {
    let number = |section: &[&str]| {
      section
        .iter()
        .enumerate()
        .map(|(i, s)| DataLine::new("<input>", i as u64 + 1, *s))
        .collect()
    };
    DeckInput {
      cell_cards: number(cells),
      surface_cards: number(surfaces),
      data_cards: number(data),
    }
  }
}

/// Fully resolved geometry.
pub struct ResolvedModel {
  pub surfaces: Arc<SurfaceMap>,
  pub cells: Vec<Cell>,
  pub tr_map: HashMap<usize, Affine>,
}

impl std::fmt::Debug for ResolvedModel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResolvedModel")
      .field("cells", &self.cells.len())
      .field("tr_map", &self.tr_map.len())
      .finish()
  }
}

/// Orchestrates one resolution; owns the abort/progress state.
pub struct Resolver {
  options: ResolveOptions,
  cancel: Arc<AtomicBool>,
  timeout: Arc<AtomicBool>,
  progress: Arc<AtomicUsize>,
}

impl Resolver {
  pub fn new(options: ResolveOptions) -> Resolver {
    Resolver {
      options,
      cancel: Arc::new(AtomicBool::new(false)),
      timeout: Arc::new(AtomicBool::new(false)),
      progress: Arc::new(AtomicUsize::new(0)),
    }
  }

  /// Shared flag that aborts the resolution cooperatively.
  pub fn cancel_flag(&self) -> Arc<AtomicBool> {
    self.cancel.clone()
  }

  /// Shared flag that aborts long bounding-box computations.
  pub fn timeout_flag(&self) -> Arc<AtomicBool> {
    self.timeout.clone()
  }

  /// Elements instantiated so far (progress reporting).
  pub fn progress(&self) -> usize {
    self.progress.load(Ordering::Relaxed)
  }

  fn thread_count(&self) -> usize {
    if self.options.threads > 0 {
      self.options.threads
    } else {
      std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }
  }

  pub fn resolve(&self, input: DeckInput) -> Result<ResolvedModel> {
    let tr_lines: Vec<DataLine> = input
      .data_cards
      .iter()
      .filter(|l| TrCard::matches(&l.data))
      .cloned()
      .collect();
    let tr_map = TrCard::make_transform_map(&tr_lines)?;

    let mut surf_lines = input.surface_cards;
    let mut cell_lines = input.cell_cards;

    // Macrobodies first: the surface list gains the primitive cards,
    // the cell equations gain the substitutions.
    let expansions = macrobody::expand_in_surface_list(&tr_map, &mut surf_lines)?;
    macrobody::replace_in_cell_list(&expansions, &mut cell_lines)?;

    let smap = Arc::new(SurfaceMap::new());
    for line in &surf_lines {
      self.register_surface_card(line, &tr_map, &smap)?;
    }

    let mut cards: Vec<CellCard> = Vec::with_capacity(cell_lines.len());
    for line in &cell_lines {
      cards.push(CellCard::parse_at(
        &line.file,
        line.line,
        &line.data,
        self.options.strict_names,
      )?);
    }

    let universes = universe_members(&cards);
    let sequence = solve_dependencies(&mut cards, &universes)?;
    resolve_like_but(&mut cards, &sequence)?;
    resolve_complements(&mut cards, &sequence)?;

    let ctx = FillContext {
      tr_map: &tr_map,
      smap: &smap,
      cancel: Some(self.cancel.as_ref()),
      timeout: Some(self.timeout.as_ref()),
      counter: self.progress.as_ref(),
      threads: self.thread_count(),
    };

    // TRCL propagation: every surface of a TRCL'd cell becomes a
    // renamed transformed instance. The TRCL itself stays on the card
    // so a subsequent fill composes with it.
    for idx in 0..cards.len() {
      if cards[idx].has_trcl() && !cards[idx].equation.is_empty() {
        let trcl = cards[idx].trcl.clone();
        let anchor = cards[idx].name.clone();
        cards[idx].equation =
          crate::input::fill::translate_equation(&cards[idx].equation, &trcl, &anchor, &ctx)?;
      }
    }

    let cards = self.expand_fills(cards, &ctx)?;

    // Universe member templates were only ever cloned into containers;
    // what remains of them is not part of the real geometry.
    let real_cards: Vec<&CellCard> = cards
      .iter()
      .filter(|c| !c.parameters.contains_key("u"))
      .collect();

    // Per-cell bounding boxes are independent of each other; fan out.
    use rayon::prelude::*;
    let built: Vec<Result<Option<Cell>>> = real_cards
      .par_iter()
      .map(|card| -> Result<Option<Cell>> {
        if card.equation.is_empty() {
          tracing::warn!(cell = %card.name, "cell without geometry skipped");
          return Ok(None);
        }
        let index_eq = smap
          .make_index_equation(&card.equation)
          .map_err(|e| Error::bad_card(&card.file, card.line, e.to_string()))?;
        match Cell::from_index_equation(
          card.name.clone(),
          card.material.clone(),
          card.density,
          &index_eq,
          &smap,
          Some(self.timeout.as_ref()),
        ) {
          Ok(cell) => Ok(Some(cell)),
          Err(e @ (Error::Timeout | Error::Cancelled | Error::OutOfMemory)) => Err(e),
          Err(e) => {
            // A failed box keeps the cell usable, just unbounded.
            tracing::warn!(cell = %card.name, error = %e, "bounding box failed; keeping a universal box");
            Ok(Some(Cell {
              name: card.name.clone(),
              material: card.material.clone(),
              density: card.density,
              equation: EquationNode::parse(&index_eq)?,
              bounding_box: crate::bbox::BoundingBox::universal(),
            }))
          }
        }
      })
      .collect();
    let mut cells = Vec::with_capacity(real_cards.len());
    for outcome in built {
      if let Some(cell) = outcome? {
        cells.push(cell);
      }
    }

    let used: HashSet<String> = cells
      .iter()
      .flat_map(|c| c.equation.leaves())
      .filter_map(|leaf| {
        let id: i32 = leaf.parse().ok()?;
        smap.at(id.abs()).ok().map(|s| s.name().to_string())
      })
      .collect();
    smap.retain_named(&used);

    Ok(ResolvedModel {
      surfaces: smap,
      cells,
      tr_map,
    })
  }

  fn register_surface_card(
    &self,
    line: &DataLine,
    tr_map: &HashMap<usize, Affine>,
    smap: &Arc<SurfaceMap>,
  ) -> Result<()> {
    let ctx = |e: Error| Error::bad_card(&line.file, line.line, e.to_string());
    let mut scard = SurfaceCard::parse(&line.data, false, false).map_err(ctx)?;

    if scard.name.is_empty() {
      return Err(Error::bad_card(&line.file, line.line, "empty surface name"));
    }
    if scard.name.starts_with('-') {
      return Err(Error::bad_card(
        &line.file,
        line.line,
        "surface names starting with '-' are reserved for reversed instances",
      ));
    }
    if let Some(stripped) = scard.name.strip_prefix('*') {
      tracing::warn!(pos = %line.pos(), "reflecting surface marker '*' is not supported; stripped");
      scard.name = stripped.to_string();
    }
    if let Some(stripped) = scard.name.strip_prefix('+') {
      tracing::warn!(pos = %line.pos(), "white boundary marker '+' is not supported; stripped");
      scard.name = stripped.to_string();
    }
    if smap.has_name(&scard.name) {
      return Err(Error::bad_card(
        &line.file,
        line.line,
        format!("multiple definition of surface \"{}\"", scard.name),
      ));
    }

    let matrix = scard.full_matrix(tr_map).map_err(ctx)?;
    let surface =
      Surface::from_card(&scard.name, &scard.symbol, &scard.params, &matrix).map_err(ctx)?;
    smap.register(surface).map_err(ctx)?;
    Ok(())
  }

  /// Iteratively rewrite fills: containers clone their universe's
  /// cells into place; lattice members expand into pruned element
  /// cells; new fills produced along the way queue up for the next
  /// iteration.
  fn expand_fills(&self, mut cards: Vec<CellCard>, ctx: &FillContext<'_>) -> Result<Vec<CellCard>> {
    for _step in 0..MAX_FILL_STEPS {
      if self.cancel.load(Ordering::Relaxed) {
        return Err(Error::Cancelled);
      }
      let universes = universe_members(&cards);

      // Containers are filled cells outside any universe.
      let container_idx = cards
        .iter()
        .position(|c| c.parameters.contains_key("fill") && !c.parameters.contains_key("u"));
      let Some(xi) = container_idx else {
        return Ok(cards);
      };
      let outer = cards[xi].clone();

      if outer.lattice_type() != 0 {
        // A top-level lattice tiles on its own; it needs explicit
        // ranges, there is no window to derive them from.
        let spec = outer.fill_spec()?.expect("fill checked above");
        let ranges = spec.ranges.ok_or(Error::InfiniteLattice)?;
        let (_dim, vectors, _center) = lattice_basis(&outer, ctx.smap)?;
        let base_bb = self.bbox_or_universal(&outer, ctx)?;
        let elements = expand_lattice(
          None,
          &crate::bbox::BoundingBox::universal(),
          "",
          &outer,
          ranges,
          &spec.entries,
          &vectors,
          &base_bb,
          ctx,
        )?;
        let _ = cards.splice(xi..xi + 1, elements);
        continue;
      }

      let spec = outer.fill_spec()?.expect("fill checked above");
      if spec.ranges.is_some() {
        return Err(Error::bad_card(
          &outer.file,
          outer.line,
          format!("cell \"{}\" uses a lattice fill without lat=", outer.name),
        ));
      }
      let entry = &spec.entries[0];
      let members = universes.get(&entry.universe).ok_or_else(|| {
        Error::bad_card(
          &outer.file,
          outer.line,
          format!("cell \"{}\" fills with unknown universe \"{}\"", outer.name, entry.universe),
        )
      })?;
      let member_cards: Vec<CellCard> = cards
        .iter()
        .filter(|c| members.contains(&c.name))
        .cloned()
        .collect();

      let container_bb = self.bbox_or_universal(&outer, ctx)?;
      let mut replacement: Vec<CellCard> = Vec::new();
      for inner in &member_cards {
        if inner.lattice_type() != 0 {
          let Some(lspec) = inner.fill_spec()? else {
            replacement.push(expand_simple_inner(&outer, entry, inner, ctx)?);
            continue;
          };
          let (dim, vectors, center) = lattice_basis(inner, ctx.smap)?;
          let ranges = match lspec.ranges {
            Some(r) => r,
            None => calc_dimension_declarator(dim, center, &vectors, &container_bb)?,
          };
          let mut extra_parts: Vec<String> = Vec::new();
          if let Some(tr) = &entry.tr {
            extra_parts.push(tr.clone());
          }
          if !outer.trcl.is_empty() {
            extra_parts.push(outer.trcl.clone());
          }
          let base_bb = self.bbox_or_universal(inner, ctx)?;
          let elements = expand_lattice(
            Some(&outer),
            &container_bb,
            &extra_parts.join(","),
            inner,
            ranges,
            &lspec.entries,
            &vectors,
            &base_bb,
            ctx,
          )?;
          replacement.extend(elements);
        } else {
          replacement.push(expand_simple_inner(&outer, entry, inner, ctx)?);
        }
      }
      let _ = cards.splice(xi..xi + 1, replacement);
    }
    Err(Error::DegenerateGeometry(
      "fill expansion did not terminate".into(),
    ))
  }

  fn bbox_or_universal(
    &self,
    card: &CellCard,
    ctx: &FillContext<'_>,
  ) -> Result<crate::bbox::BoundingBox> {
    match name_equation_bbox(&card.equation, ctx.smap, Some(self.timeout.as_ref())) {
      Ok(bb) if !bb.is_empty() => Ok(bb),
      Ok(_) => Ok(crate::bbox::BoundingBox::universal()),
      Err(e @ (Error::Timeout | Error::Cancelled | Error::OutOfMemory)) => Err(e),
      Err(e) => {
        tracing::warn!(cell = %card.name, error = %e, "bounding box failed; using the universal box");
        Ok(crate::bbox::BoundingBox::universal())
      }
    }
  }
}

fn universe_members(cards: &[CellCard]) -> HashMap<String, Vec<String>> {
  let mut map: HashMap<String, Vec<String>> = HashMap::new();
  for card in cards {
    if let Some(u) = card.parameters.get("u") {
      map.entry(u.clone()).or_default().push(card.name.clone());
    }
  }
  map
}

#[cfg(test)]
#[path = "resolve_test.rs"]
mod resolve_test;
