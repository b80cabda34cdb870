//! Macrobody expansion.
//!
//! A macrobody is a purely syntactic construct: expanding it replaces
//! one surface card with the primitive surface cards `<name>.1` ..
//! `<name>.k` (bodies producing a single surface keep their name), and
//! rewrites every cell equation referencing `+-<name>` with the
//! canonical substitution. TOR splits into two convex pieces and
//! overrides the default substitution; the others AND their faces for
//! the `-` side and OR them for the `+` side.

mod axsym;
mod planes;
mod quadrics;
mod torus;

use std::collections::HashMap;

use regex::Regex;

use crate::error::Result;
use crate::input::surface_card::SurfaceCard;
use crate::input::DataLine;
use crate::math::Affine;
use crate::surface::Surface;

/// Record of one expanded macrobody, used for the cell-side rewrite.
#[derive(Clone, Debug)]
pub struct Expansion {
  pub name: String,
  pub symbol: String,
}

/// Number of primitive surfaces each mnemonic produces; `None` marks a
/// single-surface body that keeps its own name (no cell rewrite).
fn surface_count(symbol: &str) -> Option<usize> {
  match symbol {
    "rpp" | "box" | "arb" => Some(6),
    "rcc" | "rec" | "trc" | "qua" => Some(3),
    "wed" => Some(5),
    "rhp" | "hex" => Some(8),
    "tor" => Some(4),
    _ => None,
  }
}

pub fn is_macrobody(symbol: &str) -> bool {
  matches!(
    symbol,
    "rpp" | "box" | "sph" | "rcc" | "rec" | "ell" | "trc" | "wed" | "rhp" | "hex" | "arb"
      | "qua" | "tor" | "x" | "y" | "z"
  )
}

fn expand_body(card: &SurfaceCard, pos: &str) -> Result<Vec<Surface>> {
  match card.symbol.as_str() {
    "rpp" => planes::expand_rpp(card, pos),
    "box" => planes::expand_box(card, pos),
    "wed" => planes::expand_wed(card),
    "rhp" | "hex" => planes::expand_rhp(card, pos),
    "arb" => planes::expand_arb(card),
    "sph" => quadrics::expand_sph(card, pos),
    "rcc" => quadrics::expand_rcc(card),
    "rec" => quadrics::expand_rec(card, pos),
    "ell" => quadrics::expand_ell(card),
    "trc" => quadrics::expand_trc(card),
    "qua" => quadrics::expand_qua(card),
    "tor" => torus::expand_tor(card),
    "x" | "y" | "z" => axsym::expand(card),
    other => Err(crate::error::Error::UnknownSymbol(other.to_string())),
  }
}

/// Expand every macrobody card in the surface list in place. The
/// produced primitive cards inherit the macrobody's TR matrix and its
/// source position. Returns the expansions for the cell-side rewrite.
pub fn expand_in_surface_list(
  tr_map: &HashMap<usize, Affine>,
  surf_lines: &mut Vec<DataLine>,
) -> Result<Vec<Expansion>> {
  let mut expansions = Vec::new();
  let mut idx = 0usize;
  while idx < surf_lines.len() {
    let line = surf_lines[idx].clone();
    let card = match SurfaceCard::parse(&line.data, false, false) {
      Ok(card) => card,
      // Leave unparseable lines for the surface creator to report
      // with full context.
      Err(_) => {
        idx += 1;
        continue;
      }
    };
    if !is_macrobody(&card.symbol) {
      idx += 1;
      continue;
    }

    let mut surfaces = expand_body(&card, &line.pos()).map_err(|e| match e {
      // Macrobody failures keep their class (they carry their own
      // exit code); everything else gains card position context.
      crate::error::Error::DegenerateGeometry(what) => {
        crate::error::Error::DegenerateGeometry(format!("{} {what}", line.pos()))
      }
      other => crate::error::Error::bad_card(&line.file, line.line, other.to_string()),
    })?;
    let matrix = card.full_matrix(tr_map)?;
    for surface in &mut surfaces {
      surface.transform(&matrix);
    }

    let generated: Vec<DataLine> = surfaces
      .iter()
      .map(|s| DataLine::new(&line.file, line.line, s.to_input_string()))
      .collect();
    let _ = surf_lines.splice(idx..idx + 1, generated.iter().cloned());
    idx += generated.len();

    expansions.push(Expansion {
      name: card.name.clone(),
      symbol: card.symbol.clone(),
    });
  }
  Ok(expansions)
}

/// Rewrite `+-<name>` references in every cell card for all recorded
/// expansions.
pub fn replace_in_cell_list(expansions: &[Expansion], cell_lines: &mut [DataLine]) -> Result<()> {
  for expansion in expansions {
    let (neg_subst, pos_subst) = match expansion.symbol.as_str() {
      "tor" => (
        torus::negative_substitution(&expansion.name),
        torus::positive_substitution(&expansion.name),
      ),
      sym => match surface_count(sym) {
        // Single-surface bodies keep their name in equations.
        None => continue,
        Some(n) => (
          default_substitution(&expansion.name, n, true),
          default_substitution(&expansion.name, n, false),
        ),
      },
    };
    for line in cell_lines.iter_mut() {
      let card = crate::input::cell_card::CellCard::parse_at(&line.file, line.line, &line.data, false)?;
      let mut equation = card.equation.clone();
      equation = replace_reference(&equation, &expansion.name, true, &neg_subst);
      equation = replace_reference(&equation, &expansion.name, false, &pos_subst);
      if equation != card.equation {
        let mut new_card = card;
        new_card.equation = equation.trim().to_string();
        line.data = new_card.to_input_string();
      }
    }
  }
  Ok(())
}

/// `(name.1 op name.2 op ... op name.k)` with AND for the `-` side and
/// OR for the `+` side.
fn default_substitution(name: &str, count: usize, negative: bool) -> String {
  let op = if negative { " " } else { ":" };
  let parts: Vec<String> = (1..=count)
    .map(|i| {
      if negative {
        format!("-{name}.{i}")
      } else {
        format!("{name}.{i}")
      }
    })
    .collect();
  format!("({})", parts.join(op))
}

/// Replace one signed macrobody reference in an equation. Word
/// boundaries exclude digits, letters and the facet dot so `2` never
/// matches inside `12` or `B.2`.
fn replace_reference(equation: &str, name: &str, negative: bool, substitution: &str) -> String {
  let escaped = regex::escape(name);
  let pattern = if negative {
    Regex::new(&format!(r"(^|[^0-9a-zA-Z.])(-{escaped})([^0-9a-zA-Z.]|$)")).unwrap()
  } else {
    Regex::new(&format!(r"(^|[^-0-9a-zA-Z.])(\+?{escaped})([^0-9a-zA-Z.]|$)")).unwrap()
  };
  let mut out = equation.to_string();
  loop {
    let Some(caps) = pattern.captures(&out) else {
      return out;
    };
    let m = caps.get(2).unwrap();
    let mut next = String::with_capacity(out.len() + substitution.len());
    next.push_str(&out[..m.start()]);
    next.push_str(substitution);
    next.push_str(&out[m.end()..]);
    out = next;
  }
}

#[cfg(test)]
#[path = "macrobody_test.rs"]
mod macrobody_test;
