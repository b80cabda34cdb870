//! Cell card parsing, LIKE-BUT inheritance, TRCL accumulation, the
//! dependency solver, and complement substitution.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;

use crate::cell::EquationNode;
use crate::error::{Error, Result};
use crate::formula;
use crate::input::card;
use crate::strings::{self, CARD_QUOTES};

/// Parsed cell card, successively rewritten by the resolution passes.
#[derive(Clone, Debug)]
pub struct CellCard {
  pub file: String,
  pub line: u64,
  pub name: String,
  /// Material name; "0" is void.
  pub material: String,
  pub density: Option<f64>,
  /// Boolean geometry equation (surface-name polynomial).
  pub equation: String,
  /// LIKE-BUT source cell, when used.
  pub like_cell: Option<String>,
  /// Key=value parameters (keys lowercased). `fill` values are kept in
  /// canonical form.
  pub parameters: BTreeMap<String, String>,
  /// Cells this card depends on: LIKE source and complement targets.
  pub depends: Vec<String>,
  /// Canonical comma-separated TRCL string.
  pub trcl: String,
  /// Resolution order assigned by the dependency solver.
  pub order: i32,
}

pub const NOT_ORDERED: i32 = -1;

fn complement_pattern() -> &'static Regex {
  static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(&format!(r"#({})", card::CELL_NAME_CLASS)).unwrap())
}

/// Names referenced through `#cell` complements.
pub fn complement_cell_names(equation: &str) -> Vec<String> {
  complement_pattern()
    .captures_iter(equation)
    .map(|c| c.get(1).unwrap().as_str().to_string())
    .collect()
}

/// Set of surface names used in an equation (signs stripped,
/// complement references excluded).
pub fn surface_names(equation: &str) -> HashSet<String> {
  let mut out = HashSet::new();
  for raw in equation.replace(['(', ')', ':'], " ").split_whitespace() {
    if raw.starts_with('#') {
      continue;
    }
    let name = raw.trim_start_matches(['-', '+']);
    if !name.is_empty() {
      out.insert(name.to_string());
    }
  }
  out
}

/// Signed surface references in appearance order, duplicates removed.
pub fn surface_refs(equation: &str) -> Vec<String> {
  let mut out = Vec::new();
  for raw in equation.replace(['(', ')', ':'], " ").split_whitespace() {
    if raw.starts_with('#') || raw.is_empty() {
      continue;
    }
    if !out.contains(&raw.to_string()) {
      out.push(raw.to_string());
    }
  }
  out
}

impl CellCard {
  pub fn parse(card_str: &str) -> Result<CellCard> {
    CellCard::parse_at("", 0, card_str, false)
  }

  /// Parse one cell card. `strict` applies the user-input rules:
  /// strictly named cells and parameters only after the geometry.
  pub fn parse_at(file: &str, line: u64, card_str: &str, strict: bool) -> Result<CellCard> {
    let ctx = |what: String| Error::bad_card(file, line, what);

    let normalized = card::normalize_assignments(card_str.trim());
    let tokens = strings::split_ws(&normalized, CARD_QUOTES);
    if tokens.len() < 2 {
      return Err(ctx(format!("too short cell card \"{card_str}\"")));
    }

    let name = strings::canonical_name(&tokens[0]);
    card::check_name_characters(&name, strict)?;

    let mut like_cell = None;
    let mut material = String::new();
    let mut density = None;
    let mut rest_start;

    if tokens[1].eq_ignore_ascii_case("like") {
      if tokens.len() < 4 || !tokens[3].eq_ignore_ascii_case("but") {
        return Err(ctx(format!("malformed LIKE-BUT in \"{card_str}\"")));
      }
      like_cell = Some(strings::canonical_name(&tokens[2]));
      rest_start = 4;
    } else {
      if tokens[1].contains('=') {
        return Err(ctx(format!(
          "cell parameters must follow the geometry, found \"{}\" in place of a material",
          tokens[1]
        )));
      }
      material = tokens[1].clone();
      if material == "0" {
        rest_start = 2;
      } else {
        if tokens.len() < 3 {
          return Err(ctx(format!("material \"{material}\" without a density")));
        }
        density = Some(formula::eval_param(&tokens[2]).map_err(|e| ctx(e.to_string()))?);
        rest_start = 3;
      }
    }

    let mut equation_tokens: Vec<String> = Vec::new();
    let mut parameters = BTreeMap::new();
    let mut trcl = String::new();
    let mut in_params = false;

    let mut idx = rest_start;
    while idx < tokens.len() {
      let token = &tokens[idx];

      if card::append_canonical_tr_str(token, &mut trcl) {
        in_params = true;
        idx += 1;
        continue;
      }

      let lowered = token.to_ascii_lowercase();
      if let Some(value_head) = lowered
        .strip_prefix("fill=")
        .or_else(|| lowered.strip_prefix("*fill="))
      {
        let star = lowered.starts_with('*');
        let mut value_tokens: Vec<String> = Vec::new();
        if !value_head.is_empty() {
          value_tokens.push(token[token.find('=').unwrap() + 1..].to_string());
        }
        // The fill value runs until the next key=value parameter.
        idx += 1;
        while idx < tokens.len() {
          let peek = &tokens[idx];
          let is_param = peek.contains('=') && !peek.starts_with('(');
          if is_param {
            break;
          }
          value_tokens.push(peek.clone());
          idx += 1;
        }
        let canonical =
          canonicalize_fill(&value_tokens, star).map_err(|e| ctx(e.to_string()))?;
        parameters.insert("fill".into(), canonical);
        in_params = true;
        continue;
      }

      if let Some((key, value)) = card::split_key_value(token) {
        parameters.insert(key, value);
        in_params = true;
        idx += 1;
        continue;
      }

      if in_params {
        if strict {
          return Err(ctx(format!(
            "geometry token \"{token}\" after cell parameters"
          )));
        }
        // Lenient mode tolerates interleaving and keeps the geometry.
      }
      let stripped = token.strip_prefix('+').unwrap_or(token);
      equation_tokens.push(stripped.to_string());
      idx += 1;
    }

    if strict && like_cell.is_some() && !equation_tokens.is_empty() {
      return Err(ctx("LIKE-BUT cells take parameters only".into()));
    }

    let equation = equation_tokens.join(" ");
    let mut depends: Vec<String> = Vec::new();
    if let Some(like) = &like_cell {
      depends.push(like.clone());
    }
    for dep in complement_cell_names(&equation) {
      if !depends.contains(&dep) {
        depends.push(dep);
      }
    }

    Ok(CellCard {
      file: file.to_string(),
      line,
      name,
      material,
      density,
      equation,
      like_cell,
      parameters,
      depends,
      trcl,
      order: NOT_ORDERED,
    })
  }

  pub fn pos(&self) -> String {
    format!("{}:{}", self.file, self.line)
  }

  pub fn has_trcl(&self) -> bool {
    !self.trcl.is_empty()
  }

  /// Append (or prepend) a TR segment to the canonical TRCL string.
  pub fn add_trcl(&mut self, new_tr: &str, at_back: bool) {
    if new_tr.is_empty() {
      return;
    }
    if self.trcl.is_empty() {
      self.trcl = new_tr.to_string();
    } else if at_back {
      self.trcl = format!("{},{}", self.trcl, new_tr);
    } else {
      self.trcl = format!("{},{}", new_tr, self.trcl);
    }
  }

  /// Universe this cell belongs to ("0" when unset).
  pub fn universe(&self) -> String {
    self.parameters.get("u").cloned().unwrap_or_else(|| "0".into())
  }

  /// Lattice type (0 = not a lattice).
  pub fn lattice_type(&self) -> i32 {
    self
      .parameters
      .get("lat")
      .and_then(|v| v.parse().ok())
      .unwrap_or(0)
  }

  pub fn fill_spec(&self) -> Result<Option<FillSpec>> {
    match self.parameters.get("fill") {
      None => Ok(None),
      Some(value) => FillSpec::parse(value).map(Some),
    }
  }

  /// "name material [density]" prefix used when reassembling a card.
  pub fn header_string(&self) -> String {
    if let Some(like) = &self.like_cell {
      return format!("{} like {} but", self.name, like);
    }
    match self.density {
      Some(d) => format!("{} {} {}", self.name, self.material, d),
      None => format!("{} {}", self.name, self.material),
    }
  }

  pub fn params_string(&self) -> String {
    self
      .parameters
      .iter()
      .map(|(k, v)| format!("{k}={v}"))
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// Full card text, re-parseable by [`CellCard::parse`].
  pub fn to_input_string(&self) -> String {
    let mut out = self.header_string();
    if !self.equation.is_empty() {
      out = format!("{} {}", out, self.equation);
    }
    let params = self.params_string();
    if !params.is_empty() {
      out = format!("{} {}", out, params);
    }
    if !self.trcl.is_empty() {
      out = format!("{} trcl=({})", out, self.trcl);
    }
    out
  }
}

/// Parsed `fill=` value.
#[derive(Clone, Debug, PartialEq)]
pub struct FillSpec {
  /// Dimension declarators, when the range form is used.
  pub ranges: Option<[(i32, i32); 3]>,
  /// Universe references in row-major order (one for the single form).
  pub entries: Vec<FillEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FillEntry {
  pub universe: String,
  /// Inline transform argument list, canonical (leading `*` per
  /// segment when angles are degrees).
  pub tr: Option<String>,
}

impl FillSpec {
  pub fn parse(value: &str) -> Result<FillSpec> {
    let bad = |what: &str| Error::BadCard {
      file: String::new(),
      line: 0,
      what: format!("{what} in fill \"{value}\""),
    };
    let mut ranges: Vec<(i32, i32)> = Vec::new();
    let mut entries: Vec<FillEntry> = Vec::new();
    for token in strings::split_ws(value, &[('(', ')'), ('{', '}')]) {
      // A token may be "13", "0:1", "(tr)", or "13(tr)".
      let (head, group) = match token.find('(') {
        Some(0) => (String::new(), Some(token.clone())),
        Some(p) => (token[..p].to_string(), Some(token[p..].to_string())),
        None => (token.clone(), None),
      };
      if !head.is_empty() {
        if head.contains(':') {
          let (lo, hi) = head.split_once(':').ok_or_else(|| bad("bad range"))?;
          ranges.push((
            lo.parse().map_err(|_| bad("bad range bound"))?,
            hi.parse().map_err(|_| bad("bad range bound"))?,
          ));
        } else {
          entries.push(FillEntry {
            universe: head,
            tr: None,
          });
        }
      }
      if let Some(group) = group {
        let inner = strings::dequote('(', ')', &group);
        let last = entries.last_mut().ok_or_else(|| bad("transform without a universe"))?;
        last.tr = Some(inner);
      }
    }
    let ranges = if ranges.is_empty() {
      None
    } else {
      if ranges.len() != 3 {
        return Err(bad("a dimension declarator needs three ranges"));
      }
      Some([ranges[0], ranges[1], ranges[2]])
    };
    if entries.is_empty() {
      return Err(bad("no universe reference"));
    }
    Ok(FillSpec { ranges, entries })
  }

  /// Number of lattice elements declared by the ranges (1 without).
  pub fn element_count(&self) -> usize {
    match self.ranges {
      None => 1,
      Some(r) => r
        .iter()
        .map(|(lo, hi)| (hi - lo + 1).max(0) as usize)
        .product(),
    }
  }
}

/// Canonicalize a fill value: declarators, two spaces, then universe
/// entries with their transforms glued on (`2(10 -20 30)`), inner
/// whitespace collapsed, `*` markers folded into the parentheses.
fn canonicalize_fill(value_tokens: &[String], star: bool) -> Result<String> {
  let bad = |what: &str| Error::BadCard {
    file: String::new(),
    line: 0,
    what: what.to_string(),
  };
  let mut declarators: Vec<String> = Vec::new();
  let mut entries: Vec<String> = Vec::new();
  for raw in value_tokens {
    // A single raw token may still carry an attached transform
    // ("13(-8 9 0)") or be a bare group.
    let (head, group) = match raw.find('(') {
      Some(0) => (String::new(), Some(raw.clone())),
      Some(p) => (raw[..p].to_string(), Some(raw[p..].to_string())),
      None => (raw.clone(), None),
    };
    if !head.is_empty() {
      if head.contains(':') {
        declarators.push(head);
      } else {
        entries.push(head);
      }
    }
    if let Some(group) = group {
      let mut inner = strings::dequote('(', ')', &group);
      inner = strings::split_ws(&inner, &[('{', '}')]).join(" ");
      if star && !inner.starts_with('*') {
        inner = format!("*{inner}");
      }
      let target = entries.last_mut().ok_or_else(|| bad("fill transform without a universe"))?;
      target.push_str(&format!("({inner})"));
    }
  }

  if declarators.is_empty() {
    if entries.len() != 1 {
      return Err(bad("a non-lattice fill takes exactly one universe"));
    }
    return Ok(entries.pop().unwrap());
  }

  if declarators.len() != 3 {
    return Err(bad("a dimension declarator needs three ranges"));
  }
  let mut expected = 1usize;
  for d in &declarators {
    let (lo, hi) = d.split_once(':').ok_or_else(|| bad("bad fill range"))?;
    let lo: i64 = lo.parse().map_err(|_| bad("bad fill range bound"))?;
    let hi: i64 = hi.parse().map_err(|_| bad("bad fill range bound"))?;
    if hi < lo {
      return Err(bad("fill range upper bound below lower bound"));
    }
    expected *= (hi - lo + 1) as usize;
  }
  if entries.len() != expected {
    return Err(bad(&format!(
      "lattice fill declares {} elements but lists {} universes",
      expected,
      entries.len()
    )));
  }
  Ok(format!("{}  {}", declarators.join(" "), entries.join(" ")))
}

/// Kahn ordering over LIKE / complement / fill-universe dependencies.
/// `universes` maps a universe id to the cell names it contains.
/// Orders the slice in place (by the `order` field) and returns the
/// resolution sequence.
pub fn solve_dependencies(
  cards: &mut [CellCard],
  universes: &HashMap<String, Vec<String>>,
) -> Result<Vec<usize>> {
  let index_of: HashMap<String, usize> = cards
    .iter()
    .enumerate()
    .map(|(i, c)| (c.name.clone(), i))
    .collect();

  // edges[i] holds the cards that must resolve before card i.
  let mut edges: Vec<Vec<usize>> = vec![Vec::new(); cards.len()];
  for (i, cell) in cards.iter().enumerate() {
    let mut wanted: Vec<String> = cell.depends.clone();
    if let Ok(Some(fill)) = cell.fill_spec() {
      for entry in &fill.entries {
        if let Some(members) = universes.get(&entry.universe) {
          wanted.extend(members.iter().cloned());
        }
      }
    }
    for name in wanted {
      match index_of.get(&name) {
        Some(&dep) if dep != i => edges[i].push(dep),
        Some(_) => {}
        None => {
          return Err(Error::bad_card(
            &cell.file,
            cell.line,
            format!("cell \"{}\" depends on unknown cell \"{}\"", cell.name, name),
          ));
        }
      }
    }
  }

  let mut remaining: Vec<usize> = (0..cards.len()).collect();
  let mut resolved: Vec<usize> = Vec::with_capacity(cards.len());
  let mut done = vec![false; cards.len()];
  while !remaining.is_empty() {
    let mut progressed = false;
    remaining.retain(|&i| {
      if edges[i].iter().all(|&d| done[d]) {
        done[i] = true;
        cards[i].order = resolved.len() as i32;
        resolved.push(i);
        progressed = true;
        false
      } else {
        true
      }
    });
    if !progressed {
      let names = remaining.iter().map(|&i| cards[i].name.clone()).collect();
      return Err(Error::CircularReference(names));
    }
  }
  Ok(resolved)
}

/// Replace every `#cell` token with the referenced cell's negated
/// equation, parenthesized. Cards must already be ordered.
pub fn resolve_complements(cards: &mut [CellCard], sequence: &[usize]) -> Result<()> {
  let mut resolved_eq: HashMap<String, String> = HashMap::new();
  for &i in sequence {
    let mut equation = cards[i].equation.clone();
    let mut refs = complement_cell_names(&equation);
    // Longest names first so #8 never clips into #80.
    refs.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    for cell_name in refs {
      let target = resolved_eq.get(&cell_name).ok_or_else(|| {
        Error::bad_card(
          &cards[i].file,
          cards[i].line,
          format!("complement #{cell_name} resolved out of order"),
        )
      })?;
      let node = EquationNode::parse(target)?;
      let negated = format!("({})", node.negated().to_equation_string());
      equation = equation.replace(&format!("#{cell_name}"), &negated);
    }
    cards[i].equation = equation.clone();
    resolved_eq.insert(cards[i].name.clone(), equation);
  }
  Ok(())
}

/// Apply LIKE-BUT inheritance in resolution order: the card takes the
/// source's material, density, equation and parameters, overridden by
/// its own entries.
pub fn resolve_like_but(cards: &mut [CellCard], sequence: &[usize]) -> Result<()> {
  for seq_idx in 0..sequence.len() {
    let i = sequence[seq_idx];
    let Some(like) = cards[i].like_cell.clone() else {
      continue;
    };
    let source_idx = cards
      .iter()
      .position(|c| c.name == like)
      .ok_or_else(|| {
        Error::bad_card(
          &cards[i].file,
          cards[i].line,
          format!("LIKE references unknown cell \"{like}\""),
        )
      })?;
    let source = cards[source_idx].clone();
    let card = &mut cards[i];
    card.material = source.material;
    card.density = card.density.or(source.density);
    card.equation = source.equation;
    for (k, v) in source.parameters {
      card.parameters.entry(k).or_insert(v);
    }
    // The source's TRCL applies first, then the BUT overrides.
    if !source.trcl.is_empty() {
      card.add_trcl(&source.trcl, false);
    }
    card.like_cell = None;
  }
  Ok(())
}

#[cfg(test)]
#[path = "cell_card_test.rs"]
mod cell_card_test;
