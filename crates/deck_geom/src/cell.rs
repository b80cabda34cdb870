//! Resolved cells: the Boolean polynomial over surface references,
//! membership testing, and the bounding box derived from the surfaces'
//! bounding-plane sets.
//!
//! Equation grammar: whitespace is AND, `:` is OR, `(...)` groups, and
//! a leaf is a surface reference with an optional `-`/`+` sign.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::bbox::{merge_plane_vectors_and, BoundingBox};
use crate::error::{Error, Result};
use crate::math::Point;
use crate::surface::{PlaneSets, SurfaceMap};

/// One node of a parsed cell polynomial.
#[derive(Clone, Debug, PartialEq)]
pub enum EquationNode {
  /// Surface reference, sign included (`-5`, `B.1`, `+7_tC2`).
  Leaf(String),
  And(Vec<EquationNode>),
  Or(Vec<EquationNode>),
}

impl EquationNode {
  /// Parse an equation string into a tree.
  pub fn parse(equation: &str) -> Result<EquationNode> {
    let tokens = tokenize(equation)?;
    let mut pos = 0usize;
    let node = parse_or(&tokens, &mut pos)?;
    if pos != tokens.len() {
      return Err(bad(equation, "trailing tokens"));
    }
    Ok(node)
  }

  /// De Morgan negation: signs flip on leaves, AND and OR swap.
  pub fn negated(&self) -> EquationNode {
    match self {
      EquationNode::Leaf(name) => EquationNode::Leaf(flip_sign(name)),
      EquationNode::And(children) => {
        EquationNode::Or(children.iter().map(|c| c.negated()).collect())
      }
      EquationNode::Or(children) => {
        EquationNode::And(children.iter().map(|c| c.negated()).collect())
      }
    }
  }

  /// Serialize back to equation text.
  pub fn to_equation_string(&self) -> String {
    match self {
      EquationNode::Leaf(name) => name.clone(),
      EquationNode::And(children) => {
        let parts: Vec<String> = children.iter().map(|c| c.wrapped()).collect();
        parts.join(" ")
      }
      EquationNode::Or(children) => {
        let parts: Vec<String> = children.iter().map(|c| c.wrapped()).collect();
        parts.join(":")
      }
    }
  }

  fn wrapped(&self) -> String {
    match self {
      EquationNode::Leaf(_) => self.to_equation_string(),
      _ => format!("({})", self.to_equation_string()),
    }
  }

  /// All leaf references, signs preserved, in appearance order.
  pub fn leaves(&self) -> Vec<String> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves(&self, out: &mut Vec<String>) {
    match self {
      EquationNode::Leaf(name) => out.push(name.clone()),
      EquationNode::And(children) | EquationNode::Or(children) => {
        for c in children {
          c.collect_leaves(out);
        }
      }
    }
  }
}

fn flip_sign(name: &str) -> String {
  if let Some(rest) = name.strip_prefix('-') {
    rest.to_string()
  } else if let Some(rest) = name.strip_prefix('+') {
    format!("-{rest}")
  } else {
    format!("-{name}")
  }
}

#[derive(Debug, PartialEq)]
enum Token {
  Name(String),
  Or,
  Open,
  Close,
}

fn tokenize(equation: &str) -> Result<Vec<Token>> {
  let mut out = Vec::new();
  let mut current = String::new();
  for ch in equation.chars() {
    match ch {
      ' ' | '\t' => flush(&mut current, &mut out),
      ':' => {
        flush(&mut current, &mut out);
        out.push(Token::Or);
      }
      '(' => {
        flush(&mut current, &mut out);
        out.push(Token::Open);
      }
      ')' => {
        flush(&mut current, &mut out);
        out.push(Token::Close);
      }
      _ => current.push(ch),
    }
  }
  flush(&mut current, &mut out);
  Ok(out)
}

fn flush(current: &mut String, out: &mut Vec<Token>) {
  if !current.is_empty() {
    out.push(Token::Name(std::mem::take(current)));
  }
}

fn bad(equation: &str, what: &str) -> Error {
  Error::BadCard {
    file: String::new(),
    line: 0,
    what: format!("{what} in cell equation \"{equation}\""),
  }
}

fn parse_or(tokens: &[Token], pos: &mut usize) -> Result<EquationNode> {
  let mut terms = vec![parse_and(tokens, pos)?];
  while *pos < tokens.len() && tokens[*pos] == Token::Or {
    *pos += 1;
    terms.push(parse_and(tokens, pos)?);
  }
  if terms.len() == 1 {
    Ok(terms.pop().unwrap())
  } else {
    Ok(EquationNode::Or(terms))
  }
}

fn parse_and(tokens: &[Token], pos: &mut usize) -> Result<EquationNode> {
  let mut factors = Vec::new();
  while *pos < tokens.len() {
    match &tokens[*pos] {
      Token::Name(name) => {
        factors.push(EquationNode::Leaf(name.clone()));
        *pos += 1;
      }
      Token::Open => {
        *pos += 1;
        let inner = parse_or(tokens, pos)?;
        if *pos >= tokens.len() || tokens[*pos] != Token::Close {
          return Err(bad("", "unbalanced parentheses"));
        }
        *pos += 1;
        factors.push(inner);
      }
      Token::Or | Token::Close => break,
    }
  }
  if factors.is_empty() {
    return Err(bad("", "empty conjunction"));
  }
  if factors.len() == 1 {
    Ok(factors.pop().unwrap())
  } else {
    Ok(EquationNode::And(factors))
  }
}

/// A fully resolved cell: name, id polynomial, and bounding box.
#[derive(Clone, Debug)]
pub struct Cell {
  pub name: String,
  pub material: String,
  pub density: Option<f64>,
  /// Polynomial with numeric signed surface ids as leaves.
  pub equation: EquationNode,
  pub bounding_box: BoundingBox,
}

impl Cell {
  /// Build a cell from an index equation (`make_index_equation`
  /// output), computing the bounding box from the surfaces'
  /// bounding-plane sets.
  pub fn from_index_equation(
    name: impl Into<String>,
    material: impl Into<String>,
    density: Option<f64>,
    index_equation: &str,
    smap: &Arc<SurfaceMap>,
    timeout: Option<&AtomicBool>,
  ) -> Result<Cell> {
    let equation = EquationNode::parse(index_equation)?;
    let sets = equation_plane_sets(&equation, smap, timeout)?;
    let bounding_box = BoundingBox::from_planes(timeout, &sets)?;
    Ok(Cell {
      name: name.into(),
      material: material.into(),
      density,
      equation,
      bounding_box,
    })
  }

  /// Point membership through the surface map's sign convention.
  pub fn contains(&self, point: Point, smap: &SurfaceMap) -> Result<bool> {
    evaluate(&self.equation, point, smap)
  }
}

fn evaluate(node: &EquationNode, point: Point, smap: &SurfaceMap) -> Result<bool> {
  match node {
    EquationNode::Leaf(name) => {
      let id: i32 = name.parse().map_err(|_| Error::BadCard {
        file: String::new(),
        line: 0,
        what: format!("non-numeric leaf \"{name}\" in an index equation"),
      })?;
      smap.is_forward(id, point)
    }
    EquationNode::And(children) => {
      for c in children {
        if !evaluate(c, point, smap)? {
          return Ok(false);
        }
      }
      Ok(true)
    }
    EquationNode::Or(children) => {
      for c in children {
        if evaluate(c, point, smap)? {
          return Ok(true);
        }
      }
      Ok(false)
    }
  }
}

/// Bounding-plane sets of a *name* polynomial (signs resolved through
/// the registry: `-name` is the registered reversed instance).
pub fn name_equation_plane_sets(
  equation: &str,
  smap: &Arc<SurfaceMap>,
  timeout: Option<&AtomicBool>,
) -> Result<PlaneSets> {
  let node = EquationNode::parse(equation)?;
  name_node_plane_sets(&node, smap, timeout)
}

fn name_node_plane_sets(
  node: &EquationNode,
  smap: &Arc<SurfaceMap>,
  timeout: Option<&AtomicBool>,
) -> Result<PlaneSets> {
  match node {
    EquationNode::Leaf(name) => {
      let lookup = name.strip_prefix('+').unwrap_or(name);
      Ok(smap.by_name(lookup)?.bounding_planes().clone())
    }
    EquationNode::And(children) => {
      let mut merged = PlaneSets::new();
      for c in children {
        let sets = name_node_plane_sets(c, smap, timeout)?;
        merged = merge_plane_vectors_and(timeout, &merged, &sets)?;
      }
      Ok(merged)
    }
    EquationNode::Or(children) => {
      let mut combined = PlaneSets::new();
      for c in children {
        combined.extend(name_node_plane_sets(c, smap, timeout)?);
      }
      Ok(combined)
    }
  }
}

/// Bounding box of a name polynomial.
pub fn name_equation_bbox(
  equation: &str,
  smap: &Arc<SurfaceMap>,
  timeout: Option<&AtomicBool>,
) -> Result<BoundingBox> {
  let sets = name_equation_plane_sets(equation, smap, timeout)?;
  BoundingBox::from_planes(timeout, &sets)
}

/// Bounding-plane sets of a polynomial: AND merges conjunction
/// products, OR concatenates unions.
pub fn equation_plane_sets(
  node: &EquationNode,
  smap: &Arc<SurfaceMap>,
  timeout: Option<&AtomicBool>,
) -> Result<PlaneSets> {
  match node {
    EquationNode::Leaf(name) => {
      let id: i32 = name.parse().map_err(|_| Error::BadCard {
        file: String::new(),
        line: 0,
        what: format!("non-numeric leaf \"{name}\" in an index equation"),
      })?;
      Ok(smap.at(id)?.bounding_planes().clone())
    }
    EquationNode::And(children) => {
      let mut merged = PlaneSets::new();
      for c in children {
        let sets = equation_plane_sets(c, smap, timeout)?;
        merged = merge_plane_vectors_and(timeout, &merged, &sets)?;
      }
      Ok(merged)
    }
    EquationNode::Or(children) => {
      let mut combined = PlaneSets::new();
      for c in children {
        combined.extend(equation_plane_sets(c, smap, timeout)?);
      }
      Ok(combined)
    }
  }
}

#[cfg(test)]
#[path = "cell_test.rs"]
mod cell_test;
