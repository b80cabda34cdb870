//! TR cards (`[*]TR<n> <args>...`) and the numbered transform table.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{Error, Result};
use crate::input::{ijmr, DataLine};
use crate::math::Affine;
use crate::transform;

fn tr_pattern() -> &'static Regex {
  static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"(?i)^ {0,4}(\*?)TR([-+0-9*]+) +([-+/*.(){}0-9a-zA-Z ]+)$").unwrap()
  })
}

/// One parsed TR card.
#[derive(Clone, Debug)]
pub struct TrCard {
  number: usize,
  matrix: Affine,
}

impl TrCard {
  /// Parse `TR1 ...`, `*TR1 ...` or the trailing-star `TR1* ...` form.
  pub fn parse(card_str: &str, warn_compat: bool) -> Result<TrCard> {
    let caps = tr_pattern().captures(card_str.trim_end()).ok_or_else(|| Error::BadCard {
      file: String::new(),
      line: 0,
      what: format!("not a TR card: \"{card_str}\""),
    })?;
    let mut modifier = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
    let mut id = caps.get(2).unwrap().as_str().to_string();
    let argument = caps.get(3).unwrap().as_str();

    // The degree star may trail the number: TR1* == *TR1.
    if id.ends_with('*') {
      if warn_compat {
        tracing::warn!("postpositional * on a TR card is not phits compatible");
      }
      modifier = "*".into();
      id.pop();
    }
    // Negative numbers collide with reflecting-boundary notation.
    let number = id.parse::<i64>().ok().filter(|n| *n >= 0).ok_or_else(|| Error::BadCard {
      file: String::new(),
      line: 0,
      what: format!("invalid TR card number \"{id}\""),
    })? as usize;

    let matrix = transform::generate_single_transform_matrix(
      &format!("{modifier}{argument}"),
      warn_compat,
    )?;
    Ok(TrCard { number, matrix })
  }

  pub fn number(&self) -> usize {
    self.number
  }

  pub fn matrix(&self) -> Affine {
    self.matrix
  }

  /// Quick check whether a data card looks like a TR card at all.
  pub fn matches(card_str: &str) -> bool {
    tr_pattern().is_match(card_str.trim_end())
  }

  /// Build the TR table from the data section. Repetitions are
  /// expanded first; duplicate numbers and ijmr card names are errors,
  /// non-TR cards are skipped with a warning.
  pub fn make_transform_map(data_lines: &[DataLine]) -> Result<HashMap<usize, Affine>> {
    let mut map: HashMap<usize, Affine> = HashMap::new();
    for dl in data_lines {
      let mut parts = dl.data.trim().splitn(2, char::is_whitespace);
      let first = parts.next().unwrap_or("").to_string();
      let rest = parts.next().unwrap_or("");
      if ijmr::is_ijmr_expression(&first) {
        return Err(Error::bad_card(
          &dl.file,
          dl.line,
          format!("TR card name must not be an ijmr expression: \"{}\"", dl.data),
        ));
      }
      let expanded = format!("{} {}", first, ijmr::expand(rest)?);
      if !TrCard::matches(&expanded) {
        tracing::warn!(card = %dl.data, pos = %dl.pos(), "non-TR card in the transform section; ignored");
        continue;
      }
      let card = TrCard::parse(&expanded, false)
        .map_err(|e| Error::bad_card(&dl.file, dl.line, e.to_string()))?;
      if map.contains_key(&card.number) {
        return Err(Error::bad_card(
          &dl.file,
          dl.line,
          format!("multiple definition of TR{}", card.number),
        ));
      }
      map.insert(card.number, card.matrix);
    }
    Ok(map)
  }
}

#[cfg(test)]
#[path = "tr_card_test.rs"]
mod tr_card_test;
